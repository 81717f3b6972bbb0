//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use gauntlet_core::assembler::OutputConfig;
use gauntlet_core::pipeline::{PipelineConfig, PlayerSummary, ProgressReporter, RunSummary};
use gauntlet_extractor::{ExtractionStats, MatchOutcome, RosterWarning, evaluate_matches};
use gauntlet_publisher::{GitHubPublisher, default_targets, page};
use gauntlet_shared::{
    AppConfig, GameMode, LeaderboardEntry, init_config, load_api_token, load_config,
    load_config_from, load_github_token,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Gauntlet: winning builds of top-ranked Illuvium players.
#[derive(Parser)]
#[command(
    name = "gauntlet",
    version,
    about = "Collect winning builds from top-ranked Illuvium players and publish them as JSON.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.gauntlet/gauntlet.toml.
    #[arg(long, global = true, env = "GAUNTLET_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch the leaderboard and matches, extract winning builds, write JSON.
    Fetch {
        /// Number of top-ranked players to process.
        #[arg(long)]
        top: Option<usize>,

        /// Match search window in days.
        #[arg(long)]
        days: Option<u32>,

        /// Mode sent with match searches (Gauntlet, Ranked, Arena).
        #[arg(long)]
        mode: Option<GameMode>,

        /// Directory for the output documents.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Pause between players, in milliseconds.
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Upload the written documents and the builds index to GitHub.
    Publish {
        /// Mode whose by-mode document is uploaded.
        #[arg(long)]
        mode: Option<GameMode>,

        /// Directory the documents were written to by `fetch --out`.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Also write the HTML data access page.
        #[arg(long)]
        page: bool,
    },

    /// Extract builds from a saved match search response, offline.
    Extract {
        /// JSON file: a search response `{"games": [...]}` or a bare list of games.
        file: PathBuf,

        /// Player whose wins are extracted.
        #[arg(short, long)]
        player: String,

        /// Leaderboard rank recorded on each build.
        #[arg(short, long, default_value = "1")]
        rank: u32,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "gauntlet=info",
        1 => "gauntlet=debug",
        _ => "gauntlet=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Fetch {
            top,
            days,
            mode,
            out,
            delay_ms,
        } => {
            let overrides = FetchOverrides {
                top,
                days,
                mode,
                out,
                delay_ms,
            };
            cmd_fetch(config_path, overrides).await
        }
        Command::Publish { mode, out, page } => {
            cmd_publish(config_path, PublishOverrides { mode, out }, page).await
        }
        Command::Extract { file, player, rank } => cmd_extract(&file, &player, rank),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// fetch
// ---------------------------------------------------------------------------

struct FetchOverrides {
    top: Option<usize>,
    days: Option<u32>,
    mode: Option<GameMode>,
    out: Option<PathBuf>,
    delay_ms: Option<u64>,
}

impl FetchOverrides {
    fn apply(self, config: &mut AppConfig) {
        if let Some(top) = self.top {
            config.api.top_players = top;
        }
        if let Some(days) = self.days {
            config.api.window_days = days;
        }
        if let Some(mode) = self.mode {
            config.api.search_mode = mode;
        }
        if let Some(out) = self.out {
            config.output.dir = out;
        }
        if let Some(delay) = self.delay_ms {
            config.api.player_delay_ms = delay;
        }
    }
}

async fn cmd_fetch(config_path: Option<&Path>, overrides: FetchOverrides) -> Result<()> {
    let mut config = resolve_config(config_path)?;
    overrides.apply(&mut config);

    // Fatal before any network call
    let token = load_api_token(&config.credentials)?;

    let pipeline_config = PipelineConfig::from(&config);
    info!(
        top = pipeline_config.fetch.top_players,
        mode = %pipeline_config.fetch.search_mode,
        days = pipeline_config.fetch.window_days,
        "fetching winning builds"
    );

    let reporter = CliProgress::new();
    let summary = gauntlet_core::pipeline::run_fetch(&pipeline_config, token, &reporter).await?;

    print_fetch_summary(&summary);
    Ok(())
}

fn print_fetch_summary(summary: &RunSummary) {
    println!();
    if summary.players.is_empty() {
        println!("  ⚠️  Leaderboard returned no players");
    }
    for player in &summary.players {
        let marker = if player.stats.matches == 0 { "⚠️ " } else { "✅" };
        println!(
            "  {marker} #{:<3} {:<24} {} builds ({} matches)",
            player.rank, player.username, player.stats.extracted, player.stats.matches
        );
    }
    println!();
    println!("  Players:  {}", summary.players.len());
    let without_matches = summary.players_without_matches().count();
    if without_matches > 0 {
        println!("  No games: {without_matches}");
    }
    println!("  Builds:   {}", summary.total_builds());
    println!("  Latest:   {}", summary.artifacts.latest.path.display());
    println!("  By mode:  {}", summary.artifacts.by_mode.path.display());
    match &summary.artifacts.mirror {
        Some(mirror) => println!("  Mirror:   {}", mirror.path.display()),
        None => println!("  Mirror:   (not written)"),
    }
    println!("  Time:     {:.1}s", summary.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn player_started(&self, player: &LeaderboardEntry, current: usize, total: usize) {
        self.spinner.set_message(format!(
            "Searching [{current}/{total}] {} (rank {})",
            player.username, player.rank
        ));
    }

    fn player_finished(&self, summary: &PlayerSummary) {
        self.spinner.set_message(format!(
            "{}: {} builds",
            summary.username, summary.stats.extracted
        ));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// publish
// ---------------------------------------------------------------------------

struct PublishOverrides {
    mode: Option<GameMode>,
    out: Option<PathBuf>,
}

impl PublishOverrides {
    fn apply(self, config: &mut AppConfig) {
        if let Some(mode) = self.mode {
            config.api.search_mode = mode;
        }
        if let Some(out) = self.out {
            config.output.dir = out;
        }
    }
}

async fn cmd_publish(
    config_path: Option<&Path>,
    overrides: PublishOverrides,
    write_page: bool,
) -> Result<()> {
    let mut config = resolve_config(config_path)?;
    overrides.apply(&mut config);
    let token = load_github_token(&config.publish)?;
    let mode = config.api.search_mode;

    let publisher = GitHubPublisher::new(
        config.publish.clone(),
        token,
        Duration::from_secs(config.api.timeout_secs),
    )?;
    let targets = default_targets(&config.output, &config.publish, mode);

    info!(
        owner = %config.publish.owner,
        repo = %config.publish.repo,
        branch = %config.publish.branch,
        "publishing builds"
    );
    let report = publisher
        .publish_all(&targets, &config.output.latest_path())
        .await;

    println!();
    for file in &report.files {
        match &file.download_url {
            Some(url) => println!("  ✅ {}: {url}", file.remote_path),
            None => println!("  ❌ {}: not uploaded", file.remote_path),
        }
    }
    println!();

    if report.uploaded_count() == 0 {
        return Err(eyre!("no files were uploaded successfully"));
    }

    println!("  Raw URLs:");
    for file in report.uploaded() {
        println!("    {}", file.raw_url);
    }
    println!();

    if write_page {
        let path = config.output.dir.join(&config.output.page_file);
        let html = page::render_page(&report, &config.publish, chrono::Utc::now());
        page::write_page(&path, &html)?;
        println!("  📄 Wrote {}", path.display());
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// extract
// ---------------------------------------------------------------------------

fn cmd_extract(file: &Path, player: &str, rank: u32) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .wrap_err_with(|| format!("failed to read {}", file.display()))?;
    let body: serde_json::Value = serde_json::from_str(&content)
        .wrap_err_with(|| format!("{} is not valid JSON", file.display()))?;

    let games = match body {
        serde_json::Value::Array(games) => games,
        serde_json::Value::Object(mut map) => match map.remove("games") {
            Some(serde_json::Value::Array(games)) => games,
            _ => Vec::new(),
        },
        _ => return Err(eyre!("{} holds neither a search response nor a list of games", file.display())),
    };

    let outcomes = evaluate_matches(&games, player, rank);
    for (i, outcome) in outcomes.iter().enumerate() {
        match outcome {
            MatchOutcome::Extracted { build, warning } => {
                eprintln!("  ✅ match {i}: {} ({} illuvials)", build.game_id, build.illuvials.len());
                match warning {
                    Some(RosterWarning::Truncated { count }) => {
                        eprintln!("  ⚠️  {count} illuvials, kept the first 10");
                    }
                    Some(RosterWarning::Undersized { count }) => {
                        eprintln!("  ⚠️  only {count} illuvials (expected 7-10)");
                    }
                    None => {}
                }
            }
            MatchOutcome::Skipped(reason) => eprintln!("  ·  match {i}: {reason}"),
        }
    }

    let stats = ExtractionStats::from_outcomes(&outcomes);
    eprintln!(
        "\n  {} of {} matches yielded a build\n",
        stats.extracted, stats.matches
    );

    let builds: Vec<_> = outcomes.iter().filter_map(MatchOutcome::build).collect();
    println!("{}", serde_json::to_string_pretty(&builds)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");

    let output = OutputConfig::new(&config.output, config.api.search_mode);
    println!("# latest document:  {}", output.latest_path.display());
    println!("# by-mode document: {}", output.mode_path.display());
    Ok(())
}
