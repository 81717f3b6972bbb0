//! End-to-end `fetch` pipeline: leaderboard → match search → extract → assemble → write.

use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use gauntlet_client::{LeaderboardClient, MatchSearchClient};
use gauntlet_extractor::{ExtractionStats, evaluate_matches};
use gauntlet_shared::{
    ApiToken, AppConfig, FetchConfig, LeaderboardEntry, OutputDocument, Result, WinningBuild,
};

use crate::assembler::{self, OutputConfig, WrittenArtifacts};

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub fetch: FetchConfig,
    pub output: OutputConfig,
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        let fetch = FetchConfig::from(config);
        let output = OutputConfig::new(&config.output, fetch.search_mode);
        Self { fetch, output }
    }
}

/// Per-player outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSummary {
    pub username: String,
    pub rank: u32,
    pub stats: ExtractionStats,
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunSummary {
    pub players: Vec<PlayerSummary>,
    pub document: OutputDocument,
    pub artifacts: WrittenArtifacts,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn total_builds(&self) -> usize {
        self.document.builds.len()
    }

    /// Players whose search returned no matches at all.
    pub fn players_without_matches(&self) -> impl Iterator<Item = &PlayerSummary> {
        self.players.iter().filter(|p| p.stats.matches == 0)
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a player's matches are searched.
    fn player_started(&self, player: &LeaderboardEntry, current: usize, total: usize);
    /// Called once a player's matches have been examined.
    fn player_finished(&self, summary: &PlayerSummary);
    /// Called when the pipeline completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn player_started(&self, _player: &LeaderboardEntry, _current: usize, _total: usize) {}
    fn player_finished(&self, _summary: &PlayerSummary) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Run the full `fetch` pipeline.
///
/// 1. Fetch the top players from the leaderboard
/// 2. For each player in rank order, search recent matches and extract builds
/// 3. Assemble the output document
/// 4. Write the local artifacts
///
/// Players are processed one at a time with a pause between them. Remote
/// failures degrade to "no data" for that call; only a local write failure
/// (or a config error) fails the run.
#[instrument(skip_all, fields(mode = %config.fetch.search_mode, window_days = config.fetch.window_days))]
pub async fn run_fetch(
    config: &PipelineConfig,
    token: ApiToken,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let start = Instant::now();
    info!("starting fetch pipeline");

    // --- Phase 1: Leaderboard ---
    progress.phase("Fetching leaderboard");
    let leaderboard = LeaderboardClient::new(config.fetch.clone())?;
    let players = leaderboard.fetch_leaderboard().await;
    if players.is_empty() {
        warn!("leaderboard returned no players");
    }

    // --- Phase 2: Matches ---
    progress.phase("Searching matches");
    let search = MatchSearchClient::new(config.fetch.clone(), token)?;
    let (builds, summaries) = collect_builds(&search, &players, config, progress).await;

    // --- Phase 3: Output ---
    progress.phase("Writing output");
    let document = assembler::assemble(players, builds);
    let artifacts = assembler::write_outputs(&document, &config.output)?;

    let summary = RunSummary {
        players: summaries,
        document,
        artifacts,
        elapsed: start.elapsed(),
    };

    info!(
        players = summary.players.len(),
        total_builds = summary.total_builds(),
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "fetch pipeline complete"
    );
    for player in &summary.players {
        info!(
            player = %player.username,
            rank = player.rank,
            builds = player.stats.extracted,
            "player summary"
        );
    }

    progress.done(&summary);
    Ok(summary)
}

async fn collect_builds(
    search: &MatchSearchClient,
    players: &[LeaderboardEntry],
    config: &PipelineConfig,
    progress: &dyn ProgressReporter,
) -> (Vec<WinningBuild>, Vec<PlayerSummary>) {
    let mut builds = Vec::new();
    let mut summaries = Vec::with_capacity(players.len());

    for (i, player) in players.iter().enumerate() {
        if i > 0 && !config.fetch.player_delay.is_zero() {
            tokio::time::sleep(config.fetch.player_delay).await;
        }

        progress.player_started(player, i + 1, players.len());
        info!(player = %player.username, rank = player.rank, "processing player");

        let games = search
            .search_matches(&player.username, config.fetch.window_days)
            .await;
        if games.is_empty() {
            warn!(player = %player.username, "no matches found, skipping");
        }

        let outcomes = evaluate_matches(&games, &player.username, player.rank);
        let stats = ExtractionStats::from_outcomes(&outcomes);
        builds.extend(outcomes.into_iter().filter_map(|o| o.into_build()));

        let summary = PlayerSummary {
            username: player.username.clone(),
            rank: player.rank,
            stats,
        };
        progress.player_finished(&summary);
        summaries.push(summary);
    }

    (builds, summaries)
}
