//! Application configuration for the gauntlet build pipeline.
//!
//! User config lives at `~/.gauntlet/gauntlet.toml`.
//! CLI flags override config file values, which override defaults.
//! Credentials are never stored in the config file; it only names where to find them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GauntletError, Result};
use crate::types::GameMode;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "gauntlet.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".gauntlet";

// ---------------------------------------------------------------------------
// Config structs (matching gauntlet.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Game API endpoints and fetch policy.
    #[serde(default)]
    pub api: ApiConfig,

    /// Where the game API token comes from.
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Local artifact locations.
    #[serde(default)]
    pub output: OutputSettings,

    /// Remote content store settings.
    #[serde(default)]
    pub publish: PublishSettings,
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the game data API.
    #[serde(default = "default_base_url")]
    pub base_url: Url,

    /// Mode queried on the leaderboard.
    #[serde(default = "default_leaderboard_mode")]
    pub leaderboard_mode: GameMode,

    /// `limit` query parameter sent to the leaderboard.
    #[serde(default = "default_leaderboard_limit")]
    pub leaderboard_limit: u32,

    /// How many of the top-ranked players to process.
    #[serde(default = "default_top_players")]
    pub top_players: usize,

    /// Mode sent with every match search.
    #[serde(default = "default_search_mode")]
    pub search_mode: GameMode,

    /// Size of the match search window in days.
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// Timeout for every HTTP request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Pause between successive players' searches.
    #[serde(default = "default_player_delay_ms")]
    pub player_delay_ms: u64,

    /// Scheme prefix of the `Authorization` header (`token` or `Bearer`).
    #[serde(default = "default_auth_scheme")]
    pub auth_scheme: String,

    /// Prefix for player profile links.
    #[serde(default = "default_profile_url_base")]
    pub profile_url_base: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            leaderboard_mode: default_leaderboard_mode(),
            leaderboard_limit: default_leaderboard_limit(),
            top_players: default_top_players(),
            search_mode: default_search_mode(),
            window_days: default_window_days(),
            timeout_secs: default_timeout_secs(),
            player_delay_ms: default_player_delay_ms(),
            auth_scheme: default_auth_scheme(),
            profile_url_base: default_profile_url_base(),
        }
    }
}

fn default_base_url() -> Url {
    Url::parse("https://api.illuvium-game.io").expect("static URL is valid")
}
fn default_leaderboard_mode() -> GameMode {
    GameMode::Gauntlet
}
fn default_leaderboard_limit() -> u32 {
    100
}
fn default_top_players() -> usize {
    5
}
fn default_search_mode() -> GameMode {
    GameMode::Ranked
}
fn default_window_days() -> u32 {
    7
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_player_delay_ms() -> u64 {
    1000
}
fn default_auth_scheme() -> String {
    "token".into()
}
fn default_profile_url_base() -> String {
    "https://illuvilytics.web.app/profile".into()
}

/// `[credentials]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// `KEY=value` file holding the API token.
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,

    /// Key looked up in the env file, then in the process environment.
    #[serde(default = "default_token_key")]
    pub token_key: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            env_file: default_env_file(),
            token_key: default_token_key(),
        }
    }
}

fn default_env_file() -> PathBuf {
    PathBuf::from(".env")
}
fn default_token_key() -> String {
    "ILLUVIUM_API_TOKEN".into()
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Directory the canonical artifacts are written to.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// File name of the latest-builds document.
    #[serde(default = "default_latest_file")]
    pub latest_file: String,

    /// Secondary directory that receives a copy of the latest document.
    #[serde(default = "default_mirror_dir", skip_serializing_if = "Option::is_none")]
    pub mirror_dir: Option<PathBuf>,

    /// File name of the generated HTML access page.
    #[serde(default = "default_page_file")]
    pub page_file: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            latest_file: default_latest_file(),
            mirror_dir: default_mirror_dir(),
            page_file: default_page_file(),
        }
    }
}

impl OutputSettings {
    /// Path of the canonical latest-builds document.
    pub fn latest_path(&self) -> PathBuf {
        self.dir.join(&self.latest_file)
    }

    /// Path of the by-mode document (`illuvium_builds_<mode>.json`).
    pub fn mode_path(&self, mode: GameMode) -> PathBuf {
        self.dir.join(mode_file_name(mode))
    }
}

/// File name of the by-mode document.
pub fn mode_file_name(mode: GameMode) -> String {
    format!("illuvium_builds_{}.json", mode.slug())
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_latest_file() -> String {
    "latest_illuvium_builds.json".into()
}
fn default_mirror_dir() -> Option<PathBuf> {
    Some(PathBuf::from("public"))
}
fn default_page_file() -> String {
    "builds_data_access.html".into()
}

/// `[publish]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishSettings {
    /// Base URL of the GitHub REST API.
    #[serde(default = "default_github_api")]
    pub api_base: Url,

    /// Repository owner.
    #[serde(default = "default_owner")]
    pub owner: String,

    /// Repository name.
    #[serde(default = "default_repo")]
    pub repo: String,

    /// Branch commits are written to.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Directory inside the repository that holds the documents.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Name of the env var holding the GitHub token (never store the token itself).
    #[serde(default = "default_github_token_env")]
    pub token_env: String,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            api_base: default_github_api(),
            owner: default_owner(),
            repo: default_repo(),
            branch: default_branch(),
            data_dir: default_data_dir(),
            token_env: default_github_token_env(),
        }
    }
}

impl PublishSettings {
    /// Raw URL a consumer can fetch a published document from.
    pub fn raw_url(&self, remote_path: &str) -> String {
        format!(
            "https://raw.githubusercontent.com/{}/{}/{}/{}",
            self.owner, self.repo, self.branch, remote_path
        )
    }
}

fn default_github_api() -> Url {
    Url::parse("https://api.github.com").expect("static URL is valid")
}
fn default_owner() -> String {
    "DickKingz".into()
}
fn default_repo() -> String {
    "Overlay".into()
}
fn default_branch() -> String {
    "main".into()
}
fn default_data_dir() -> String {
    "data".into()
}
fn default_github_token_env() -> String {
    "GITHUB_TOKEN".into()
}

// ---------------------------------------------------------------------------
// Fetch config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime fetch configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub base_url: Url,
    pub leaderboard_mode: GameMode,
    pub leaderboard_limit: u32,
    pub top_players: usize,
    pub search_mode: GameMode,
    pub window_days: u32,
    pub timeout: Duration,
    pub player_delay: Duration,
    pub auth_scheme: String,
    pub profile_url_base: String,
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        let api = &config.api;
        Self {
            base_url: api.base_url.clone(),
            leaderboard_mode: api.leaderboard_mode,
            leaderboard_limit: api.leaderboard_limit,
            top_players: api.top_players,
            search_mode: api.search_mode,
            window_days: api.window_days,
            timeout: Duration::from_secs(api.timeout_secs),
            player_delay: Duration::from_millis(api.player_delay_ms),
            auth_scheme: api.auth_scheme.clone(),
            profile_url_base: api.profile_url_base.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.gauntlet/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| GauntletError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.gauntlet/gauntlet.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| GauntletError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| GauntletError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| GauntletError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| GauntletError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| GauntletError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("leaderboard_mode = \"Gauntlet\""));
        assert!(toml_str.contains("ILLUVIUM_API_TOKEN"));
        assert!(toml_str.contains("GITHUB_TOKEN"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.api.top_players, 5);
        assert_eq!(parsed.api.search_mode, GameMode::Ranked);
        assert_eq!(parsed.output.mirror_dir, Some(PathBuf::from("public")));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml_str = r#"
[api]
search_mode = "Gauntlet"
window_days = 3

[publish]
owner = "someone"
repo = "builds"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.api.search_mode, GameMode::Gauntlet);
        assert_eq!(config.api.window_days, 3);
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.publish.branch, "main");
        assert_eq!(
            config.publish.raw_url("data/latest_builds.json"),
            "https://raw.githubusercontent.com/someone/builds/main/data/latest_builds.json"
        );
    }

    #[test]
    fn fetch_config_from_app_config() {
        let app = AppConfig::default();
        let fetch = FetchConfig::from(&app);
        assert_eq!(fetch.timeout, Duration::from_secs(30));
        assert_eq!(fetch.player_delay, Duration::from_millis(1000));
        assert_eq!(fetch.leaderboard_mode, GameMode::Gauntlet);
        assert_eq!(fetch.leaderboard_limit, 100);
    }

    #[test]
    fn output_paths() {
        let settings = OutputSettings {
            dir: PathBuf::from("/tmp/out"),
            ..OutputSettings::default()
        };
        assert_eq!(
            settings.latest_path(),
            PathBuf::from("/tmp/out/latest_illuvium_builds.json")
        );
        assert_eq!(
            settings.mode_path(GameMode::Ranked),
            PathBuf::from("/tmp/out/illuvium_builds_ranked.json")
        );
    }

    #[test]
    fn invalid_config_is_config_error() {
        let dir = std::env::temp_dir().join(format!("gauntlet-config-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("gauntlet.toml");
        std::fs::write(&path, "[api]\nsearch_mode = \"Survival\"\n").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, GauntletError::Config { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
