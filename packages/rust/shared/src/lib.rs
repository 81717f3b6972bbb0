//! Shared types, error model, credentials, and configuration for the gauntlet pipeline.
//!
//! This crate is the foundation depended on by all other gauntlet crates.
//! It provides:
//! - [`GauntletError`] — the unified error type
//! - Domain types ([`LeaderboardEntry`], [`WinningBuild`], [`OutputDocument`], [`BuildsIndex`])
//! - Configuration ([`AppConfig`], [`FetchConfig`], config loading)
//! - Credential loading ([`ApiToken`], [`load_api_token`])

pub mod config;
pub mod credentials;
pub mod error;
pub mod lenient;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, AppConfig, CredentialsConfig, FetchConfig, OutputSettings, PublishSettings,
    config_dir, config_file_path, init_config, load_config, load_config_from, mode_file_name,
};
pub use credentials::{ApiToken, load_api_token, load_github_token, parse_env_value};
pub use error::{GauntletError, Result};
pub use lenient::Lenient;
pub use types::{
    BuildsIndex, BuildsIndexEntry, GameMode, IlluvialEntry, LeaderboardEntry, OutputDocument,
    PublishedBuild, WinningBuild,
};
