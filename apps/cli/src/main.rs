//! Gauntlet CLI: collects winning builds of top-ranked Illuvium players.
//!
//! Fetches the leaderboard and recent matches, extracts the teams fielded in
//! won matches, writes them as JSON, and publishes them to GitHub.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
