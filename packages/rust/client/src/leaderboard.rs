//! Ranked leaderboard fetch.

use reqwest::Client;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use gauntlet_shared::{FetchConfig, GauntletError, LeaderboardEntry, Lenient, Result};

use crate::{build_client, endpoint, read_json};

/// Leaderboard endpoint, relative to the API base URL.
pub const LEADERBOARD_PATH: &str = "gamedata/gauntlet/leaderboard";

#[derive(Debug, Deserialize)]
struct LeaderboardResponse {
    #[serde(default)]
    entries: Vec<Lenient<RawEntry>>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    nickname: Option<String>,
    /// Any JSON value; only a positive integer counts as a rank.
    #[serde(default)]
    position: Option<serde_json::Value>,
}

impl RawEntry {
    fn rank(&self) -> Option<u32> {
        self.position
            .as_ref()
            .and_then(serde_json::Value::as_u64)
            .and_then(|p| u32::try_from(p).ok())
            .filter(|p| *p >= 1)
    }
}

/// Client for the public leaderboard endpoint.
pub struct LeaderboardClient {
    client: Client,
    config: FetchConfig,
}

impl LeaderboardClient {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = build_client(config.timeout)?;
        Ok(Self { client, config })
    }

    /// Fetch the top players, ascending by rank. Never fails: any error is
    /// logged and yields an empty list.
    pub async fn fetch_leaderboard(&self) -> Vec<LeaderboardEntry> {
        match self.try_fetch_leaderboard().await {
            Ok(players) => players,
            Err(e) => {
                warn!(error = %e, "leaderboard fetch failed, continuing with no players");
                Vec::new()
            }
        }
    }

    /// Fetch the top players, returning the failure instead of degrading.
    #[instrument(skip_all, fields(mode = %self.config.leaderboard_mode))]
    pub async fn try_fetch_leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let url = endpoint(&self.config.base_url, LEADERBOARD_PATH)?;
        info!(%url, "fetching leaderboard");

        let response = self
            .client
            .get(url.clone())
            .query(&[
                ("mode", self.config.leaderboard_mode.as_str().to_string()),
                ("limit", self.config.leaderboard_limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| GauntletError::Transport(format!("{url}: {e}")))?;

        let body: LeaderboardResponse = read_json(response, url.as_str()).await?;
        let players = top_players(
            body.entries,
            self.config.top_players,
            &self.config.profile_url_base,
        );

        info!(count = players.len(), "leaderboard fetched");
        Ok(players)
    }
}

/// Normalize raw entries and keep the `limit` best-ranked ones.
///
/// Entries that are not objects are dropped. A missing nickname, or a missing
/// or non-positive-integer position, falls back to the entry's place in the list.
fn top_players(
    entries: Vec<Lenient<RawEntry>>,
    limit: usize,
    profile_url_base: &str,
) -> Vec<LeaderboardEntry> {
    let base = profile_url_base.trim_end_matches('/');

    let mut players: Vec<LeaderboardEntry> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| {
            let raw = entry.into_valid()?;
            let place = u32::try_from(i + 1).unwrap_or(u32::MAX);
            let rank = raw.rank().unwrap_or(place);
            let username = raw.nickname.unwrap_or_else(|| format!("Player{place}"));
            Some(LeaderboardEntry {
                profile_url: format!("{base}/{username}"),
                rank,
                username,
            })
        })
        .collect();

    players.sort_by_key(|p| p.rank);
    players.truncate(limit);
    players
}
