//! HTTP clients for the game's public data API.
//!
//! Two endpoints are used: the ranked leaderboard (public) and the match
//! search (token-authenticated). Both clients degrade to an empty result on
//! any transport or API failure, so one bad call never stops a run. The
//! `try_*` variants return the typed error for callers that want it.

mod leaderboard;
mod search;

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;

use gauntlet_shared::{GauntletError, Result};

pub use leaderboard::{LEADERBOARD_PATH, LeaderboardClient};
pub use search::{MatchSearchClient, SEARCH_PATH, search_window};

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("gauntlet-builds/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 3;

/// Build a reqwest client with the pipeline's fixed timeout.
pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(timeout)
        .build()
        .map_err(|e| GauntletError::Transport(format!("failed to build HTTP client: {e}")))
}

/// Resolve an endpoint path against the configured base URL.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url> {
    base.join(path)
        .map_err(|e| GauntletError::config(format!("invalid endpoint {base}{path}: {e}")))
}

/// Read a response body, classifying the outcome as transport, API, or shape failure.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| GauntletError::Transport(format!("{url}: failed to read body: {e}")))?;

    if !status.is_success() {
        return Err(GauntletError::Api {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body)
        .map_err(|e| GauntletError::shape(format!("{url}: unexpected response body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_against_root() {
        let base = Url::parse("https://api.illuvium-game.io").unwrap();
        assert_eq!(
            endpoint(&base, LEADERBOARD_PATH).unwrap().as_str(),
            "https://api.illuvium-game.io/gamedata/gauntlet/leaderboard"
        );
        assert_eq!(
            endpoint(&base, SEARCH_PATH).unwrap().as_str(),
            "https://api.illuvium-game.io/gamedata/public/v1/gauntlet/search"
        );
    }
}
