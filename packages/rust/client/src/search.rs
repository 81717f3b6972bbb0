//! Match history search for a single player.

use chrono::{DateTime, Days, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use gauntlet_shared::{ApiToken, FetchConfig, GameMode, GauntletError, Result};

use crate::{build_client, endpoint, read_json};

/// Match search endpoint, relative to the API base URL.
pub const SEARCH_PATH: &str = "gamedata/public/v1/gauntlet/search";

/// Date format the search endpoint expects: ISO-8601 without an offset.
const SEARCH_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    players: [&'a str; 1],
    start_date: String,
    end_date: String,
    include_rounds_data: bool,
    mode: GameMode,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    games: Vec<serde_json::Value>,
}

/// Client for the authenticated match search endpoint.
///
/// Construction requires an [`ApiToken`], so a missing credential surfaces at
/// startup rather than on the first search.
pub struct MatchSearchClient {
    client: Client,
    config: FetchConfig,
    token: ApiToken,
}

impl MatchSearchClient {
    pub fn new(config: FetchConfig, token: ApiToken) -> Result<Self> {
        let client = build_client(config.timeout)?;
        Ok(Self {
            client,
            config,
            token,
        })
    }

    /// Search a player's matches over the last `window_days` days. Never fails:
    /// any error is logged and yields an empty list.
    pub async fn search_matches(&self, player: &str, window_days: u32) -> Vec<serde_json::Value> {
        match self.try_search_matches(player, window_days).await {
            Ok(games) => games,
            Err(e) => {
                warn!(player, error = %e, "match search failed, treating player as having no matches");
                Vec::new()
            }
        }
    }

    /// Search a player's matches, returning the failure instead of degrading.
    ///
    /// Matches are returned as raw JSON: their shape is not guaranteed and is
    /// interpreted per match by the extractor.
    #[instrument(skip_all, fields(player = %player, window_days = window_days, mode = %self.config.search_mode))]
    pub async fn try_search_matches(
        &self,
        player: &str,
        window_days: u32,
    ) -> Result<Vec<serde_json::Value>> {
        if player.trim().is_empty() {
            return Err(GauntletError::validation("player identifier must not be empty"));
        }

        let (start_date, end_date) = search_window(Utc::now(), window_days).ok_or_else(|| {
            GauntletError::validation(format!("search window of {window_days} days is out of range"))
        })?;
        let url = endpoint(&self.config.base_url, SEARCH_PATH)?;
        info!(player, %start_date, %end_date, "searching matches");

        let request = SearchRequest {
            players: [player],
            start_date,
            end_date,
            include_rounds_data: true,
            mode: self.config.search_mode,
        };

        let response = self
            .client
            .post(url.clone())
            .header(
                reqwest::header::AUTHORIZATION,
                format!("{} {}", self.config.auth_scheme, self.token.expose()),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| GauntletError::Transport(format!("{url}: {e}")))?;

        let body: SearchResponse = read_json(response, url.as_str()).await?;
        info!(player, games = body.games.len(), "match search complete");
        if let Some(first) = body.games.first() {
            debug!(player, sample = %truncate(&first.to_string(), 500), "first game");
        }

        Ok(body.games)
    }
}

/// The `[now - window_days, now]` window, formatted for the search endpoint.
///
/// `None` when the start falls outside the representable date range.
pub fn search_window(now: DateTime<Utc>, window_days: u32) -> Option<(String, String)> {
    let start = now.checked_sub_days(Days::new(u64::from(window_days)))?;
    Some((
        start.format(SEARCH_DATE_FORMAT).to_string(),
        now.format(SEARCH_DATE_FORMAT).to_string(),
    ))
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;
    use gauntlet_shared::AppConfig;
    use url::Url;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> MatchSearchClient {
        let mut config = FetchConfig::from(&AppConfig::default());
        config.base_url = Url::parse(&server.uri()).unwrap();
        config.timeout = Duration::from_secs(5);
        MatchSearchClient::new(config, ApiToken::new("test-token")).unwrap()
    }

    #[test]
    fn window_spans_requested_days_without_offset() {
        let now = Utc.with_ymd_and_hms(2024, 6, 8, 12, 30, 45).unwrap();
        let (start, end) = search_window(now, 7).unwrap();
        assert_eq!(start, "2024-06-01T12:30:45");
        assert_eq!(end, "2024-06-08T12:30:45");

        let (start, _) = search_window(now, 1).unwrap();
        assert_eq!(start, "2024-06-07T12:30:45");
    }

    #[test]
    fn oversized_window_is_out_of_range() {
        assert!(search_window(Utc::now(), 200_000_000).is_none());
        assert!(search_window(Utc::now(), u32::MAX).is_none());
    }

    #[tokio::test]
    async fn oversized_window_is_rejected_without_a_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.try_search_matches("Alice", 200_000_000).await.unwrap_err();
        assert!(matches!(err, GauntletError::Validation { .. }));
        assert!(client.search_matches("Alice", 200_000_000).await.is_empty());
    }

    #[tokio::test]
    async fn connection_refused_yields_empty_list() {
        let mut config = FetchConfig::from(&AppConfig::default());
        config.base_url = Url::parse("http://127.0.0.1:9").unwrap();
        config.timeout = Duration::from_secs(2);
        let client = MatchSearchClient::new(config, ApiToken::new("test-token")).unwrap();

        let err = client.try_search_matches("Alice", 7).await.unwrap_err();
        assert!(matches!(err, GauntletError::Transport(_)));
        assert!(client.search_matches("Alice", 7).await.is_empty());
    }

    #[tokio::test]
    async fn posts_authenticated_search_and_returns_games() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gamedata/public/v1/gauntlet/search"))
            .and(header("authorization", "token test-token"))
            .and(body_partial_json(serde_json::json!({
                "players": ["Alice"],
                "includeRoundsData": true,
                "mode": "Ranked"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "games": [{ "gameId": "g-1" }, { "gameId": "g-2" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let games = client_for(&server).search_matches("Alice", 7).await;
        assert_eq!(games.len(), 2);
        assert_eq!(games[0]["gameId"], "g-1");
    }

    #[tokio::test]
    async fn missing_games_key_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gamedata/public/v1/gauntlet/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let games = client_for(&server).try_search_matches("Alice", 7).await.unwrap();
        assert!(games.is_empty());
    }

    #[tokio::test]
    async fn unauthorized_yields_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gamedata/public/v1/gauntlet/search"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.try_search_matches("Alice", 7).await.unwrap_err();
        assert!(err.to_string().contains("HTTP 401"));
        assert!(client.search_matches("Alice", 7).await.is_empty());
    }

    #[tokio::test]
    async fn empty_player_is_rejected_without_a_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server).try_search_matches("  ", 7).await.unwrap_err();
        assert!(matches!(err, GauntletError::Validation { .. }));
    }
}
