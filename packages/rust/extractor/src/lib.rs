//! Winning-build extraction from raw match history.
//!
//! For each game a player took first place in, the extractor reads the team
//! they fielded in the deciding (last) round and normalizes it into a
//! [`WinningBuild`]. Match payloads come from a third-party API with no
//! guaranteed shape, so every step is a guard: anything missing or malformed
//! skips that one match with a [`SkipReason`] and extraction moves on.

pub mod date;
pub mod record;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use gauntlet_shared::{IlluvialEntry, WinningBuild};

pub use date::{format_match_date, format_start_time, parse_start_time};
pub use record::{MatchRecord, Matchup, PlayerResult, Round, Side, text_of};

/// Largest roster kept; longer rosters are cut to this many units.
pub const MAX_ROSTER: usize = 10;

/// Smallest roster considered complete; shorter ones are kept but flagged.
pub const MIN_ROSTER: usize = 7;

/// Fallback for missing names, suits, and weapons.
const UNKNOWN: &str = "Unknown";

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a match produced no build.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("malformed match record: {0}")]
    Malformed(String),
    #[error("player has no entry in results")]
    NotInResults,
    #[error("player placed {placement:?}, not first")]
    NotWinner { placement: Option<i64> },
    #[error("match has no rounds")]
    NoRounds,
    #[error("final round is malformed")]
    MalformedFinalRound,
    #[error("player has no matchup in the final round")]
    NotInFinalRound,
    #[error("illuvials is not a list")]
    MalformedRoster,
}

/// Roster size outside the expected `[MIN_ROSTER, MAX_ROSTER]` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterWarning {
    /// More than [`MAX_ROSTER`] units; only the first ten were kept.
    Truncated { count: usize },
    /// Fewer than [`MIN_ROSTER`] units; kept as-is.
    Undersized { count: usize },
}

/// Result of examining one match.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Extracted {
        build: WinningBuild,
        warning: Option<RosterWarning>,
    },
    Skipped(SkipReason),
}

impl MatchOutcome {
    pub fn build(&self) -> Option<&WinningBuild> {
        match self {
            Self::Extracted { build, .. } => Some(build),
            Self::Skipped(_) => None,
        }
    }

    pub fn into_build(self) -> Option<WinningBuild> {
        match self {
            Self::Extracted { build, .. } => Some(build),
            Self::Skipped(_) => None,
        }
    }
}

/// Counts over a batch of outcomes, for run summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub matches: usize,
    pub extracted: usize,
    pub skipped: usize,
    pub roster_warnings: usize,
}

impl ExtractionStats {
    pub fn from_outcomes(outcomes: &[MatchOutcome]) -> Self {
        outcomes.iter().fold(
            Self {
                matches: outcomes.len(),
                ..Self::default()
            },
            |mut stats, outcome| {
                match outcome {
                    MatchOutcome::Extracted { warning, .. } => {
                        stats.extracted += 1;
                        if warning.is_some() {
                            stats.roster_warnings += 1;
                        }
                    }
                    MatchOutcome::Skipped(_) => stats.skipped += 1,
                }
                stats
            },
        )
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract the winning builds of `player` from a batch of raw games.
///
/// Never fails. Games that do not yield a build are skipped; the order of the
/// remaining builds follows the input order.
pub fn extract_builds(games: &[Value], player: &str, player_rank: u32) -> Vec<WinningBuild> {
    evaluate_matches(games, player, player_rank)
        .into_iter()
        .filter_map(MatchOutcome::into_build)
        .collect()
}

/// Examine every game, keeping the per-match outcome.
#[instrument(skip(games), fields(count = games.len()))]
pub fn evaluate_matches(games: &[Value], player: &str, player_rank: u32) -> Vec<MatchOutcome> {
    let outcomes: Vec<MatchOutcome> = games
        .iter()
        .map(|game| extract_match(game, player, player_rank))
        .collect();

    let stats = ExtractionStats::from_outcomes(&outcomes);
    info!(
        extracted = stats.extracted,
        skipped = stats.skipped,
        roster_warnings = stats.roster_warnings,
        "extraction complete"
    );
    outcomes
}

/// Examine a single game.
pub fn extract_match(game: &Value, player: &str, player_rank: u32) -> MatchOutcome {
    match try_extract(game, player, player_rank) {
        Ok((build, warning)) => {
            debug!(
                player,
                game_id = %build.game_id,
                illuvials = build.illuvials.len(),
                "extracted winning build"
            );
            MatchOutcome::Extracted { build, warning }
        }
        Err(reason) => {
            debug!(player, %reason, "match skipped");
            MatchOutcome::Skipped(reason)
        }
    }
}

fn try_extract(
    game: &Value,
    player: &str,
    player_rank: u32,
) -> Result<(WinningBuild, Option<RosterWarning>), SkipReason> {
    let record = MatchRecord::from_value(game).map_err(SkipReason::Malformed)?;

    let result = record.result_for(player).ok_or(SkipReason::NotInResults)?;
    if result.rank != Some(1) {
        return Err(SkipReason::NotWinner {
            placement: result.rank,
        });
    }

    let final_round = record
        .rounds
        .as_deref()
        .and_then(<[_]>::last)
        .ok_or(SkipReason::NoRounds)?
        .valid()
        .ok_or(SkipReason::MalformedFinalRound)?;

    let side = final_round
        .side_of(player)
        .ok_or(SkipReason::NotInFinalRound)?;

    let (illuvials, warning) = roster(side.illuvials.as_ref())?;
    if let Some(w) = warning {
        warn!(player, ?w, "illuvial count outside expected 7-10");
    }

    let build = WinningBuild {
        player_name: player.to_string(),
        player_rank,
        placement: 1,
        illuvials,
        suit: leaf_or_unknown(side.suit.as_ref()),
        weapon: leaf_or_unknown(side.weapon.as_ref()),
        match_date: format_match_date(record.start_time.as_ref()),
        mode: record.mode(),
        game_id: record.game_id(),
    };

    Ok((build, warning))
}

/// Normalize a side's `illuvials` list, clamping it to [`MAX_ROSTER`].
///
/// The size check counts raw entries, before non-object entries are dropped.
fn roster(
    raw: Option<&Value>,
) -> Result<(Vec<IlluvialEntry>, Option<RosterWarning>), SkipReason> {
    let entries: &[Value] = match raw {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items,
        Some(_) => return Err(SkipReason::MalformedRoster),
    };

    let count = entries.len();
    let warning = if count > MAX_ROSTER {
        Some(RosterWarning::Truncated { count })
    } else if count < MIN_ROSTER {
        Some(RosterWarning::Undersized { count })
    } else {
        None
    };

    let illuvials = entries
        .iter()
        .take(MAX_ROSTER)
        .filter_map(normalize_illuvial)
        .collect();

    Ok((illuvials, warning))
}

/// Normalize one roster entry. Non-object entries yield `None`.
pub fn normalize_illuvial(raw: &Value) -> Option<IlluvialEntry> {
    let obj = raw.as_object()?;

    let augments = match obj.get("augments") {
        Some(Value::Array(items)) => items.iter().filter_map(normalize_augment).collect(),
        _ => Vec::new(),
    };

    Some(IlluvialEntry {
        name: leaf_or_unknown(obj.get("name")),
        is_bonded: obj.get("isBonded").and_then(Value::as_bool).unwrap_or(false),
        augments,
    })
}

/// Strings are augment names; objects contribute their `name` (or `Unknown`);
/// anything else is dropped.
pub fn normalize_augment(raw: &Value) -> Option<String> {
    match raw {
        Value::String(name) => Some(name.clone()),
        Value::Object(obj) => Some(
            obj.get("name")
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN)
                .to_string(),
        ),
        _ => None,
    }
}

fn leaf_or_unknown(value: Option<&Value>) -> String {
    value
        .and_then(text_of)
        .unwrap_or_else(|| UNKNOWN.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn load_games() -> Vec<Value> {
        let content = std::fs::read_to_string("../../../fixtures/games/search_response.json")
            .expect("read search fixture");
        let body: Value = serde_json::from_str(&content).expect("parse search fixture");
        body["games"].as_array().expect("games array").clone()
    }

    fn roster_json(count: usize) -> Vec<Value> {
        (0..count)
            .map(|i| json!({ "name": format!("Unit{i}"), "isBonded": i == 0, "augments": [] }))
            .collect()
    }

    /// A game won by `player` whose final round gives them `illuvials`.
    fn winning_game(player: &str, illuvials: Vec<Value>) -> Value {
        json!({
            "gameId": "g-test",
            "startTime": "2024-06-01T12:30:00Z",
            "mode": "Ranked",
            "results": [{ "player": player, "rank": 1 }],
            "rounds": [{
                "matchups": [{
                    "blue": { "player": player, "illuvials": illuvials, "suit": "Ranger Suit", "weapon": "Shotgun" },
                    "red": { "player": "Opponent" }
                }]
            }]
        })
    }

    #[test]
    fn non_winning_placement_emits_nothing() {
        for rank in [json!(2), json!(8), json!(0), json!(null)] {
            let mut game = winning_game("Alice", roster_json(8));
            game["results"][0]["rank"] = rank.clone();
            let outcome = extract_match(&game, "Alice", 1);
            assert!(
                matches!(outcome, MatchOutcome::Skipped(SkipReason::NotWinner { .. })),
                "rank {rank} should be skipped"
            );
        }
    }

    #[test]
    fn player_missing_from_results_emits_nothing() {
        let game = winning_game("Alice", roster_json(8));
        assert_eq!(
            extract_match(&game, "Bob", 1),
            MatchOutcome::Skipped(SkipReason::NotInResults)
        );

        let mut no_results = winning_game("Alice", roster_json(8));
        no_results.as_object_mut().unwrap().remove("results");
        assert!(extract_builds(&[no_results], "Alice", 1).is_empty());
    }

    #[test]
    fn winner_without_rounds_emits_nothing() {
        let mut empty = winning_game("Alice", roster_json(8));
        empty["rounds"] = json!([]);
        assert_eq!(
            extract_match(&empty, "Alice", 1),
            MatchOutcome::Skipped(SkipReason::NoRounds)
        );

        let mut absent = winning_game("Alice", roster_json(8));
        absent.as_object_mut().unwrap().remove("rounds");
        assert!(extract_builds(&[absent], "Alice", 1).is_empty());
    }

    #[test]
    fn only_the_last_round_decides() {
        let mut game = winning_game("Alice", roster_json(8));
        // Alice is only present in an earlier round
        game["rounds"] = json!([
            game["rounds"][0].clone(),
            { "matchups": [{ "blue": { "player": "Bob" }, "red": { "player": "Carol" } }] }
        ]);
        assert_eq!(
            extract_match(&game, "Alice", 1),
            MatchOutcome::Skipped(SkipReason::NotInFinalRound)
        );

        game["rounds"][1] = json!("not a round");
        assert_eq!(
            extract_match(&game, "Alice", 1),
            MatchOutcome::Skipped(SkipReason::MalformedFinalRound)
        );
    }

    #[test]
    fn oversized_roster_is_clamped_to_first_ten() {
        let game = winning_game("Alice", roster_json(12));
        match extract_match(&game, "Alice", 3) {
            MatchOutcome::Extracted { build, warning } => {
                assert_eq!(build.illuvials.len(), 10);
                let names: Vec<&str> = build.illuvials.iter().map(|i| i.name.as_str()).collect();
                let expected: Vec<String> = (0..10).map(|i| format!("Unit{i}")).collect();
                assert_eq!(names, expected);
                assert_eq!(warning, Some(RosterWarning::Truncated { count: 12 }));
                assert_eq!(build.player_rank, 3);
            }
            other => panic!("expected extraction, got {other:?}"),
        }
    }

    #[test]
    fn undersized_roster_passes_through_with_warning() {
        let game = winning_game("Alice", roster_json(5));
        match extract_match(&game, "Alice", 1) {
            MatchOutcome::Extracted { build, warning } => {
                assert_eq!(build.illuvials.len(), 5);
                assert_eq!(warning, Some(RosterWarning::Undersized { count: 5 }));
            }
            other => panic!("expected extraction, got {other:?}"),
        }
    }

    #[test]
    fn roster_in_expected_range_has_no_warning() {
        let game = winning_game("Alice", roster_json(7));
        assert!(matches!(
            extract_match(&game, "Alice", 1),
            MatchOutcome::Extracted { warning: None, .. }
        ));
    }

    #[test]
    fn augments_normalize_to_names() {
        let raw = json!({ "name": "Rhamphyre", "isBonded": true, "augments": ["Fire", { "name": "Ice" }, 42] });
        let entry = normalize_illuvial(&raw).unwrap();
        assert_eq!(entry.augments, vec!["Fire", "Ice"]);
        assert!(entry.is_bonded);

        assert_eq!(normalize_augment(&json!({ "tier": 2 })).as_deref(), Some("Unknown"));
        assert_eq!(normalize_augment(&json!(null)), None);
    }

    #[test]
    fn illuvial_defaults_apply() {
        let entry = normalize_illuvial(&json!({})).unwrap();
        assert_eq!(entry.name, "Unknown");
        assert!(!entry.is_bonded);
        assert!(entry.augments.is_empty());
        assert!(normalize_illuvial(&json!("Rhamphyre")).is_none());
    }

    #[test]
    fn side_defaults_apply() {
        let game = json!({
            "results": [{ "player": "Alice", "rank": 1 }],
            "rounds": [{ "matchups": [{ "red": { "player": "Alice" } }] }]
        });
        let build = extract_match(&game, "Alice", 1).into_build().expect("build");
        assert!(build.illuvials.is_empty());
        assert_eq!(build.suit, "Unknown");
        assert_eq!(build.weapon, "Unknown");
        assert_eq!(build.match_date, "Unknown");
        assert_eq!(build.mode, "Unknown");
        assert_eq!(build.game_id, "");
    }

    #[test]
    fn non_list_roster_skips_match() {
        let mut game = winning_game("Alice", roster_json(8));
        game["rounds"][0]["matchups"][0]["blue"]["illuvials"] = json!({ "name": "Solo" });
        assert_eq!(
            extract_match(&game, "Alice", 1),
            MatchOutcome::Skipped(SkipReason::MalformedRoster)
        );
    }

    #[test]
    fn start_time_is_formatted_or_passed_through() {
        let game = winning_game("Alice", roster_json(8));
        let build = extract_match(&game, "Alice", 1).into_build().unwrap();
        assert_eq!(build.match_date, "2024-06-01 12:30 UTC");

        let mut raw = winning_game("Alice", roster_json(8));
        raw["startTime"] = json!("not-a-date");
        let build = extract_match(&raw, "Alice", 1).into_build().unwrap();
        assert_eq!(build.match_date, "not-a-date");
    }

    #[test]
    fn extraction_is_idempotent() {
        let games = load_games();
        let first = extract_builds(&games, "Alice", 1);
        let second = extract_builds(&games, "Alice", 1);
        assert_eq!(first, second);
    }

    #[test]
    fn fixture_batch_keeps_going_past_bad_matches() {
        let games = load_games();
        let outcomes = evaluate_matches(&games, "Alice", 1);
        assert_eq!(outcomes.len(), 6);

        assert!(matches!(outcomes[1], MatchOutcome::Skipped(SkipReason::NotWinner { placement: Some(3) })));
        assert_eq!(outcomes[2], MatchOutcome::Skipped(SkipReason::NoRounds));
        assert!(matches!(outcomes[4], MatchOutcome::Skipped(SkipReason::Malformed(_))));
        assert_eq!(outcomes[5], MatchOutcome::Skipped(SkipReason::NotInResults));

        let stats = ExtractionStats::from_outcomes(&outcomes);
        assert_eq!(
            stats,
            ExtractionStats {
                matches: 6,
                extracted: 2,
                skipped: 4,
                roster_warnings: 1
            }
        );

        let builds = extract_builds(&games, "Alice", 1);
        assert_eq!(builds.len(), 2);

        // Blue side of the last round, not the decoy from round one
        let blue = &builds[0];
        assert_eq!(blue.game_id, "g-win-blue");
        assert_eq!(blue.illuvials.len(), 8);
        assert_eq!(blue.suit, "Ranger Suit");
        assert_eq!(blue.weapon, "Shotgun");
        assert_eq!(blue.match_date, "2024-06-01 12:30 UTC");
        assert_eq!(blue.illuvials[0].augments, vec!["Fire Shard", "Ice Shard"]);
        assert_eq!(blue.bonded_illuvials(), vec!["Rhamphyre", "Grokko"]);

        // Red side, numeric id fallback, raw date passthrough, clamped roster
        let red = &builds[1];
        assert_eq!(red.game_id, "7731");
        assert_eq!(red.mode, "Gauntlet");
        assert_eq!(red.match_date, "not-a-date");
        assert_eq!(red.illuvials.len(), 10);
        assert_eq!(red.suit, "Unknown");
    }
}
