//! Core domain types: leaderboard entries, winning builds, and the published documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GauntletError;

// ---------------------------------------------------------------------------
// GameMode
// ---------------------------------------------------------------------------

/// Competitive game modes accepted by the leaderboard and search endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    Gauntlet,
    Ranked,
    Arena,
}

impl GameMode {
    /// The value sent on the wire (`mode=` query parameter or body field).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gauntlet => "Gauntlet",
            Self::Ranked => "Ranked",
            Self::Arena => "Arena",
        }
    }

    /// Lowercase form used in artifact file names (`illuvium_builds_ranked.json`).
    pub fn slug(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GameMode {
    type Err = GauntletError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gauntlet" => Ok(Self::Gauntlet),
            "ranked" => Ok(Self::Ranked),
            "arena" => Ok(Self::Arena),
            other => Err(GauntletError::validation(format!(
                "unknown game mode '{other}': expected Gauntlet, Ranked, or Arena"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// LeaderboardEntry
// ---------------------------------------------------------------------------

/// One ranked player taken from the public leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// Player identifier (the leaderboard nickname).
    pub username: String,
    /// Leaderboard position, starting at 1.
    pub rank: u32,
    /// Public profile page for the player.
    pub profile_url: String,
}

// ---------------------------------------------------------------------------
// WinningBuild
// ---------------------------------------------------------------------------

/// A single unit of a team composition, normalized from match data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IlluvialEntry {
    pub name: String,
    #[serde(default)]
    pub is_bonded: bool,
    #[serde(default)]
    pub augments: Vec<String>,
}

/// The team a player fielded in the deciding round of a match they won.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinningBuild {
    pub player_name: String,
    pub player_rank: u32,
    /// Final placement in the match. Always 1 for extracted builds.
    pub placement: u32,
    pub illuvials: Vec<IlluvialEntry>,
    pub suit: String,
    pub weapon: String,
    /// `YYYY-MM-DD HH:MM UTC`, the raw start time when unparseable, or `Unknown`.
    pub match_date: String,
    pub mode: String,
    pub game_id: String,
}

impl WinningBuild {
    /// Names of the bonded illuvials, in roster order.
    pub fn bonded_illuvials(&self) -> Vec<String> {
        self.illuvials
            .iter()
            .filter(|i| i.is_bonded)
            .map(|i| i.name.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// OutputDocument
// ---------------------------------------------------------------------------

/// A winning build as written to the output document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedBuild {
    #[serde(flatten)]
    pub build: WinningBuild,
    /// Derived from `build.illuvials`.
    #[serde(default)]
    pub bonded_illuvials: Vec<String>,
    /// Explicit identifier. Never set by the assembler; documents edited by hand may carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl From<WinningBuild> for PublishedBuild {
    fn from(build: WinningBuild) -> Self {
        Self {
            bonded_illuvials: build.bonded_illuvials(),
            build,
            id: None,
        }
    }
}

/// The "latest builds" document produced once per pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDocument {
    /// When the document was assembled (UTC).
    pub timestamp: DateTime<Utc>,
    pub players: Vec<LeaderboardEntry>,
    pub builds: Vec<PublishedBuild>,
}

impl OutputDocument {
    /// Build a document from the run's players and extracted builds.
    pub fn new(
        timestamp: DateTime<Utc>,
        players: Vec<LeaderboardEntry>,
        builds: Vec<WinningBuild>,
    ) -> Self {
        Self {
            timestamp,
            players,
            builds: builds.into_iter().map(PublishedBuild::from).collect(),
        }
    }

    /// The same document restricted to builds played in `mode` (case-insensitive).
    pub fn for_mode(&self, mode: GameMode) -> Self {
        Self {
            timestamp: self.timestamp,
            players: self.players.clone(),
            builds: self
                .builds
                .iter()
                .filter(|b| b.build.mode.eq_ignore_ascii_case(mode.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Number of builds attributed to `username`.
    pub fn builds_for(&self, username: &str) -> usize {
        self.builds
            .iter()
            .filter(|b| b.build.player_name == username)
            .count()
    }
}

// ---------------------------------------------------------------------------
// BuildsIndex
// ---------------------------------------------------------------------------

/// Summary row for one build in the published index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildsIndexEntry {
    pub player_name: String,
    pub placement: u32,
    pub match_date: String,
    pub illuvials_count: usize,
    pub has_bonded: bool,
    pub build_id: String,
}

/// Lightweight index of the published builds, for clients that only list them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildsIndex {
    pub last_updated: DateTime<Utc>,
    pub total_builds: usize,
    pub builds: Vec<BuildsIndexEntry>,
}

impl BuildsIndex {
    /// Derive the index from a document's builds.
    pub fn from_document(document: &OutputDocument, last_updated: DateTime<Utc>) -> Self {
        let builds: Vec<BuildsIndexEntry> = document
            .builds
            .iter()
            .map(|published| {
                let b = &published.build;
                BuildsIndexEntry {
                    player_name: b.player_name.clone(),
                    placement: b.placement,
                    match_date: b.match_date.clone(),
                    illuvials_count: b.illuvials.len(),
                    has_bonded: b.illuvials.iter().any(|i| i.is_bonded),
                    build_id: published
                        .id
                        .clone()
                        .unwrap_or_else(|| format!("{}_{}", b.player_name, b.match_date)),
                }
            })
            .collect();

        Self {
            last_updated,
            total_builds: builds.len(),
            builds,
        }
    }
}
