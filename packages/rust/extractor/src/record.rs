//! Typed view of a raw match record.
//!
//! Every field is optional. Lists of objects use [`Lenient`] so a single odd
//! element is set aside instead of failing the record, and free-form leaf
//! values stay as JSON until they are rendered.

use serde::Deserialize;
use serde_json::Value;

use gauntlet_shared::Lenient;

/// One game as returned by the match search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    #[serde(default)]
    pub results: Option<Vec<Lenient<PlayerResult>>>,
    #[serde(default)]
    pub rounds: Option<Vec<Lenient<Round>>>,
    #[serde(default)]
    pub game_id: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub start_time: Option<Value>,
    #[serde(default)]
    pub mode: Option<Value>,
}

/// A player's final standing in a match.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerResult {
    #[serde(default)]
    pub player: Option<String>,
    #[serde(default)]
    pub rank: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Round {
    #[serde(default)]
    pub matchups: Option<Vec<Lenient<Matchup>>>,
}

/// A head-to-head pairing within a round.
#[derive(Debug, Clone, Deserialize)]
pub struct Matchup {
    #[serde(default)]
    pub blue: Option<Lenient<Side>>,
    #[serde(default)]
    pub red: Option<Lenient<Side>>,
}

/// One player's half of a matchup.
#[derive(Debug, Clone, Deserialize)]
pub struct Side {
    #[serde(default)]
    pub player: Option<String>,
    #[serde(default)]
    pub illuvials: Option<Value>,
    #[serde(default)]
    pub suit: Option<Value>,
    #[serde(default)]
    pub weapon: Option<Value>,
}

impl MatchRecord {
    /// Decode a raw game. Fails only when the value is not an object or a
    /// top-level list field has the wrong type.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        if !value.is_object() {
            return Err(format!("match record is not an object ({})", kind(value)));
        }
        Self::deserialize(value).map_err(|e| e.to_string())
    }

    /// The result entry for `player`, if one decodes cleanly.
    pub fn result_for(&self, player: &str) -> Option<&PlayerResult> {
        self.results
            .as_deref()?
            .iter()
            .filter_map(Lenient::valid)
            .find(|r| r.player.as_deref() == Some(player))
    }

    /// Game identifier: `gameId`, then `id`, then empty.
    pub fn game_id(&self) -> String {
        [&self.game_id, &self.id]
            .into_iter()
            .flatten()
            .find_map(text_of)
            .unwrap_or_default()
    }

    /// Mode exactly as the record states it.
    pub fn mode(&self) -> String {
        self.mode
            .as_ref()
            .and_then(text_of)
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

impl Round {
    /// The side `player` fought on, scanning matchups in order.
    pub fn side_of(&self, player: &str) -> Option<&Side> {
        self.matchups
            .as_deref()?
            .iter()
            .filter_map(Lenient::valid)
            .find_map(|m| {
                [&m.blue, &m.red]
                    .into_iter()
                    .flatten()
                    .filter_map(Lenient::valid)
                    .find(|side| side.player.as_deref() == Some(player))
            })
    }
}

/// Render a free-form JSON leaf as text.
///
/// Strings pass through, numbers and booleans are printed, objects contribute
/// their `name` field. `null`, arrays, and nameless objects yield `None`.
pub fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => map.get("name").and_then(Value::as_str).map(str::to_string),
        Value::Null | Value::Array(_) => None,
    }
}

pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
