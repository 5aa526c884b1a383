//! Typed room document and the single boundary that decodes raw store values into it.
//!
//! Keyed collections (`participants`, `menu_items`, `votes`, `presence`) can reach us either
//! as JSON arrays or as objects keyed by index/client id, depending on how the writer encoded
//! them. Everything is normalized here so callers only ever see ordered `Vec`s and
//! `IndexMap`s.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::warn;
use utoipa::ToSchema;

use crate::dao::paths::{RoomField, RoomId};

static NULL: Value = Value::Null;

/// Milliseconds since the Unix epoch, the timestamp unit used inside room documents.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Presence role claimed by a client when joining. Not enforced anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Room creator; drives roster edits and finalization.
    Owner,
    /// Everyone else.
    #[default]
    Participant,
}

/// Menu category shown on the wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// No filter.
    #[default]
    All,
    Korean,
    Chinese,
    Japanese,
    Western,
    Snack,
    Dessert,
    /// User supplied list, also used for values this build does not know.
    #[serde(other)]
    Custom,
}

/// Round phase stored at `phase`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RoomPhase {
    /// Roster editing, nobody spinning.
    #[default]
    Waiting,
    /// A spin was announced.
    Spinning,
    /// Results were published.
    Done,
}

/// Which list the wheel selects from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SpinTarget {
    /// Weighted roster; the owner's spin is authoritative.
    #[default]
    People,
    /// Menu entries; every participant spins and votes.
    Menu,
}

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Participant {
    /// Display name.
    pub name: String,
    /// Share of the wheel, in percent.
    #[serde(default)]
    pub weight: u32,
}

impl Participant {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, weight: u32) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// Presence record kept at `presence/{clientId}` while the client is connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub last_active: i64,
}

/// Spin announcement so remote viewers animate toward the same outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpinState {
    pub starter_name: String,
    #[serde(default)]
    pub starter_role: Role,
    pub winner_index: usize,
    /// Filled in by `finish_spin`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    pub started_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<i64>,
}

/// Vote stored at `votes/{clientId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub user_name: String,
    pub voted_for: String,
    #[serde(default)]
    pub timestamp: i64,
}

/// Per-voter line of a published result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteDetail {
    pub user_name: String,
    pub voted_for: String,
}

/// Round outcome stored at `final_results`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinalResults {
    #[serde(default)]
    pub mode: SpinTarget,
    /// Winner name, or every tied name joined with `", "`.
    pub winner: String,
    /// Names sharing the top count.
    #[serde(default)]
    pub winners: Vec<String>,
    #[serde(default)]
    pub tally: IndexMap<String, u32>,
    #[serde(default)]
    pub is_tie: bool,
    #[serde(default)]
    pub is_forced: bool,
    #[serde(default)]
    pub total_votes: usize,
    #[serde(default)]
    pub total_participants: usize,
    #[serde(default)]
    pub votes: Vec<VoteDetail>,
    #[serde(default)]
    pub finalized_at: i64,
}

/// Fully decoded room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub category: Category,
    pub phase: RoomPhase,
    pub participants: Vec<Participant>,
    pub menu_items: Vec<String>,
    pub spin_target: SpinTarget,
    pub spin_state: Option<SpinState>,
    pub votes: IndexMap<String, Vote>,
    pub final_results: Option<FinalResults>,
    pub presence: IndexMap<String, PresenceEntry>,
}

impl Room {
    /// An empty room, as seen before anybody wrote to it.
    pub fn empty(id: RoomId) -> Self {
        Self {
            id,
            category: Category::default(),
            phase: RoomPhase::default(),
            participants: Vec::new(),
            menu_items: Vec::new(),
            spin_target: SpinTarget::default(),
            spin_state: None,
            votes: IndexMap::new(),
            final_results: None,
            presence: IndexMap::new(),
        }
    }

    /// Decode a whole room document. Missing or malformed fields fall back to their defaults.
    pub fn from_document(id: RoomId, document: &Value) -> Self {
        let field = |field: RoomField| document.get(field.key()).unwrap_or(&NULL);

        Self {
            category: decode_scalar(field(RoomField::Category)).unwrap_or_default(),
            phase: decode_scalar(field(RoomField::Phase)).unwrap_or_default(),
            participants: normalize_list(field(RoomField::Participants)),
            menu_items: normalize_list(field(RoomField::MenuItems)),
            spin_target: decode_scalar(field(RoomField::SpinTarget)).unwrap_or_default(),
            spin_state: decode_scalar(field(RoomField::SpinState)),
            votes: normalize_keyed(field(RoomField::Votes)),
            final_results: decode_scalar(field(RoomField::FinalResults)),
            presence: normalize_keyed(field(RoomField::Presence)),
            id,
        }
    }

    /// Entries the wheel currently spins over, as `(label, weight)`.
    ///
    /// Menu entries all weigh the same.
    pub fn wheel_entries(&self) -> Vec<(String, u32)> {
        match self.spin_target {
            SpinTarget::People => self
                .participants
                .iter()
                .map(|p| (p.name.clone(), p.weight))
                .collect(),
            SpinTarget::Menu => self
                .menu_items
                .iter()
                .map(|item| (item.clone(), 1))
                .collect(),
        }
    }
}

/// Decode a scalar or object field; `null` and malformed values become `None`.
pub fn decode_scalar<T: DeserializeOwned>(value: &Value) -> Option<T> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value.clone()) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            warn!(error = %err, "dropping malformed room value");
            None
        }
    }
}

/// Decode an ordered list that may be stored as an array or as an index-keyed object.
///
/// Holes (`null`) and malformed entries are skipped. Object keys that parse as integers are
/// ordered numerically, everything else keeps its map order after them.
pub fn normalize_list<T: DeserializeOwned>(value: &Value) -> Vec<T> {
    match value {
        Value::Array(items) => items.iter().filter_map(decode_scalar).collect(),
        Value::Object(map) => {
            let mut entries: Vec<(Option<u64>, &Value)> = map
                .iter()
                .map(|(key, item)| (key.parse::<u64>().ok(), item))
                .collect();
            entries.sort_by_key(|(index, _)| index.unwrap_or(u64::MAX));
            entries
                .into_iter()
                .filter_map(|(_, item)| decode_scalar(item))
                .collect()
        }
        Value::Null => Vec::new(),
        other => {
            warn!(kind = %value_kind(other), "expected a list in room document");
            Vec::new()
        }
    }
}

/// Decode a keyed collection that may be stored as an object or as an array.
///
/// Arrays are keyed by their index.
pub fn normalize_keyed<T: DeserializeOwned>(value: &Value) -> IndexMap<String, T> {
    match value {
        Value::Object(map) => map
            .iter()
            .filter_map(|(key, item)| decode_scalar(item).map(|decoded| (key.clone(), decoded)))
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                decode_scalar(item).map(|decoded| (index.to_string(), decoded))
            })
            .collect(),
        Value::Null => IndexMap::new(),
        other => {
            warn!(kind = %value_kind(other), "expected a keyed map in room document");
            IndexMap::new()
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn room(document: Value) -> Room {
        Room::from_document(RoomId::parse("1234").unwrap(), &document)
    }

    #[test]
    fn empty_document_decodes_to_defaults() {
        let decoded = room(json!({}));
        assert_eq!(decoded, Room::empty(RoomId::parse("1234").unwrap()));
    }

    #[test]
    fn participants_accept_arrays_and_index_objects() {
        let from_array = room(json!({
            "participants": [{"name": "Alice", "weight": 60}, null, {"name": "Bob", "weight": 40}]
        }));
        let from_object = room(json!({
            "participants": {
                "10": {"name": "Carol", "weight": 0},
                "2": {"name": "Bob", "weight": 40},
                "0": {"name": "Alice", "weight": 60}
            }
        }));

        assert_eq!(
            from_array.participants,
            vec![Participant::new("Alice", 60), Participant::new("Bob", 40)]
        );
        let names: Vec<_> = from_object.participants.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Alice", "Bob", "Carol"]);
    }

    #[test]
    fn votes_accept_objects_and_arrays() {
        let keyed = room(json!({
            "votes": {"c1": {"userName": "A", "votedFor": "Pizza", "timestamp": 1}}
        }));
        assert_eq!(keyed.votes["c1"].voted_for, "Pizza");

        let listed = room(json!({
            "votes": [{"userName": "A", "votedFor": "Pizza"}, {"userName": "B", "votedFor": "Ramen"}]
        }));
        assert_eq!(listed.votes.len(), 2);
        assert_eq!(listed.votes["1"].user_name, "B");
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let decoded = room(json!({
            "participants": [{"name": "Alice", "weight": 100}, 42, "nope"],
            "phase": "exploded",
            "menu_items": "not a list"
        }));
        assert_eq!(decoded.participants.len(), 1);
        assert_eq!(decoded.phase, RoomPhase::Waiting);
        assert!(decoded.menu_items.is_empty());
    }

    #[test]
    fn unknown_category_decodes_as_custom() {
        let decoded = room(json!({"category": "fusion"}));
        assert_eq!(decoded.category, Category::Custom);
    }

    #[test]
    fn wheel_entries_follow_spin_target() {
        let decoded = room(json!({
            "spin_target": "menu",
            "participants": [{"name": "Alice", "weight": 100}],
            "menu_items": ["Pizza", "Ramen"]
        }));
        assert_eq!(
            decoded.wheel_entries(),
            vec![("Pizza".to_string(), 1), ("Ramen".to_string(), 1)]
        );
    }
}
