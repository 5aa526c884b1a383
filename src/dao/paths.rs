//! Room addressing: room codes and the paths below `rooms/{id}/`.

use std::{fmt, str::FromStr};

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shortest accepted room code.
pub const ROOM_CODE_MIN_LEN: usize = 4;
/// Longest accepted room code.
pub const ROOM_CODE_MAX_LEN: usize = 8;
/// Number of digits in a freshly generated room code.
const GENERATED_CODE_LEN: usize = 6;

/// Reasons a room code or path string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// Room code length or alphabet is invalid.
    #[error("invalid room code `{0}`")]
    InvalidRoomCode(String),
    /// First path segment does not name a room field.
    #[error("unknown room field `{0}`")]
    UnknownField(String),
    /// Field does not accept keyed children.
    #[error("room field `{0}` has no child entries")]
    NotKeyed(RoomField),
    /// Path has an empty segment or too many segments.
    #[error("malformed room path `{0}`")]
    Malformed(String),
}

/// Case-insensitive short room code, stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// Parse and normalize a user supplied room code.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let trimmed = raw.trim();
        let valid_len = (ROOM_CODE_MIN_LEN..=ROOM_CODE_MAX_LEN).contains(&trimmed.len());
        if !valid_len || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(PathError::InvalidRoomCode(raw.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Generate a random numeric room code.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..GENERATED_CODE_LEN)
            .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
            .collect();
        Self(code)
    }

    /// Borrow the normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomId {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RoomId {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomId> for String {
    fn from(value: RoomId) -> Self {
        value.0
    }
}

/// Top-level fields of a room document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomField {
    /// Connected clients keyed by client id.
    Presence,
    /// Menu category scalar.
    Category,
    /// Round phase scalar.
    Phase,
    /// Weighted roster.
    Participants,
    /// Menu entries.
    MenuItems,
    /// Which list the wheel spins over.
    SpinTarget,
    /// Current spin announcement.
    SpinState,
    /// Votes keyed by client id.
    Votes,
    /// Published round outcome.
    FinalResults,
}

impl RoomField {
    /// Every field, in document order.
    pub const ALL: [RoomField; 9] = [
        RoomField::Presence,
        RoomField::Category,
        RoomField::Phase,
        RoomField::Participants,
        RoomField::MenuItems,
        RoomField::SpinTarget,
        RoomField::SpinState,
        RoomField::Votes,
        RoomField::FinalResults,
    ];

    /// Key used for this field inside the room document.
    pub fn key(self) -> &'static str {
        match self {
            RoomField::Presence => "presence",
            RoomField::Category => "category",
            RoomField::Phase => "phase",
            RoomField::Participants => "participants",
            RoomField::MenuItems => "menu_items",
            RoomField::SpinTarget => "spin_target",
            RoomField::SpinState => "spin_state",
            RoomField::Votes => "votes",
            RoomField::FinalResults => "final_results",
        }
    }

    /// Whether the field holds a map of per-client children.
    pub fn is_keyed(self) -> bool {
        matches!(self, RoomField::Presence | RoomField::Votes)
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }
}

impl fmt::Display for RoomField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Location of a value inside a room: a whole field or one keyed child.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomPath {
    field: RoomField,
    child: Option<String>,
}

impl RoomPath {
    /// Path addressing a whole field.
    pub fn field(field: RoomField) -> Self {
        Self { field, child: None }
    }

    /// Path addressing one child of a keyed field (`presence/{id}`, `votes/{id}`).
    pub fn child(field: RoomField, key: impl Into<String>) -> Result<Self, PathError> {
        if !field.is_keyed() {
            return Err(PathError::NotKeyed(field));
        }
        let key = key.into();
        if key.is_empty() || key.contains('/') {
            return Err(PathError::Malformed(format!("{field}/{key}")));
        }
        Ok(Self {
            field,
            child: Some(key),
        })
    }

    /// Field this path lives under.
    pub fn room_field(&self) -> RoomField {
        self.field
    }

    /// Child key, when the path addresses a keyed entry.
    pub fn child_key(&self) -> Option<&str> {
        self.child.as_deref()
    }

    /// Whether a change at `other` is visible at `self` (same field, and same child or a parent).
    pub fn covers(&self, other: &RoomPath) -> bool {
        self.field == other.field
            && match (&self.child, &other.child) {
                (None, _) => true,
                (Some(_), None) => true,
                (Some(mine), Some(theirs)) => mine == theirs,
            }
    }

    /// Parse `field` or `field/child`.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let raw = raw.trim_matches('/');
        let mut segments = raw.split('/');
        let head = segments
            .next()
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| PathError::Malformed(raw.to_string()))?;
        let field = RoomField::from_key(head).ok_or_else(|| PathError::UnknownField(head.into()))?;

        match (segments.next(), segments.next()) {
            (None, _) => Ok(Self::field(field)),
            (Some(child), None) => Self::child(field, child),
            _ => Err(PathError::Malformed(raw.to_string())),
        }
    }
}

impl fmt::Display for RoomPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.child {
            Some(child) => write!(f, "{}/{}", self.field, child),
            None => write!(f, "{}", self.field),
        }
    }
}

impl From<RoomField> for RoomPath {
    fn from(value: RoomField) -> Self {
        Self::field(value)
    }
}

impl TryFrom<String> for RoomPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomPath> for String {
    fn from(value: RoomPath) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn room_codes_are_case_insensitive() {
        let lower = RoomId::parse("ab12").unwrap();
        let upper = RoomId::parse(" AB12 ").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.as_str(), "AB12");
    }

    #[test]
    fn room_codes_reject_bad_input() {
        assert!(RoomId::parse("abc").is_err());
        assert!(RoomId::parse("123456789").is_err());
        assert!(RoomId::parse("12-34").is_err());
        assert!(RoomId::parse("").is_err());
    }

    #[test]
    fn generated_codes_are_numeric() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..32 {
            let id = RoomId::generate(&mut rng);
            assert_eq!(id.as_str().len(), 6);
            assert!(id.as_str().chars().all(|c| c.is_ascii_digit()));
            assert_eq!(RoomId::parse(id.as_str()).unwrap(), id);
        }
    }

    #[test]
    fn paths_parse_fields_and_children() {
        assert_eq!(
            RoomPath::parse("menu_items").unwrap(),
            RoomPath::field(RoomField::MenuItems)
        );
        let vote = RoomPath::parse("/votes/abc/").unwrap();
        assert_eq!(vote.room_field(), RoomField::Votes);
        assert_eq!(vote.child_key(), Some("abc"));
        assert_eq!(vote.to_string(), "votes/abc");
    }

    #[test]
    fn paths_reject_children_on_scalar_fields() {
        assert_eq!(
            RoomPath::parse("phase/x").unwrap_err(),
            PathError::NotKeyed(RoomField::Phase)
        );
        assert!(matches!(
            RoomPath::parse("nope").unwrap_err(),
            PathError::UnknownField(_)
        ));
        assert!(matches!(
            RoomPath::parse("votes/a/b").unwrap_err(),
            PathError::Malformed(_)
        ));
    }

    #[test]
    fn parent_paths_cover_children() {
        let votes = RoomPath::field(RoomField::Votes);
        let mine = RoomPath::child(RoomField::Votes, "me").unwrap();
        let theirs = RoomPath::child(RoomField::Votes, "them").unwrap();
        assert!(votes.covers(&mine));
        assert!(mine.covers(&votes));
        assert!(!mine.covers(&theirs));
        assert!(!votes.covers(&RoomPath::field(RoomField::Phase)));
    }
}
