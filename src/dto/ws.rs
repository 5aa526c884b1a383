use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{Category, FinalResults, Participant, Role, RoomPhase, SpinTarget},
    dto::{
        room::{RoomChangeEvent, RoomSnapshot},
        validation::validate_client_id,
    },
};

/// First message a room WebSocket client must send.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, Validate)]
pub struct JoinRequest {
    #[validate(custom(function = "validate_client_id"))]
    pub client_id: String,
    #[validate(length(min = 1, max = 40))]
    pub name: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Messages accepted from room WebSocket clients. Each mirrors a room client operation.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomInboundMessage {
    Join(JoinRequest),
    SetRoster { participants: Vec<Participant> },
    SetMenu { items: Vec<String> },
    SetCategory { category: Category },
    SetSpinTarget { target: SpinTarget },
    SetPhase { phase: RoomPhase },
    StartSpin { winner_index: usize },
    FinishSpin { winner: String },
    SubmitVote { voted_for: String },
    RemoveVote,
    FinalizeGame { results: FinalResults },
    ClearFinalResults,
    ResetRound,
    /// Refresh the presence record.
    Touch,
    #[serde(other)]
    Unknown,
}

/// Failure to turn a text frame into a [`RoomInboundMessage`].
#[derive(Debug, thiserror::Error)]
pub enum InboundError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid join: {0}")]
    Invalid(#[from] ValidationErrors),
}

impl RoomInboundMessage {
    /// Parse a text frame, validating the join payload when present.
    pub fn from_json_str(text: &str) -> Result<Self, InboundError> {
        let message: Self = serde_json::from_str(text)?;
        if let Self::Join(join) = &message {
            join.validate()?;
        }
        Ok(message)
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Messages pushed to room WebSocket clients.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomOutboundMessage {
    /// Acknowledges the join; sent once.
    Joined { room_id: String, client_id: String },
    /// Whole room, sent right after the join.
    Snapshot { room: RoomSnapshot },
    /// A single path changed.
    Change(RoomChangeEvent),
    /// A message could not be applied.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_is_parsed_and_validated() {
        let message = RoomInboundMessage::from_json_str(
            r#"{"type":"join","client_id":"abc123","name":"Alice","role":"owner"}"#,
        )
        .unwrap();
        match message {
            RoomInboundMessage::Join(join) => {
                assert_eq!(join.client_id, "abc123");
                assert_eq!(join.role, Role::Owner);
            }
            other => panic!("unexpected message {other:?}"),
        }

        let err = RoomInboundMessage::from_json_str(
            r#"{"type":"join","client_id":"a/b","name":"Alice"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, InboundError::Invalid(_)));
    }

    #[test]
    fn intents_and_unknown_types_parse() {
        let vote =
            RoomInboundMessage::from_json_str(r#"{"type":"submit_vote","voted_for":"Ramen"}"#)
                .unwrap();
        assert!(matches!(vote, RoomInboundMessage::SubmitVote { voted_for } if voted_for == "Ramen"));

        let reset = RoomInboundMessage::from_json_str(r#"{"type":"reset_round"}"#).unwrap();
        assert!(matches!(reset, RoomInboundMessage::ResetRound));

        let unknown = RoomInboundMessage::from_json_str(r#"{"type":"dance"}"#).unwrap();
        assert!(matches!(unknown, RoomInboundMessage::Unknown));
    }

    #[test]
    fn change_messages_are_flattened() {
        let message = RoomOutboundMessage::Change(RoomChangeEvent {
            path: "phase".into(),
            value: Some(serde_json::json!("spinning")),
        });
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "change", "path": "phase", "value": "spinning"})
        );
    }
}
