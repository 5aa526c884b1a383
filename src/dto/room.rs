use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::{
    dao::{
        models::{
            Category, FinalResults, Participant, PresenceEntry, Room, RoomPhase, SpinState,
            SpinTarget, Vote,
        },
        room_store::{RoomChange, RoomSummary},
    },
    dto::format_millis,
};

/// Response returned when a fresh room code is allocated.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateRoomResponse {
    pub room_id: String,
}

/// Listing entry for a stored room.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomSummaryResponse {
    pub id: String,
    pub phase: RoomPhase,
    pub participants: usize,
    /// Clients with a presence record.
    pub connected: usize,
    /// RFC 3339 time of the last write.
    pub updated_at: String,
}

impl From<RoomSummary> for RoomSummaryResponse {
    fn from(value: RoomSummary) -> Self {
        Self {
            id: value.id.to_string(),
            phase: value.phase,
            participants: value.participants,
            connected: value.connected,
            updated_at: format_millis(value.updated_at),
        }
    }
}

/// Response listing every room held by the store.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomsResponse {
    pub rooms: Vec<RoomSummaryResponse>,
}

/// Normalized view of a room document.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomSnapshot {
    pub id: String,
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

impl From<Room> for RoomSnapshot {
    fn from(value: Room) -> Self {
        Self {
            id: value.id.to_string(),
            category: value.category,
            phase: value.phase,
            participants: value.participants,
            menu_items: value.menu_items,
            spin_target: value.spin_target,
            spin_state: value.spin_state,
            votes: value.votes,
            final_results: value.final_results,
            presence: value.presence,
        }
    }
}

/// One write or removal inside a room, as pushed over SSE and WebSocket.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomChangeEvent {
    /// Path below the room, e.g. `votes/{clientId}`.
    pub path: String,
    /// New value, `null` when the path was removed.
    #[schema(value_type = Option<Object>)]
    pub value: Option<Value>,
}

impl From<RoomChange> for RoomChangeEvent {
    fn from(value: RoomChange) -> Self {
        Self {
            path: value.path.to_string(),
            value: value.value,
        }
    }
}
