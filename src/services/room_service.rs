use serde_json::Value;
use tracing::info;

use crate::{
    dao::{
        models::Room,
        paths::{RoomId, RoomPath},
    },
    dto::room::{CreateRoomResponse, RoomSnapshot, RoomsResponse},
    error::ServiceError,
    state::SharedState,
};

/// Attempts at finding an unused code before giving up.
const ROOM_CODE_ATTEMPTS: usize = 32;

/// Allocate a room code nobody is using yet. The room itself appears on its first write.
pub async fn create_room(state: &SharedState) -> Result<CreateRoomResponse, ServiceError> {
    let store = state.store();
    for _ in 0..ROOM_CODE_ATTEMPTS {
        let candidate = RoomId::generate(&mut rand::rng());
        if store.snapshot(&candidate).await?.is_none() {
            info!(room = %candidate, "allocated room code");
            return Ok(CreateRoomResponse {
                room_id: candidate.to_string(),
            });
        }
    }
    Err(ServiceError::InvalidState("no free room code available".into()))
}

pub async fn list_rooms(state: &SharedState) -> Result<RoomsResponse, ServiceError> {
    let rooms = state.store().list_rooms().await?;
    Ok(RoomsResponse {
        rooms: rooms.into_iter().map(Into::into).collect(),
    })
}

/// Decoded room, `NotFound` when nothing was ever written to it.
pub async fn get_room(state: &SharedState, raw_id: &str) -> Result<RoomSnapshot, ServiceError> {
    let id = RoomId::parse(raw_id)?;
    let document = state
        .store()
        .snapshot(&id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("room `{id}` not found")))?;
    Ok(Room::from_document(id, &document).into())
}

/// Out-of-band removal. Connected clients see every field disappear.
pub async fn delete_room(state: &SharedState, raw_id: &str) -> Result<(), ServiceError> {
    let id = RoomId::parse(raw_id)?;
    if state.store().delete_room(&id).await? {
        Ok(())
    } else {
        Err(ServiceError::NotFound(format!("room `{id}` not found")))
    }
}

/// Raw value at `path`, `NotFound` when absent.
pub async fn read_path(
    state: &SharedState,
    raw_id: &str,
    raw_path: &str,
) -> Result<Value, ServiceError> {
    let (id, path) = parse_location(raw_id, raw_path)?;
    state
        .store()
        .get(&id, &path)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("`{path}` not set in room `{id}`")))
}

/// Blind overwrite of `path`; `null` removes it.
pub async fn write_path(
    state: &SharedState,
    raw_id: &str,
    raw_path: &str,
    value: Value,
) -> Result<(), ServiceError> {
    let (id, path) = parse_location(raw_id, raw_path)?;
    state.store().set(&id, &path, value).await?;
    Ok(())
}

pub async fn delete_path(
    state: &SharedState,
    raw_id: &str,
    raw_path: &str,
) -> Result<(), ServiceError> {
    let (id, path) = parse_location(raw_id, raw_path)?;
    state.store().remove(&id, &path).await?;
    Ok(())
}

fn parse_location(raw_id: &str, raw_path: &str) -> Result<(RoomId, RoomPath), ServiceError> {
    Ok((RoomId::parse(raw_id)?, RoomPath::parse(raw_path)?))
}
