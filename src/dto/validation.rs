//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::dao::paths::{ROOM_CODE_MAX_LEN, ROOM_CODE_MIN_LEN, RoomId};

/// Longest accepted client identifier.
const CLIENT_ID_MAX_LEN: usize = 64;

/// Validates that a room code is 4 to 8 ASCII alphanumeric characters.
///
/// # Examples
///
/// ```ignore
/// validate_room_code("ab12cd") // Ok
/// validate_room_code("ab1")    // Err - too short
/// validate_room_code("ab-12")  // Err - punctuation
/// ```
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    if RoomId::parse(code).is_ok() {
        return Ok(());
    }
    let mut err = ValidationError::new("room_code");
    err.message = Some(
        format!(
            "Room code must be {ROOM_CODE_MIN_LEN} to {ROOM_CODE_MAX_LEN} letters or digits (got `{code}`)"
        )
        .into(),
    );
    Err(err)
}

/// Validates a client identifier usable as a child key under `presence/` and `votes/`.
pub fn validate_client_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > CLIENT_ID_MAX_LEN {
        let mut err = ValidationError::new("client_id_length");
        err.message = Some(
            format!(
                "Client ID must be 1 to {CLIENT_ID_MAX_LEN} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        let mut err = ValidationError::new("client_id_format");
        err.message = Some("Client ID may only contain letters, digits, `-` and `_`".into());
        return Err(err);
    }

    Ok(())
}
