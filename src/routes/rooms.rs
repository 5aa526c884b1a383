use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde_json::Value;

use crate::{
    dto::room::{CreateRoomResponse, RoomSnapshot, RoomsResponse},
    error::AppError,
    services::room_service,
    state::SharedState,
};

/// Room allocation, inspection and raw path access.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms", get(list_rooms).post(create_room))
        .route("/rooms/{id}", get(get_room).delete(delete_room))
        .route(
            "/rooms/{id}/data/{*path}",
            get(read_path).put(write_path).delete(delete_path),
        )
}

/// Allocate an unused room code.
#[utoipa::path(
    post,
    path = "/rooms",
    tag = "rooms",
    responses((status = 200, description = "Fresh room code", body = CreateRoomResponse))
)]
pub async fn create_room(
    State(state): State<SharedState>,
) -> Result<Json<CreateRoomResponse>, AppError> {
    Ok(Json(room_service::create_room(&state).await?))
}

/// List every room held by the store.
#[utoipa::path(
    get,
    path = "/rooms",
    tag = "rooms",
    responses((status = 200, description = "Room summaries", body = RoomsResponse))
)]
pub async fn list_rooms(State(state): State<SharedState>) -> Result<Json<RoomsResponse>, AppError> {
    Ok(Json(room_service::list_rooms(&state).await?))
}

/// Normalized snapshot of one room.
#[utoipa::path(
    get,
    path = "/rooms/{id}",
    tag = "rooms",
    params(("id" = String, Path, description = "Room code")),
    responses(
        (status = 200, description = "Room snapshot", body = RoomSnapshot),
        (status = 404, description = "Room never written")
    )
)]
pub async fn get_room(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<RoomSnapshot>, AppError> {
    Ok(Json(room_service::get_room(&state, &id).await?))
}

/// Remove a room and disconnect its subscribers.
#[utoipa::path(
    delete,
    path = "/rooms/{id}",
    tag = "rooms",
    params(("id" = String, Path, description = "Room code")),
    responses(
        (status = 204, description = "Room removed"),
        (status = 404, description = "Room not found")
    )
)]
pub async fn delete_room(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    room_service::delete_room(&state, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Read the raw JSON value at a room path such as `phase` or `votes/{clientId}`.
#[utoipa::path(
    get,
    path = "/rooms/{id}/data/{path}",
    tag = "rooms",
    params(
        ("id" = String, Path, description = "Room code"),
        ("path" = String, Path, description = "Field or field/child")
    ),
    responses(
        (status = 200, description = "Stored value", body = serde_json::Value),
        (status = 404, description = "Nothing stored at this path")
    )
)]
pub async fn read_path(
    State(state): State<SharedState>,
    Path((id, path)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(room_service::read_path(&state, &id, &path).await?))
}

/// Overwrite the value at a room path. Writing `null` removes it.
#[utoipa::path(
    put,
    path = "/rooms/{id}/data/{path}",
    tag = "rooms",
    params(
        ("id" = String, Path, description = "Room code"),
        ("path" = String, Path, description = "Field or field/child")
    ),
    request_body = serde_json::Value,
    responses((status = 204, description = "Value written"))
)]
pub async fn write_path(
    State(state): State<SharedState>,
    Path((id, path)): Path<(String, String)>,
    Json(value): Json<Value>,
) -> Result<StatusCode, AppError> {
    room_service::write_path(&state, &id, &path, value).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove the value at a room path.
#[utoipa::path(
    delete,
    path = "/rooms/{id}/data/{path}",
    tag = "rooms",
    params(
        ("id" = String, Path, description = "Room code"),
        ("path" = String, Path, description = "Field or field/child")
    ),
    responses((status = 204, description = "Value removed"))
)]
pub async fn delete_path(
    State(state): State<SharedState>,
    Path((id, path)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    room_service::delete_path(&state, &id, &path).await?;
    Ok(StatusCode::NO_CONTENT)
}
