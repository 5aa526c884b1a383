use axum::{
    Router,
    extract::{Path, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};

use crate::{
    dao::paths::RoomId, error::AppError, services::websocket_service, state::SharedState,
};

#[utoipa::path(
    get,
    path = "/rooms/{id}/ws",
    tag = "clients",
    params(("id" = String, Path, description = "Room code")),
    responses(
        (status = 101, description = "Switching protocols to WebSocket"),
        (status = 400, description = "Invalid room code")
    )
)]
/// Upgrade the HTTP connection into a room client session. The first message must be `join`.
pub async fn ws_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let room = RoomId::parse(&id)?;
    Ok(ws.on_upgrade(move |socket| websocket_service::handle_socket(state, room, socket)))
}

/// Configure the WebSocket endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/rooms/{id}/ws", get(ws_handler))
}
