use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{error::AppError, services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/rooms/{id}/events",
    tag = "sse",
    params(("id" = String, Path, description = "Room code")),
    responses((status = 200, description = "Room change stream (`event: change`)", content_type = "text/event-stream", body = String))
)]
/// Stream every change in a room to the caller.
pub async fn room_stream(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let (room, receiver) = sse_service::subscribe_room(&state, &id).await?;
    info!(room = %room, "new room SSE connection");
    Ok(sse_service::to_sse_stream(room, receiver))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/rooms/{id}/events", get(room_stream))
}
