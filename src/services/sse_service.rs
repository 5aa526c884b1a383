use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::{
    dao::{paths::RoomId, room_store::RoomChange},
    dto::room::RoomChangeEvent,
    error::ServiceError,
    state::SharedState,
};

/// SSE event name carried by every room change.
const CHANGE_EVENT: &str = "change";

/// Subscribe to every change in a room.
pub async fn subscribe_room(
    state: &SharedState,
    raw_id: &str,
) -> Result<(RoomId, broadcast::Receiver<RoomChange>), ServiceError> {
    let id = RoomId::parse(raw_id)?;
    let receiver = state.store().subscribe(&id).await?;
    Ok((id, receiver))
}

/// Convert a room change receiver into an SSE response, forwarding changes until the client
/// disconnects or the room is dropped.
pub fn to_sse_stream(
    room: RoomId,
    mut receiver: broadcast::Receiver<RoomChange>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(change) => {
                            let Some(event) = change_event(change) else {
                                continue;
                            };
                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // Skip lagged messages but keep the stream alive.
                            debug!(room = %room, skipped, "SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }

        info!(room = %room, "room SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn change_event(change: RoomChange) -> Option<Event> {
    let payload = RoomChangeEvent::from(change);
    match Event::default().event(CHANGE_EVENT).json_data(&payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, path = %payload.path, "failed to encode room change");
            None
        }
    }
}
