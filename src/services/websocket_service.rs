use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    dao::{paths::RoomId, room_store::RoomChange},
    dto::{
        room::RoomSnapshot,
        ws::{JoinRequest, RoomInboundMessage, RoomOutboundMessage},
    },
    state::{JOIN_TIMEOUT, SharedState},
    sync::{ClientIdentity, SyncClient},
};

/// Reasons a WebSocket session ends before or while forwarding.
#[derive(Debug, Error)]
enum SessionError {
    /// Writer channel closed - connection should be terminated immediately.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Handle the full lifecycle of one room WebSocket connection.
///
/// The first text frame must be a `join`; the client then gets a snapshot followed by every
/// change in the room, and its presence record is removed when the socket goes away.
pub async fn handle_socket(state: SharedState, room: RoomId, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let initial_message = match tokio::time::timeout(JOIN_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(room = %room, error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!(room = %room, "websocket join timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let join = match RoomInboundMessage::from_json_str(&initial_message) {
        Ok(RoomInboundMessage::Join(join)) => join,
        Ok(_) => {
            warn!(room = %room, "first message was not join");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Err(err) => {
            warn!(room = %room, error = %err, "failed to parse or validate join message");
            let _ = send_message(&outbound_tx, &RoomOutboundMessage::Error {
                message: err.to_string(),
            });
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    // Subscribe before the snapshot so nothing written in between is lost.
    let changes = match state.store().subscribe(&room).await {
        Ok(changes) => changes,
        Err(err) => {
            warn!(room = %room, error = %err, "failed to subscribe to room");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let client = join_room(&state, room.clone(), join).await;
    let client_id = client.identity().client_id.clone();

    let greeting = send_message(&outbound_tx, &RoomOutboundMessage::Joined {
        room_id: room.to_string(),
        client_id: client_id.clone(),
    })
    .and(send_snapshot(&client, &outbound_tx).await);
    if greeting.is_err() {
        info!(room = %room, client_id = %client_id, "connection closed during join, terminating");
        client.leave();
        finalize(writer_task, outbound_tx).await;
        return;
    }

    let forwarder = spawn_forwarder(client.clone(), changes, outbound_tx.clone());

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(room = %room, client_id = %client_id, payload = %text, "received room message");
                match RoomInboundMessage::from_json_str(&text) {
                    Ok(message) => {
                        if let Err(reason) = apply_intent(&client, message).await {
                            warn!(room = %room, client_id = %client_id, reason, "ignored room message");
                            if send_message(&outbound_tx, &RoomOutboundMessage::Error {
                                message: reason.to_string(),
                            })
                            .is_err()
                            {
                                break;
                            }
                        }
                    }
                    Err(err) => {
                        warn!(room = %room, client_id = %client_id, error = %err, "failed to parse room message");
                        if send_message(&outbound_tx, &RoomOutboundMessage::Error {
                            message: err.to_string(),
                        })
                        .is_err()
                        {
                            break;
                        }
                    }
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(room = %room, client_id = %client_id, "client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(room = %room, client_id = %client_id, error = %err, "websocket error");
                break;
            }
        }
    }

    forwarder.abort();
    client.leave();
    info!(room = %room, client_id = %client_id, "client disconnected");

    finalize(writer_task, outbound_tx).await;
}

async fn join_room(state: &SharedState, room: RoomId, join: JoinRequest) -> SyncClient {
    SyncClient::join(
        state.store(),
        ClientIdentity::from_id(join.client_id),
        join.name,
        room,
        join.role,
    )
    .await
}

/// Apply one inbound intent through the room client. Returns a reason when it was ignored.
async fn apply_intent(client: &SyncClient, message: RoomInboundMessage) -> Result<(), &'static str> {
    match message {
        RoomInboundMessage::Join(_) => return Err("already joined"),
        RoomInboundMessage::SetRoster { participants } => client.set_roster(&participants).await,
        RoomInboundMessage::SetMenu { items } => client.set_menu(&items).await,
        RoomInboundMessage::SetCategory { category } => client.set_category(category).await,
        RoomInboundMessage::SetSpinTarget { target } => client.set_spin_target(target).await,
        RoomInboundMessage::SetPhase { phase } => client.set_phase(phase).await,
        RoomInboundMessage::StartSpin { winner_index } => {
            client
                .start_spin(client.display_name(), winner_index, client.role())
                .await
        }
        RoomInboundMessage::FinishSpin { winner } => client.finish_spin(&winner).await,
        RoomInboundMessage::SubmitVote { voted_for } => client.submit_vote(&voted_for).await,
        RoomInboundMessage::RemoveVote => client.remove_vote().await,
        RoomInboundMessage::FinalizeGame { results } => client.finalize_game(&results).await,
        RoomInboundMessage::ClearFinalResults => client.clear_final_results().await,
        RoomInboundMessage::ResetRound => client.reset_round().await,
        RoomInboundMessage::Touch => client.touch().await,
        RoomInboundMessage::Unknown => return Err("unknown message type"),
    }
    Ok(())
}

/// Forward room changes to the socket. A lagging socket gets a fresh snapshot instead of the
/// changes it missed; a deleted room closes the socket.
fn spawn_forwarder(
    client: SyncClient,
    mut changes: tokio::sync::broadcast::Receiver<RoomChange>,
    outbound_tx: mpsc::UnboundedSender<Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let sent = match changes.recv().await {
                Ok(change) => send_message(&outbound_tx, &RoomOutboundMessage::Change(change.into())),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(room = %client.room(), skipped, "websocket subscriber lagged, resyncing");
                    send_snapshot(&client, &outbound_tx).await
                }
                Err(RecvError::Closed) => {
                    info!(room = %client.room(), "room closed, disconnecting client");
                    let _ = outbound_tx.send(Message::Close(None));
                    break;
                }
            };
            if sent.is_err() {
                break;
            }
        }
    })
}

async fn send_snapshot(
    client: &SyncClient,
    tx: &mpsc::UnboundedSender<Message>,
) -> Result<(), SessionError> {
    let room = RoomSnapshot::from(client.snapshot().await);
    send_message(tx, &RoomOutboundMessage::Snapshot { room })
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Serialization failures are logged and swallowed; only a closed writer is an error.
fn send_message<T>(tx: &mpsc::UnboundedSender<Message>, value: &T) -> Result<(), SessionError>
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{value:?}`");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| SessionError::ConnectionClosed)
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
