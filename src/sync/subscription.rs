use std::sync::Arc;

use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tracing::{debug, warn};

use crate::dao::{
    paths::{RoomId, RoomPath},
    room_store::RoomStore,
};

/// Live subscription delivering values to a callback. Dropping it stops delivery.
#[must_use = "the subscription stops as soon as it is dropped"]
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    /// Drive `stream` on a background task, invoking `callback` for every item.
    pub(crate) fn spawn<S, T, F>(stream: S, mut callback: F) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
        T: Send + 'static,
        F: FnMut(T) + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::pin!(stream);
            while let Some(item) = stream.next().await {
                callback(item);
            }
        });
        Self { task }
    }

    /// Whether the delivery task ended (room removed or store gone).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Stream the decoded value at `path`: the current value first, then one item per change
/// touching the path (including changes to its children).
pub(crate) fn watch_path<T, F>(
    store: Arc<dyn RoomStore>,
    room: RoomId,
    path: RoomPath,
    decode: F,
) -> impl Stream<Item = T> + Send + 'static
where
    T: Send + 'static,
    F: Fn(&Value) -> T + Send + 'static,
{
    async_stream::stream! {
        // Subscribe before reading so nothing slips between the read and the first change.
        match store.subscribe(&room).await {
            Err(err) => warn!(room = %room, path = %path, error = %err, "subscribe failed"),
            Ok(mut changes) => {
                let current = read_or_null(store.as_ref(), &room, &path).await;
                yield decode(&current);

                loop {
                    match changes.recv().await {
                        Ok(change) if change.path == path => {
                            yield decode(&change.value.unwrap_or(Value::Null));
                        }
                        Ok(change) if path.covers(&change.path) => {
                            let current = read_or_null(store.as_ref(), &room, &path).await;
                            yield decode(&current);
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(room = %room, path = %path, skipped, "subscriber lagged; re-reading");
                            let current = read_or_null(store.as_ref(), &room, &path).await;
                            yield decode(&current);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        }
    }
}

async fn read_or_null(store: &dyn RoomStore, room: &RoomId, path: &RoomPath) -> Value {
    match store.get(room, path).await {
        Ok(value) => value.unwrap_or(Value::Null),
        Err(err) => {
            warn!(room = %room, path = %path, error = %err, "read failed");
            Value::Null
        }
    }
}
