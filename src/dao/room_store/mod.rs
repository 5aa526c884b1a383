//! Room state storage: path-addressed JSON documents with change fan-out and disconnect hooks.

pub mod memory;

use std::fmt;

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::dao::{
    models::RoomPhase,
    paths::{RoomId, RoomPath},
    storage::StorageResult,
};

pub use self::memory::MemoryRoomStore;

/// Notification emitted for every write or removal inside a room.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomChange {
    pub room: RoomId,
    pub path: RoomPath,
    /// New value, `None` when the path was removed.
    pub value: Option<Value>,
}

/// Light listing entry for a stored room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    pub id: RoomId,
    pub phase: RoomPhase,
    pub participants: usize,
    pub connected: usize,
    /// Last write, in milliseconds since the epoch.
    pub updated_at: i64,
}

/// Removes a value from the store when dropped, the way a hosted realtime database cleans up
/// after a client whose connection went away.
#[must_use = "dropping the guard immediately runs the disconnect hook"]
pub struct DisconnectGuard {
    on_drop: Option<Box<dyn FnOnce() + Send>>,
}

impl DisconnectGuard {
    /// Wrap the cleanup to run once the guard goes away.
    pub fn new(on_drop: impl FnOnce() + Send + 'static) -> Self {
        Self {
            on_drop: Some(Box::new(on_drop)),
        }
    }

    /// Cancel the hook without running it.
    pub fn disarm(mut self) {
        self.on_drop.take();
    }
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        if let Some(on_drop) = self.on_drop.take() {
            on_drop();
        }
    }
}

impl fmt::Debug for DisconnectGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisconnectGuard")
            .field("armed", &self.on_drop.is_some())
            .finish()
    }
}

/// Abstraction over the realtime room store.
///
/// Every write is a blind overwrite of its target path; there are no transactions and the
/// last writer wins. Writing `null` is the same as removing the path.
pub trait RoomStore: Send + Sync {
    fn get(&self, room: &RoomId, path: &RoomPath) -> BoxFuture<'static, StorageResult<Option<Value>>>;
    fn set(&self, room: &RoomId, path: &RoomPath, value: Value) -> BoxFuture<'static, StorageResult<()>>;
    fn remove(&self, room: &RoomId, path: &RoomPath) -> BoxFuture<'static, StorageResult<()>>;
    /// Whole room document, `None` when nothing was ever written.
    fn snapshot(&self, room: &RoomId) -> BoxFuture<'static, StorageResult<Option<Value>>>;
    /// Receive every subsequent change in the room.
    fn subscribe(&self, room: &RoomId) -> BoxFuture<'static, StorageResult<broadcast::Receiver<RoomChange>>>;
    /// Arrange for `path` to be removed when the returned guard is dropped.
    fn on_disconnect_remove(
        &self,
        room: &RoomId,
        path: &RoomPath,
    ) -> BoxFuture<'static, StorageResult<DisconnectGuard>>;
    /// Out-of-band removal of a whole room. Returns whether it existed.
    fn delete_room(&self, room: &RoomId) -> BoxFuture<'static, StorageResult<bool>>;
    fn list_rooms(&self) -> BoxFuture<'static, StorageResult<Vec<RoomSummary>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
