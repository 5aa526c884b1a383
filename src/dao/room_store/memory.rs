use std::sync::{Arc, Weak};

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::dao::{
    models::{PresenceEntry, RoomPhase, decode_scalar, normalize_keyed, normalize_list, now_millis},
    paths::{RoomField, RoomId, RoomPath},
    room_store::{DisconnectGuard, RoomChange, RoomStore, RoomSummary},
    storage::{StorageError, StorageResult},
};

/// Default broadcast capacity per room.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// In-process room store backed by a [`DashMap`] of JSON documents.
///
/// Cloning is cheap and every clone addresses the same rooms.
#[derive(Clone)]
pub struct MemoryRoomStore {
    inner: Arc<Inner>,
}

struct Inner {
    rooms: DashMap<RoomId, RoomCell>,
    event_capacity: usize,
}

struct RoomCell {
    document: Map<String, Value>,
    changes: broadcast::Sender<RoomChange>,
    updated_at: i64,
}

impl RoomCell {
    fn new(capacity: usize) -> Self {
        let (changes, _receiver) = broadcast::channel(capacity);
        Self {
            document: Map::new(),
            changes,
            updated_at: now_millis(),
        }
    }

    /// Nothing stored and nobody listening: the cell can go.
    fn is_idle(&self) -> bool {
        self.document.is_empty() && self.changes.receiver_count() == 0
    }

    fn emit(&self, room: &RoomId, path: &RoomPath, value: Option<Value>) {
        // No receivers is not an error: nobody is watching this room right now.
        let _ = self.changes.send(RoomChange {
            room: room.clone(),
            path: path.clone(),
            value,
        });
    }
}

impl Default for MemoryRoomStore {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl MemoryRoomStore {
    /// Create an empty store whose per-room change channels hold `event_capacity` messages.
    pub fn new(event_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                rooms: DashMap::new(),
                event_capacity: event_capacity.max(1),
            }),
        }
    }

    /// Number of rooms holding at least one value.
    pub fn room_count(&self) -> usize {
        self.inner
            .rooms
            .iter()
            .filter(|entry| !entry.value().document.is_empty())
            .count()
    }
}

impl Inner {
    /// Whole document, `None` while nothing is stored in the room.
    fn document(&self, room: &RoomId) -> Option<Value> {
        let cell = self.rooms.get(room)?;
        if cell.document.is_empty() {
            return None;
        }
        Some(Value::Object(cell.document.clone()))
    }

    fn read(&self, room: &RoomId, path: &RoomPath) -> Option<Value> {
        let cell = self.rooms.get(room)?;
        let value = cell.document.get(path.room_field().key())?;
        match path.child_key() {
            None => Some(value.clone()),
            Some(key) => value.get(key).cloned(),
        }
    }

    fn write(&self, room: &RoomId, path: &RoomPath, value: Value) -> StorageResult<()> {
        if value.is_null() {
            self.delete(room, path);
            return Ok(());
        }

        let mut cell = self
            .rooms
            .entry(room.clone())
            .or_insert_with(|| RoomCell::new(self.event_capacity));
        let key = path.room_field().key();

        match path.child_key() {
            None => {
                cell.document.insert(key.to_string(), value.clone());
            }
            Some(child) => {
                let parent = cell
                    .document
                    .entry(key.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if parent.is_null() {
                    *parent = Value::Object(Map::new());
                }
                let Some(children) = parent.as_object_mut() else {
                    return Err(StorageError::NotAnObject { path: path.clone() });
                };
                children.insert(child.to_string(), value.clone());
            }
        }

        cell.updated_at = now_millis();
        cell.emit(room, path, Some(value));
        Ok(())
    }

    /// Remove a path, returning whether anything was there.
    fn delete(&self, room: &RoomId, path: &RoomPath) -> bool {
        let Some(mut cell) = self.rooms.get_mut(room) else {
            return false;
        };
        let key = path.room_field().key();

        let removed = match path.child_key() {
            None => cell.document.remove(key).is_some(),
            Some(child) => {
                let (removed, now_empty) = match cell
                    .document
                    .get_mut(key)
                    .and_then(Value::as_object_mut)
                {
                    Some(children) => (children.remove(child).is_some(), children.is_empty()),
                    None => (false, false),
                };
                // Empty keyed fields vanish, like any other empty node.
                if now_empty {
                    cell.document.remove(key);
                }
                removed
            }
        };

        if removed {
            cell.updated_at = now_millis();
            cell.emit(room, path, None);
        }
        drop(cell);
        self.prune(room);
        removed
    }

    fn prune(&self, room: &RoomId) {
        if self.rooms.remove_if(room, |_, cell| cell.is_idle()).is_some() {
            debug!(room = %room, "dropped empty room");
        }
    }

    fn subscribe(&self, room: &RoomId) -> broadcast::Receiver<RoomChange> {
        self.rooms
            .entry(room.clone())
            .or_insert_with(|| RoomCell::new(self.event_capacity))
            .changes
            .subscribe()
    }

    fn delete_room(&self, room: &RoomId) -> bool {
        // Listeners of a room nobody wrote to are left alone.
        let Some((_, cell)) = self
            .rooms
            .remove_if(room, |_, cell| !cell.document.is_empty())
        else {
            return false;
        };
        for (key, _) in cell.document.iter() {
            if let Ok(path) = RoomPath::parse(key) {
                cell.emit(room, &path, None);
            }
        }
        true
    }

    fn summaries(&self) -> Vec<RoomSummary> {
        self.rooms.retain(|_, cell| !cell.is_idle());
        let mut summaries: Vec<RoomSummary> = self
            .rooms
            .iter()
            .filter(|entry| !entry.value().document.is_empty())
            .map(|entry| {
                let document = &entry.value().document;
                let field = |field: RoomField| document.get(field.key()).cloned().unwrap_or_default();
                RoomSummary {
                    id: entry.key().clone(),
                    phase: decode_scalar::<RoomPhase>(&field(RoomField::Phase)).unwrap_or_default(),
                    participants: normalize_list::<Value>(&field(RoomField::Participants)).len(),
                    connected: normalize_keyed::<PresenceEntry>(&field(RoomField::Presence)).len(),
                    updated_at: entry.value().updated_at,
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }
}

impl RoomStore for MemoryRoomStore {
    fn get(&self, room: &RoomId, path: &RoomPath) -> BoxFuture<'static, StorageResult<Option<Value>>> {
        let value = self.inner.read(room, path);
        Box::pin(async move { Ok(value) })
    }

    fn set(&self, room: &RoomId, path: &RoomPath, value: Value) -> BoxFuture<'static, StorageResult<()>> {
        let result = self.inner.write(room, path, value);
        debug!(room = %room, path = %path, ok = result.is_ok(), "room write");
        Box::pin(async move { result })
    }

    fn remove(&self, room: &RoomId, path: &RoomPath) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.delete(room, path);
        Box::pin(async move { Ok(()) })
    }

    fn snapshot(&self, room: &RoomId) -> BoxFuture<'static, StorageResult<Option<Value>>> {
        let document = self.inner.document(room);
        Box::pin(async move { Ok(document) })
    }

    fn subscribe(&self, room: &RoomId) -> BoxFuture<'static, StorageResult<broadcast::Receiver<RoomChange>>> {
        let receiver = self.inner.subscribe(room);
        Box::pin(async move { Ok(receiver) })
    }

    fn on_disconnect_remove(
        &self,
        room: &RoomId,
        path: &RoomPath,
    ) -> BoxFuture<'static, StorageResult<DisconnectGuard>> {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let room = room.clone();
        let path = path.clone();
        let guard = DisconnectGuard::new(move || {
            if let Some(inner) = inner.upgrade() {
                if inner.delete(&room, &path) {
                    debug!(room = %room, path = %path, "disconnect hook removed value");
                }
            }
        });
        Box::pin(async move { Ok(guard) })
    }

    fn delete_room(&self, room: &RoomId) -> BoxFuture<'static, StorageResult<bool>> {
        let existed = self.inner.delete_room(room);
        if existed {
            info!(room = %room, "room removed");
        }
        Box::pin(async move { Ok(existed) })
    }

    fn list_rooms(&self) -> BoxFuture<'static, StorageResult<Vec<RoomSummary>>> {
        let summaries = self.inner.summaries();
        Box::pin(async move { Ok(summaries) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async move { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn room() -> RoomId {
        RoomId::parse("4242").unwrap()
    }

    fn vote_path(client: &str) -> RoomPath {
        RoomPath::child(RoomField::Votes, client).unwrap()
    }

    #[tokio::test]
    async fn first_write_creates_the_room() {
        let store = MemoryRoomStore::default();
        assert!(store.snapshot(&room()).await.unwrap().is_none());

        store
            .set(&room(), &RoomField::Phase.into(), json!("spinning"))
            .await
            .unwrap();

        let document = store.snapshot(&room()).await.unwrap().unwrap();
        assert_eq!(document, json!({"phase": "spinning"}));
        assert_eq!(store.room_count(), 1);
    }

    #[tokio::test]
    async fn keyed_children_are_written_and_read_individually() {
        let store = MemoryRoomStore::default();
        store.set(&room(), &vote_path("a"), json!({"votedFor": "x"})).await.unwrap();
        store.set(&room(), &vote_path("b"), json!({"votedFor": "y"})).await.unwrap();

        assert_eq!(
            store.get(&room(), &vote_path("a")).await.unwrap(),
            Some(json!({"votedFor": "x"}))
        );
        let all = store.get(&room(), &RoomField::Votes.into()).await.unwrap().unwrap();
        assert_eq!(all.as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn removing_last_child_drops_the_field() {
        let store = MemoryRoomStore::default();
        store.set(&room(), &vote_path("a"), json!({"votedFor": "x"})).await.unwrap();
        store.remove(&room(), &vote_path("a")).await.unwrap();

        assert!(store.get(&room(), &RoomField::Votes.into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn writing_null_removes() {
        let store = MemoryRoomStore::default();
        let path: RoomPath = RoomField::Category.into();
        store.set(&room(), &path, json!("snack")).await.unwrap();
        store.set(&room(), &path, Value::Null).await.unwrap();
        assert!(store.get(&room(), &path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn keyed_write_into_scalar_is_rejected() {
        let store = MemoryRoomStore::default();
        store.set(&room(), &RoomField::Votes.into(), json!([1, 2])).await.unwrap();
        let err = store.set(&room(), &vote_path("a"), json!({})).await.unwrap_err();
        assert!(matches!(err, StorageError::NotAnObject { .. }));
    }

    #[tokio::test]
    async fn subscribers_see_writes_and_removals() {
        let store = MemoryRoomStore::default();
        let mut changes = store.subscribe(&room()).await.unwrap();

        store.set(&room(), &vote_path("a"), json!({"votedFor": "x"})).await.unwrap();
        store.remove(&room(), &vote_path("a")).await.unwrap();
        // Removing something absent is silent.
        store.remove(&room(), &vote_path("a")).await.unwrap();

        let first = changes.recv().await.unwrap();
        assert_eq!(first.path, vote_path("a"));
        assert_eq!(first.value, Some(json!({"votedFor": "x"})));
        let second = changes.recv().await.unwrap();
        assert_eq!(second.value, None);
        assert!(changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn disconnect_guard_removes_presence() {
        let store = MemoryRoomStore::default();
        let path = RoomPath::child(RoomField::Presence, "client-1").unwrap();
        store.set(&room(), &path, json!({"name": "Alice"})).await.unwrap();

        let guard = store.on_disconnect_remove(&room(), &path).await.unwrap();
        assert!(store.get(&room(), &path).await.unwrap().is_some());
        drop(guard);
        assert!(store.get(&room(), &path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn disarmed_guard_keeps_value() {
        let store = MemoryRoomStore::default();
        let path = RoomPath::child(RoomField::Presence, "client-1").unwrap();
        store.set(&room(), &path, json!({"name": "Alice"})).await.unwrap();

        store.on_disconnect_remove(&room(), &path).await.unwrap().disarm();
        assert!(store.get(&room(), &path).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn subscribing_does_not_create_the_room() {
        let store = MemoryRoomStore::default();
        let changes = store.subscribe(&room()).await.unwrap();

        assert!(store.snapshot(&room()).await.unwrap().is_none());
        assert!(store.list_rooms().await.unwrap().is_empty());
        assert_eq!(store.room_count(), 0);
        assert!(!store.delete_room(&room()).await.unwrap());

        drop(changes);
        let _changes = store.subscribe(&room()).await.unwrap();
        store.set(&room(), &RoomField::Phase.into(), json!("waiting")).await.unwrap();
        assert!(store.snapshot(&room()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn room_emptied_by_disconnect_disappears() {
        let store = MemoryRoomStore::default();
        let path = RoomPath::child(RoomField::Presence, "client-1").unwrap();
        store.set(&room(), &path, json!({"name": "Alice"})).await.unwrap();
        let guard = store.on_disconnect_remove(&room(), &path).await.unwrap();

        drop(guard);
        assert!(store.snapshot(&room()).await.unwrap().is_none());
        assert!(store.list_rooms().await.unwrap().is_empty());
        assert_eq!(store.inner.rooms.len(), 0);
    }

    #[tokio::test]
    async fn abandoned_subscriber_cells_are_pruned_on_listing() {
        let store = MemoryRoomStore::default();
        drop(store.subscribe(&room()).await.unwrap());
        assert_eq!(store.inner.rooms.len(), 1);

        assert!(store.list_rooms().await.unwrap().is_empty());
        assert_eq!(store.inner.rooms.len(), 0);
    }

    #[tokio::test]
    async fn delete_room_and_list() {
        let store = MemoryRoomStore::default();
        store
            .set(&room(), &RoomField::Participants.into(), json!([{"name": "A", "weight": 100}]))
            .await
            .unwrap();
        let listed = store.list_rooms().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].participants, 1);
        assert_eq!(listed[0].phase, RoomPhase::Waiting);

        assert!(store.delete_room(&room()).await.unwrap());
        assert!(!store.delete_room(&room()).await.unwrap());
        assert!(store.list_rooms().await.unwrap().is_empty());
    }
}
