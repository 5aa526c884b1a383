//! Client-side handle translating room intents into store reads, writes and subscriptions.
//!
//! Store failures are logged and swallowed: nothing here retries, and callers never see an
//! error. Durability and redelivery are the store's business.

mod identity;
mod subscription;

use std::sync::{Arc, Mutex};

use futures::Stream;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::dao::{
    models::{
        Category, FinalResults, Participant, PresenceEntry, Role, Room, RoomPhase, SpinState,
        SpinTarget, Vote, decode_scalar, normalize_keyed, normalize_list, now_millis,
    },
    paths::{RoomField, RoomId, RoomPath},
    room_store::{DisconnectGuard, RoomStore},
};

pub use self::identity::{ClientIdentity, IdentityError};
pub use self::subscription::Subscription;
use self::subscription::watch_path;

/// Handle to one room for one client. Clones share the same presence registration; the
/// presence record is removed when the last clone is dropped or [`SyncClient::leave`] runs.
#[derive(Clone)]
pub struct SyncClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    store: Arc<dyn RoomStore>,
    room: RoomId,
    identity: ClientIdentity,
    display_name: String,
    role: Role,
    presence: Mutex<Option<DisconnectGuard>>,
}

impl SyncClient {
    /// Join `room`: write `presence/{clientId}` and arrange for it to disappear on disconnect.
    pub async fn join(
        store: Arc<dyn RoomStore>,
        identity: ClientIdentity,
        display_name: impl Into<String>,
        room: RoomId,
        role: Role,
    ) -> Self {
        let display_name = display_name.into();
        let entry = PresenceEntry {
            name: display_name.clone(),
            role,
            last_active: now_millis(),
        };

        let guard = match (presence_path(&identity), serde_json::to_value(&entry)) {
            (None, _) => None,
            (Some(_), Err(err)) => {
                warn!(error = %err, "failed to encode presence");
                None
            }
            (Some(path), Ok(value)) => match store.set(&room, &path, value).await {
                Ok(()) => match store.on_disconnect_remove(&room, &path).await {
                    Ok(guard) => Some(guard),
                    Err(err) => {
                        warn!(room = %room, error = %err, "failed to register disconnect hook");
                        None
                    }
                },
                Err(err) => {
                    warn!(room = %room, error = %err, "failed to write presence");
                    None
                }
            },
        };

        info!(
            room = %room,
            client_id = %identity.client_id,
            name = %display_name,
            role = ?role,
            "joined room"
        );

        Self {
            inner: Arc::new(ClientInner {
                store,
                room,
                identity,
                display_name,
                role,
                presence: Mutex::new(guard),
            }),
        }
    }

    /// Room this client is attached to.
    pub fn room(&self) -> &RoomId {
        &self.inner.room
    }

    /// Identity used as key for presence and votes.
    pub fn identity(&self) -> &ClientIdentity {
        &self.inner.identity
    }

    /// Name shown to other clients.
    pub fn display_name(&self) -> &str {
        &self.inner.display_name
    }

    /// Role claimed at join time.
    pub fn role(&self) -> Role {
        self.inner.role
    }

    /// Whether this client claimed the owner role.
    pub fn is_owner(&self) -> bool {
        self.inner.role == Role::Owner
    }

    /// Drop the presence record now instead of waiting for the last clone to go away.
    pub fn leave(&self) {
        let guard = match self.inner.presence.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if guard.is_some() {
            info!(room = %self.inner.room, client_id = %self.inner.identity.client_id, "left room");
        }
    }

    /// Refresh `lastActive` on the presence record.
    pub async fn touch(&self) {
        let entry = PresenceEntry {
            name: self.inner.display_name.clone(),
            role: self.inner.role,
            last_active: now_millis(),
        };
        if let Some(path) = presence_path(&self.inner.identity) {
            self.write(path, &entry, "touch presence").await;
        }
    }

    /// Decoded view of the whole room.
    pub async fn snapshot(&self) -> Room {
        let room = self.inner.room.clone();
        match self.inner.store.snapshot(&room).await {
            Ok(Some(document)) => Room::from_document(room, &document),
            Ok(None) => Room::empty(room),
            Err(err) => {
                warn!(room = %room, error = %err, "snapshot failed");
                Room::empty(room)
            }
        }
    }

    /// Replace the roster. No merge: last writer wins.
    pub async fn set_roster(&self, participants: &[Participant]) {
        self.write(RoomField::Participants.into(), participants, "set roster")
            .await;
    }

    /// Replace the menu list.
    pub async fn set_menu(&self, items: &[String]) {
        self.write(RoomField::MenuItems.into(), items, "set menu").await;
    }

    pub async fn set_category(&self, category: Category) {
        self.write(RoomField::Category.into(), &category, "set category")
            .await;
    }

    pub async fn set_spin_target(&self, target: SpinTarget) {
        self.write(RoomField::SpinTarget.into(), &target, "set spin target")
            .await;
    }

    pub async fn set_phase(&self, phase: RoomPhase) {
        self.write(RoomField::Phase.into(), &phase, "set phase").await;
    }

    /// Announce a spin and its predetermined winner so every viewer lands on the same entry.
    pub async fn start_spin(&self, starter_name: &str, winner_index: usize, role: Role) {
        let spin = SpinState {
            starter_name: starter_name.to_string(),
            starter_role: role,
            winner_index,
            winner: None,
            started_at: now_millis(),
            finished_at: None,
        };
        self.write(RoomField::SpinState.into(), &spin, "start spin").await;
        self.set_phase(RoomPhase::Spinning).await;
    }

    /// Announce that the current spin landed on `winner`.
    pub async fn finish_spin(&self, winner: &str) {
        let path: RoomPath = RoomField::SpinState.into();
        let current = match self.inner.store.get(&self.inner.room, &path).await {
            Ok(value) => value.as_ref().and_then(decode_scalar::<SpinState>),
            Err(err) => {
                warn!(room = %self.inner.room, error = %err, "failed to read spin state");
                None
            }
        };
        let Some(mut spin) = current else {
            warn!(room = %self.inner.room, "finish_spin without an announced spin; ignoring");
            return;
        };
        spin.winner = Some(winner.to_string());
        spin.finished_at = Some(now_millis());
        self.write(path, &spin, "finish spin").await;
    }

    /// Record this client's vote. A second vote overwrites the first.
    pub async fn submit_vote(&self, voted_for: &str) {
        let vote = Vote {
            user_name: self.inner.display_name.clone(),
            voted_for: voted_for.to_string(),
            timestamp: now_millis(),
        };
        if let Some(path) = vote_path(&self.inner.identity) {
            self.write(path, &vote, "submit vote").await;
        }
    }

    pub async fn remove_vote(&self) {
        if let Some(path) = vote_path(&self.inner.identity) {
            self.clear(path, "remove vote").await;
        }
    }

    /// Publish the round outcome and mark the room done. Publishing twice is harmless.
    pub async fn finalize_game(&self, results: &FinalResults) {
        self.write(RoomField::FinalResults.into(), results, "finalize game")
            .await;
        self.set_phase(RoomPhase::Done).await;
    }

    pub async fn clear_final_results(&self) {
        self.clear(RoomField::FinalResults.into(), "clear final results")
            .await;
    }

    /// Start a new round on the same roster: clear votes, spin and results.
    pub async fn reset_round(&self) {
        self.clear(RoomField::Votes.into(), "clear votes").await;
        self.clear(RoomField::SpinState.into(), "clear spin state")
            .await;
        self.clear_final_results().await;
        self.set_phase(RoomPhase::Waiting).await;
    }

    pub fn watch_roster(&self) -> impl Stream<Item = Vec<Participant>> + Send + use<> {
        self.watch(RoomField::Participants, normalize_list::<Participant>)
    }

    pub fn watch_menu(&self) -> impl Stream<Item = Vec<String>> + Send + use<> {
        self.watch(RoomField::MenuItems, normalize_list::<String>)
    }

    pub fn watch_category(&self) -> impl Stream<Item = Category> + Send + use<> {
        self.watch(RoomField::Category, |value| {
            decode_scalar::<Category>(value).unwrap_or_default()
        })
    }

    pub fn watch_phase(&self) -> impl Stream<Item = RoomPhase> + Send + use<> {
        self.watch(RoomField::Phase, |value| {
            decode_scalar::<RoomPhase>(value).unwrap_or_default()
        })
    }

    pub fn watch_spin_target(&self) -> impl Stream<Item = SpinTarget> + Send + use<> {
        self.watch(RoomField::SpinTarget, |value| {
            decode_scalar::<SpinTarget>(value).unwrap_or_default()
        })
    }

    pub fn watch_spin_state(&self) -> impl Stream<Item = Option<SpinState>> + Send + use<> {
        self.watch(RoomField::SpinState, decode_scalar::<SpinState>)
    }

    pub fn watch_votes(&self) -> impl Stream<Item = IndexMap<String, Vote>> + Send + use<> {
        self.watch(RoomField::Votes, normalize_keyed::<Vote>)
    }

    pub fn watch_final_results(
        &self,
    ) -> impl Stream<Item = Option<FinalResults>> + Send + use<> {
        self.watch(RoomField::FinalResults, decode_scalar::<FinalResults>)
    }

    pub fn watch_presence(
        &self,
    ) -> impl Stream<Item = IndexMap<String, PresenceEntry>> + Send + use<> {
        self.watch(RoomField::Presence, normalize_keyed::<PresenceEntry>)
    }

    /// Invoke `callback` with the roster now and after every change.
    pub fn subscribe_roster(
        &self,
        callback: impl FnMut(Vec<Participant>) + Send + 'static,
    ) -> Subscription {
        Subscription::spawn(self.watch_roster(), callback)
    }

    pub fn subscribe_menu(&self, callback: impl FnMut(Vec<String>) + Send + 'static) -> Subscription {
        Subscription::spawn(self.watch_menu(), callback)
    }

    pub fn subscribe_category(
        &self,
        callback: impl FnMut(Category) + Send + 'static,
    ) -> Subscription {
        Subscription::spawn(self.watch_category(), callback)
    }

    pub fn subscribe_phase(&self, callback: impl FnMut(RoomPhase) + Send + 'static) -> Subscription {
        Subscription::spawn(self.watch_phase(), callback)
    }

    pub fn subscribe_spin_target(
        &self,
        callback: impl FnMut(SpinTarget) + Send + 'static,
    ) -> Subscription {
        Subscription::spawn(self.watch_spin_target(), callback)
    }

    pub fn subscribe_spin_state(
        &self,
        callback: impl FnMut(Option<SpinState>) + Send + 'static,
    ) -> Subscription {
        Subscription::spawn(self.watch_spin_state(), callback)
    }

    pub fn subscribe_votes(
        &self,
        callback: impl FnMut(IndexMap<String, Vote>) + Send + 'static,
    ) -> Subscription {
        Subscription::spawn(self.watch_votes(), callback)
    }

    pub fn subscribe_final_results(
        &self,
        callback: impl FnMut(Option<FinalResults>) + Send + 'static,
    ) -> Subscription {
        Subscription::spawn(self.watch_final_results(), callback)
    }

    pub fn subscribe_presence(
        &self,
        callback: impl FnMut(IndexMap<String, PresenceEntry>) + Send + 'static,
    ) -> Subscription {
        Subscription::spawn(self.watch_presence(), callback)
    }

    fn watch<T, F>(&self, field: RoomField, decode: F) -> impl Stream<Item = T> + Send + use<T, F>
    where
        T: Send + 'static,
        F: Fn(&Value) -> T + Send + 'static,
    {
        watch_path(
            self.inner.store.clone(),
            self.inner.room.clone(),
            RoomPath::field(field),
            decode,
        )
    }

    async fn write<T: Serialize + ?Sized>(&self, path: RoomPath, value: &T, action: &'static str) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(err) => {
                warn!(action, error = %err, "failed to encode room value");
                return;
            }
        };
        match self.inner.store.set(&self.inner.room, &path, value).await {
            Ok(()) => debug!(room = %self.inner.room, path = %path, action, "room write"),
            Err(err) => warn!(
                room = %self.inner.room,
                path = %path,
                action,
                error = %err,
                "room write failed"
            ),
        }
    }

    async fn clear(&self, path: RoomPath, action: &'static str) {
        if let Err(err) = self.inner.store.remove(&self.inner.room, &path).await {
            warn!(room = %self.inner.room, path = %path, action, error = %err, "room clear failed");
        }
    }
}

fn presence_path(identity: &ClientIdentity) -> Option<RoomPath> {
    keyed_path(RoomField::Presence, identity)
}

fn vote_path(identity: &ClientIdentity) -> Option<RoomPath> {
    keyed_path(RoomField::Votes, identity)
}

fn keyed_path(field: RoomField, identity: &ClientIdentity) -> Option<RoomPath> {
    match RoomPath::child(field, identity.client_id.as_str()) {
        Ok(path) => Some(path),
        Err(err) => {
            warn!(client_id = %identity.client_id, error = %err, "client id cannot key a room path");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;
    use tokio::{sync::mpsc, time::timeout};

    use super::*;
    use crate::dao::room_store::MemoryRoomStore;

    fn room() -> RoomId {
        RoomId::parse("777777").unwrap()
    }

    async fn client(store: &MemoryRoomStore, name: &str, role: Role) -> SyncClient {
        SyncClient::join(
            Arc::new(store.clone()),
            ClientIdentity::from_id(name.to_lowercase()),
            name,
            room(),
            role,
        )
        .await
    }

    #[tokio::test]
    async fn join_registers_presence_and_drop_removes_it() {
        let store = MemoryRoomStore::default();
        let alice = client(&store, "Alice", Role::Owner).await;
        let room_view = alice.snapshot().await;
        assert_eq!(room_view.presence["alice"].role, Role::Owner);

        let clone = alice.clone();
        drop(alice);
        assert_eq!(clone.snapshot().await.presence.len(), 1);
        drop(clone);

        let observer = client(&store, "Bob", Role::Participant).await;
        let presence = observer.snapshot().await.presence;
        assert_eq!(presence.keys().collect::<Vec<_>>(), ["bob"]);
    }

    #[tokio::test]
    async fn leave_removes_presence_immediately() {
        let store = MemoryRoomStore::default();
        let alice = client(&store, "Alice", Role::Owner).await;
        alice.leave();
        assert!(alice.snapshot().await.presence.is_empty());
    }

    #[tokio::test]
    async fn roster_subscription_sees_current_value_then_changes() {
        let store = MemoryRoomStore::default();
        let owner = client(&store, "Owner", Role::Owner).await;
        let guest = client(&store, "Guest", Role::Participant).await;
        owner.set_roster(&[Participant::new("Alice", 100)]).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _subscription = guest.subscribe_roster(move |roster| {
            let _ = tx.send(roster);
        });

        let first = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(first, vec![Participant::new("Alice", 100)]);

        owner
            .set_roster(&[Participant::new("Alice", 60), Participant::new("Bob", 40)])
            .await;
        let second = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn vote_watch_sees_each_voter() {
        let store = MemoryRoomStore::default();
        let alice = client(&store, "Alice", Role::Owner).await;
        let bob = client(&store, "Bob", Role::Participant).await;
        let votes = alice.watch_votes();
        tokio::pin!(votes);

        assert!(votes.next().await.unwrap().is_empty());
        alice.submit_vote("Pizza").await;
        assert_eq!(votes.next().await.unwrap().len(), 1);
        bob.submit_vote("Ramen").await;
        let seen = votes.next().await.unwrap();
        assert_eq!(seen["bob"].voted_for, "Ramen");
        assert_eq!(seen["bob"].user_name, "Bob");

        bob.submit_vote("Pizza").await;
        let seen = votes.next().await.unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen["bob"].voted_for, "Pizza");

        bob.remove_vote().await;
        assert_eq!(votes.next().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn spin_lifecycle_updates_phase_and_state() {
        let store = MemoryRoomStore::default();
        let owner = client(&store, "Owner", Role::Owner).await;

        owner.finish_spin("nobody").await;
        assert!(owner.snapshot().await.spin_state.is_none());

        owner.start_spin("Owner", 1, Role::Owner).await;
        let view = owner.snapshot().await;
        assert_eq!(view.phase, RoomPhase::Spinning);
        assert_eq!(view.spin_state.as_ref().unwrap().winner_index, 1);

        owner.finish_spin("Bob").await;
        let spin = owner.snapshot().await.spin_state.unwrap();
        assert_eq!(spin.winner.as_deref(), Some("Bob"));
        assert!(spin.finished_at.is_some());
    }

    #[tokio::test]
    async fn reset_round_keeps_roster() {
        let store = MemoryRoomStore::default();
        let owner = client(&store, "Owner", Role::Owner).await;
        owner.set_roster(&[Participant::new("Alice", 100)]).await;
        owner.start_spin("Owner", 0, Role::Owner).await;
        owner.submit_vote("Alice").await;

        owner.reset_round().await;

        let view = owner.snapshot().await;
        assert_eq!(view.phase, RoomPhase::Waiting);
        assert!(view.votes.is_empty());
        assert!(view.spin_state.is_none());
        assert!(view.final_results.is_none());
        assert_eq!(view.participants.len(), 1);
    }
}
