use std::{sync::Arc, time::Duration};

use futures::StreamExt;
use rand::{SeedableRng, rngs::StdRng};
use roulette_rooms::{
    dao::{
        models::{FinalResults, Participant, Role, RoomPhase, SpinTarget},
        paths::RoomId,
        room_store::{MemoryRoomStore, RoomStore},
    },
    spin::{RoundCoordinator, wheel::WheelGeometry},
    sync::{ClientIdentity, SyncClient},
};
use tokio::sync::mpsc;

const SPIN_DURATION: Duration = Duration::from_secs(4);

fn room() -> RoomId {
    RoomId::parse("LUNCH1").unwrap()
}

async fn join(store: &Arc<dyn RoomStore>, id: &str, name: &str, role: Role) -> RoundCoordinator {
    let client = SyncClient::join(store.clone(), ClientIdentity::from_id(id), name, room(), role).await;
    RoundCoordinator::new(client, WheelGeometry::default(), SPIN_DURATION)
}

async fn next_results(rx: &mut mpsc::UnboundedReceiver<Option<FinalResults>>) -> FinalResults {
    loop {
        let value = tokio::time::timeout(Duration::from_secs(30), rx.recv())
            .await
            .expect("timed out waiting for results")
            .expect("subscription ended");
        if let Some(results) = value {
            return results;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn owner_spin_reaches_every_participant() {
    let store: Arc<dyn RoomStore> = Arc::new(MemoryRoomStore::default());
    let owner = join(&store, "owner-1", "Owner", Role::Owner).await;
    let guest = join(&store, "guest-1", "Guest", Role::Participant).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _subscription = guest.client().subscribe_final_results(move |results| {
        let _ = tx.send(results);
    });

    owner.client().set_spin_target(SpinTarget::People).await;
    owner
        .client()
        .set_roster(&[Participant::new("Alice", 60), Participant::new("Bob", 40)])
        .await;

    let (plan, published) = owner.run_spin(&mut StdRng::seed_from_u64(2024)).await.unwrap();
    let published = published.expect("people spins finalize immediately");

    assert!(published.winner == "Alice" || published.winner == "Bob");
    assert_eq!(published.winner, plan.winner);
    assert_eq!(published.winners, vec![plan.winner.clone()]);
    assert_eq!(published.total_participants, 2);
    assert!(!published.is_forced);
    assert!(!published.is_tie);

    let received = next_results(&mut rx).await;
    assert_eq!(received, published);
    assert_eq!(
        guest.observe_final_results(Some(received.clone())),
        Some(received.clone())
    );
    assert_eq!(guest.observe_final_results(Some(received)), None);

    let snapshot = guest.client().snapshot().await;
    assert_eq!(snapshot.phase, RoomPhase::Done);
    assert_eq!(snapshot.spin_state.unwrap().winner_index, plan.winner_index);
}

#[tokio::test(start_paused = true)]
async fn menu_round_finalizes_once_all_votes_are_in() {
    let store: Arc<dyn RoomStore> = Arc::new(MemoryRoomStore::default());
    let owner = join(&store, "owner-1", "Owner", Role::Owner).await;
    let first = join(&store, "guest-1", "Jun", Role::Participant).await;
    let second = join(&store, "guest-2", "Mina", Role::Participant).await;

    owner.client().set_spin_target(SpinTarget::Menu).await;
    owner
        .client()
        .set_menu(&["Ramen".to_string(), "Pizza".to_string(), "Sushi".to_string()])
        .await;

    let mut votes = Box::pin(owner.client().watch_votes());
    assert!(votes.next().await.unwrap().is_empty());

    let expected = owner.client().snapshot().await.presence.len();
    assert_eq!(expected, 3);

    let mut finalizations = Vec::new();
    for (seed, spinner) in [&owner, &first, &second].into_iter().enumerate() {
        let (_, results) = spinner
            .run_spin(&mut StdRng::seed_from_u64(seed as u64))
            .await
            .unwrap();
        assert!(results.is_none());

        let current = votes.next().await.unwrap();
        assert_eq!(current.len(), seed + 1);
        if let Some(results) = owner.observe_votes(&current, expected).await {
            finalizations.push(results);
        }
    }

    // Seeing the same votes again must not publish a second time.
    let snapshot = owner.client().snapshot().await;
    assert!(owner.observe_votes(&snapshot.votes, expected).await.is_none());

    assert_eq!(finalizations.len(), 1);
    let results = &finalizations[0];
    assert_eq!(results.total_votes, 3);
    assert_eq!(results.total_participants, 3);
    assert_eq!(results.tally.values().sum::<u32>(), 3);
    assert!(!results.is_forced);
    for (name, count) in &results.tally {
        let cast = snapshot
            .votes
            .values()
            .filter(|vote| &vote.voted_for == name)
            .count() as u32;
        assert_eq!(*count, cast);
    }
    assert_eq!(snapshot.final_results.as_ref(), Some(results));
    assert_eq!(snapshot.phase, RoomPhase::Done);
}

#[tokio::test]
async fn owner_can_force_an_incomplete_round() {
    let store: Arc<dyn RoomStore> = Arc::new(MemoryRoomStore::default());
    let owner = join(&store, "owner-1", "Owner", Role::Owner).await;
    let guest = join(&store, "guest-1", "Jun", Role::Participant).await;
    let _idle = join(&store, "guest-2", "Mina", Role::Participant).await;

    owner.client().set_spin_target(SpinTarget::Menu).await;
    guest.client().submit_vote("Pizza").await;

    let snapshot = owner.client().snapshot().await;
    let expected = snapshot.presence.len();
    assert!(owner.observe_votes(&snapshot.votes, expected).await.is_none());
    assert!(guest.force_finalize(&snapshot.votes, expected).await.is_err());

    let results = owner.force_finalize(&snapshot.votes, expected).await.unwrap();
    assert!(results.is_forced);
    assert_eq!(results.winner, "Pizza");
    assert_eq!(results.total_votes, 1);
    assert_eq!(results.total_participants, 3);

    owner.reset_round().await.unwrap();
    let snapshot = guest.client().snapshot().await;
    assert_eq!(snapshot.phase, RoomPhase::Waiting);
    assert!(snapshot.votes.is_empty());
    assert!(snapshot.final_results.is_none());
}

#[tokio::test]
async fn dropped_clients_leave_presence() {
    let store: Arc<dyn RoomStore> = Arc::new(MemoryRoomStore::default());
    let owner = join(&store, "owner-1", "Owner", Role::Owner).await;
    let guest = join(&store, "guest-1", "Jun", Role::Participant).await;

    assert_eq!(owner.client().snapshot().await.presence.len(), 2);
    drop(guest);
    let presence = owner.client().snapshot().await.presence;
    assert_eq!(presence.len(), 1);
    assert_eq!(presence["owner-1"].role, Role::Owner);
}
