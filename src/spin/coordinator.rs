//! Per-client round coordination on top of a [`SyncClient`].

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use indexmap::IndexMap;
use rand::Rng;
use tracing::{debug, info};

use crate::{
    dao::models::{FinalResults, Room, RoomPhase, SpinTarget, Vote},
    spin::{
        SpinError,
        round::{InvalidTransition, RoundEvent, RoundMachine},
        selection::{pick_weighted, validate_menu, validate_roster},
        tally::{menu_results, people_results},
        wheel::{WheelGeometry, WheelLayout},
    },
    sync::SyncClient,
};

/// A spin decided up front: every viewer animates towards the same `target_rotation`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinPlan {
    /// List the wheel spins over.
    pub mode: SpinTarget,
    pub winner_index: usize,
    pub winner: String,
    /// Number of entries on the wheel.
    pub entries: usize,
    pub start_rotation: f64,
    pub target_rotation: f64,
    pub duration: Duration,
}

#[derive(Debug, Default)]
struct RoundState {
    machine: RoundMachine,
    rotation: f64,
    /// Results were published (locally or observed) for the current round.
    finalized: bool,
    /// The published results were already handed to the caller.
    navigated: bool,
}

/// Drives spins, votes and finalization for one client in one room.
///
/// Cheap to clone; clones share round state so a long [`RoundCoordinator::run_spin`] does not
/// stop vote or result observations from being processed.
#[derive(Clone)]
pub struct RoundCoordinator {
    client: SyncClient,
    geometry: WheelGeometry,
    duration: Duration,
    state: Arc<Mutex<RoundState>>,
}

impl RoundCoordinator {
    pub fn new(client: SyncClient, geometry: WheelGeometry, duration: Duration) -> Self {
        Self {
            client,
            geometry,
            duration,
            state: Arc::new(Mutex::new(RoundState::default())),
        }
    }

    pub fn client(&self) -> &SyncClient {
        &self.client
    }

    /// Locally known round phase.
    pub fn phase(&self) -> RoomPhase {
        self.lock().machine.phase()
    }

    /// Current wheel rotation in degrees (the last planned target).
    pub fn rotation(&self) -> f64 {
        self.lock().rotation
    }

    /// Validate the wheel of `room` and decide the winner and landing rotation.
    ///
    /// Nothing is written; a refused plan leaves the room untouched.
    pub fn plan_spin<R: Rng + ?Sized>(&self, room: &Room, rng: &mut R) -> Result<SpinPlan, SpinError> {
        let entries = room.wheel_entries();
        let weights: Vec<u32> = entries.iter().map(|(_, weight)| *weight).collect();

        match room.spin_target {
            SpinTarget::People => {
                if !self.client.is_owner() {
                    return Err(SpinError::NotOwner);
                }
                validate_roster(&weights)?;
            }
            SpinTarget::Menu => validate_menu(&room.menu_items)?,
        }

        let state = self.lock();
        if state.finalized || room.final_results.is_some() {
            return Err(SpinError::AlreadyFinalized);
        }
        if room.spin_target == SpinTarget::People && !state.machine.can_apply(RoundEvent::StartSpin) {
            return Err(InvalidTransition {
                from: state.machine.phase(),
                event: RoundEvent::StartSpin,
            }
            .into());
        }

        let winner_index = pick_weighted(&weights, rng).ok_or(SpinError::NothingToSpin)?;
        let plan = self.plan_landing(&weights, winner_index, state.rotation, rng)?;
        Ok(SpinPlan {
            mode: room.spin_target,
            winner: entries[winner_index].0.clone(),
            entries: entries.len(),
            ..plan
        })
    }

    /// Landing rotation for a spin somebody else announced in `room.spin_state`.
    pub fn follow_spin<R: Rng + ?Sized>(&self, room: &Room, rng: &mut R) -> Option<SpinPlan> {
        let spin = room.spin_state.as_ref()?;
        let entries = room.wheel_entries();
        let weights: Vec<u32> = entries.iter().map(|(_, weight)| *weight).collect();
        let winner = entries.get(spin.winner_index)?.0.clone();

        let mut state = self.lock();
        let plan = self
            .plan_landing(&weights, spin.winner_index, state.rotation, rng)
            .ok()?;
        state.rotation = plan.target_rotation;
        state.machine.observe(RoomPhase::Spinning);
        Some(SpinPlan {
            mode: room.spin_target,
            winner,
            entries: entries.len(),
            ..plan
        })
    }

    /// Publish the spin. People mode announces it to the room; menu spins stay local.
    pub async fn begin_spin(&self, plan: &SpinPlan) -> Result<(), SpinError> {
        {
            let mut state = self.lock();
            if plan.mode == SpinTarget::People {
                state.machine.apply(RoundEvent::StartSpin)?;
            }
            state.rotation = plan.target_rotation;
        }

        if plan.mode == SpinTarget::People {
            self.client
                .start_spin(self.client.display_name(), plan.winner_index, self.client.role())
                .await;
        }
        debug!(
            room = %self.client.room(),
            winner = %plan.winner,
            target = plan.target_rotation,
            "spin started"
        );
        Ok(())
    }

    /// Record where the wheel landed.
    ///
    /// People mode finalizes immediately and returns the published results; menu mode submits
    /// this client's vote and returns `None`.
    pub async fn complete_spin(&self, plan: &SpinPlan) -> Result<Option<FinalResults>, SpinError> {
        match plan.mode {
            SpinTarget::People => {
                let results = people_results(self.client.display_name(), &plan.winner, plan.entries);
                {
                    let mut state = self.lock();
                    state.machine.apply(RoundEvent::Finalize)?;
                    state.finalized = true;
                }
                self.client.finish_spin(&plan.winner).await;
                self.client.finalize_game(&results).await;
                info!(room = %self.client.room(), winner = %plan.winner, "people spin finalized");
                Ok(Some(results))
            }
            SpinTarget::Menu => {
                self.client.submit_vote(&plan.winner).await;
                Ok(None)
            }
        }
    }

    /// Plan, announce, wait for the animation and complete a spin on the current room.
    pub async fn run_spin<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<(SpinPlan, Option<FinalResults>), SpinError> {
        let room = self.client.snapshot().await;
        self.observe_phase(room.phase);
        let plan = self.plan_spin(&room, rng)?;
        self.begin_spin(&plan).await?;
        tokio::time::sleep(plan.duration).await;
        let results = self.complete_spin(&plan).await?;
        Ok((plan, results))
    }

    /// Owner side of menu voting: finalize once the vote count first reaches `expected`.
    ///
    /// Returns the published results the one time it finalizes.
    pub async fn observe_votes(
        &self,
        votes: &IndexMap<String, Vote>,
        expected: usize,
    ) -> Option<FinalResults> {
        if !self.client.is_owner() || expected == 0 || votes.len() < expected {
            return None;
        }
        let results = {
            let mut state = self.lock();
            if state.finalized {
                return None;
            }
            let results = menu_results(votes, expected, false)?;
            state.finalized = true;
            if let Err(err) = state.machine.apply(RoundEvent::Finalize) {
                debug!(error = %err, "finalizing from an unexpected phase");
                state.machine.observe(RoomPhase::Done);
            }
            results
        };

        self.client.finalize_game(&results).await;
        info!(
            room = %self.client.room(),
            winner = %results.winner,
            votes = results.total_votes,
            "menu vote finalized"
        );
        Some(results)
    }

    /// Owner finalization with whatever votes came in.
    pub async fn force_finalize(
        &self,
        votes: &IndexMap<String, Vote>,
        expected: usize,
    ) -> Result<FinalResults, SpinError> {
        if !self.client.is_owner() {
            return Err(SpinError::NotOwner);
        }
        if votes.is_empty() {
            return Err(SpinError::NoVotes);
        }
        let results = {
            let mut state = self.lock();
            if state.finalized {
                return Err(SpinError::AlreadyFinalized);
            }
            let results = menu_results(votes, expected, true).ok_or(SpinError::NoVotes)?;
            if let Err(err) = state.machine.apply(RoundEvent::Finalize) {
                debug!(error = %err, "forcing finalization from an unexpected phase");
                state.machine.observe(RoomPhase::Done);
            }
            state.finalized = true;
            results
        };

        self.client.finalize_game(&results).await;
        info!(
            room = %self.client.room(),
            votes = results.total_votes,
            expected,
            "round finalized by owner"
        );
        Ok(results)
    }

    /// Feed an observed `final_results` value. Returns it the first time it shows up in a
    /// round; a cleared value re-arms the check.
    pub fn observe_final_results(&self, results: Option<FinalResults>) -> Option<FinalResults> {
        let mut state = self.lock();
        match results {
            Some(results) => {
                state.finalized = true;
                state.machine.observe(RoomPhase::Done);
                if state.navigated {
                    return None;
                }
                state.navigated = true;
                Some(results)
            }
            None => {
                state.finalized = false;
                state.navigated = false;
                None
            }
        }
    }

    /// Adopt a phase written by any client.
    pub fn observe_phase(&self, phase: RoomPhase) {
        let mut state = self.lock();
        if state.machine.observe(phase) && phase == RoomPhase::Waiting {
            state.finalized = false;
            state.navigated = false;
        }
    }

    /// Owner clears votes, spin and results and returns the room to waiting.
    pub async fn reset_round(&self) -> Result<(), SpinError> {
        if !self.client.is_owner() {
            return Err(SpinError::NotOwner);
        }
        {
            let mut state = self.lock();
            state.machine.apply(RoundEvent::Reset)?;
            state.finalized = false;
            state.navigated = false;
        }
        self.client.reset_round().await;
        Ok(())
    }

    fn plan_landing<R: Rng + ?Sized>(
        &self,
        weights: &[u32],
        winner_index: usize,
        start_rotation: f64,
        rng: &mut R,
    ) -> Result<SpinPlan, SpinError> {
        let layout = WheelLayout::new(weights).ok_or(SpinError::NothingToSpin)?;
        let target_rotation = layout
            .target_rotation(&self.geometry, winner_index, start_rotation, rng)
            .ok_or(SpinError::NothingToSpin)?;
        Ok(SpinPlan {
            mode: SpinTarget::People,
            winner_index,
            winner: String::new(),
            entries: layout.len(),
            start_rotation,
            target_rotation,
            duration: self.duration,
        })
    }

    fn lock(&self) -> MutexGuard<'_, RoundState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
