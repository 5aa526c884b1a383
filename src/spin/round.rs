//! Round phase machine shared by owners and participants.

use thiserror::Error;

use crate::dao::models::RoomPhase;

/// Events that move a round between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEvent {
    /// A spin was announced.
    StartSpin,
    /// Results were published, with or without a spin.
    Finalize,
    /// Owner cleared the round.
    Reset,
}

/// Error returned when an event cannot be applied from the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// Phase the machine was in when the event arrived.
    pub from: RoomPhase,
    /// Rejected event.
    pub event: RoundEvent,
}

/// Local view of the room phase.
///
/// Local intents go through [`RoundMachine::apply`]; phases observed on the store replace the
/// local phase unconditionally through [`RoundMachine::observe`].
#[derive(Debug, Clone, Default)]
pub struct RoundMachine {
    phase: RoomPhase,
    version: usize,
}

impl RoundMachine {
    /// Machine starting in [`RoomPhase::Waiting`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    /// Number of phase changes seen so far.
    pub fn version(&self) -> usize {
        self.version
    }

    /// Validate and apply a local event.
    pub fn apply(&mut self, event: RoundEvent) -> Result<RoomPhase, InvalidTransition> {
        let next = Self::next_phase(self.phase, event)?;
        self.set(next);
        Ok(next)
    }

    /// Whether `event` would be accepted from the current phase.
    pub fn can_apply(&self, event: RoundEvent) -> bool {
        Self::next_phase(self.phase, event).is_ok()
    }

    /// Adopt a phase written by another client. Returns whether it changed anything.
    pub fn observe(&mut self, phase: RoomPhase) -> bool {
        if self.phase == phase {
            return false;
        }
        self.set(phase);
        true
    }

    fn set(&mut self, phase: RoomPhase) {
        self.phase = phase;
        self.version += 1;
    }

    fn next_phase(from: RoomPhase, event: RoundEvent) -> Result<RoomPhase, InvalidTransition> {
        let next = match (from, event) {
            (RoomPhase::Waiting, RoundEvent::StartSpin) => RoomPhase::Spinning,
            (RoomPhase::Spinning, RoundEvent::Finalize) => RoomPhase::Done,
            (RoomPhase::Waiting, RoundEvent::Finalize) => RoomPhase::Done,
            (_, RoundEvent::Reset) => RoomPhase::Waiting,
            (from, event) => return Err(InvalidTransition { from, event }),
        };
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_phase_is_waiting() {
        let machine = RoundMachine::new();
        assert_eq!(machine.phase(), RoomPhase::Waiting);
        assert_eq!(machine.version(), 0);
    }

    #[test]
    fn full_round_with_spin() {
        let mut machine = RoundMachine::new();
        assert_eq!(machine.apply(RoundEvent::StartSpin).unwrap(), RoomPhase::Spinning);
        assert_eq!(machine.apply(RoundEvent::Finalize).unwrap(), RoomPhase::Done);
        assert_eq!(machine.apply(RoundEvent::Reset).unwrap(), RoomPhase::Waiting);
        assert_eq!(machine.version(), 3);
    }

    #[test]
    fn forced_finalize_skips_spinning() {
        let mut machine = RoundMachine::new();
        assert_eq!(machine.apply(RoundEvent::Finalize).unwrap(), RoomPhase::Done);
    }

    #[test]
    fn invalid_transition_returns_error() {
        let mut machine = RoundMachine::new();
        machine.apply(RoundEvent::StartSpin).unwrap();

        let err = machine.apply(RoundEvent::StartSpin).unwrap_err();
        assert_eq!(err.from, RoomPhase::Spinning);
        assert_eq!(err.event, RoundEvent::StartSpin);
        assert_eq!(machine.phase(), RoomPhase::Spinning);

        machine.apply(RoundEvent::Finalize).unwrap();
        assert!(!machine.can_apply(RoundEvent::Finalize));
        assert!(!machine.can_apply(RoundEvent::StartSpin));
    }

    #[test]
    fn remote_phase_overrides_local() {
        let mut machine = RoundMachine::new();
        assert!(machine.observe(RoomPhase::Done));
        assert!(!machine.observe(RoomPhase::Done));
        assert_eq!(machine.phase(), RoomPhase::Done);
        assert_eq!(machine.version(), 1);
    }
}
