//! Spin resolution: weighted selection, wheel geometry, vote tally and round coordination.

pub mod coordinator;
pub mod round;
pub mod selection;
pub mod tally;
pub mod wheel;

use thiserror::Error;

pub use self::coordinator::{RoundCoordinator, SpinPlan};
pub use self::round::{InvalidTransition, RoundEvent, RoundMachine};

/// Reasons a spin or finalization request is refused. Nothing is written when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpinError {
    /// The wheel needs more entries.
    #[error("at least {required} entries are required, got {actual}")]
    TooFewEntries {
        /// Minimum entry count.
        required: usize,
        /// Usable entries found.
        actual: usize,
    },
    /// People-mode weights do not add up.
    #[error("weights must total {expected}, got {actual}")]
    WeightsMustTotal {
        /// Required total.
        expected: u32,
        /// Actual total.
        actual: u32,
    },
    /// Every entry has zero weight.
    #[error("nothing to spin")]
    NothingToSpin,
    /// Only the room owner may do this.
    #[error("only the room owner can do this")]
    NotOwner,
    /// Finalization requested without any vote.
    #[error("no votes to finalize")]
    NoVotes,
    /// Results for this round are already published.
    #[error("round is already finalized")]
    AlreadyFinalized,
    /// Phase does not allow the request.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}
