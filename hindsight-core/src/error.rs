//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReplayError {
    /// Sampling was requested before any transition was stored.
    #[error("cannot sample from an empty replay buffer")]
    EmptyBuffer,

    /// The buffer carries goal columns but the pushed batch lacks the goal triple.
    #[error("goal data must be provided when the buffer is goal-shaped")]
    MissingGoalData,

    /// The pushed batch carries goal data but the buffer has no goal columns.
    #[error("goal data given to a buffer without goal columns")]
    UnexpectedGoalData,
}
