//! Replay buffers with uniform and prioritized sampling.
//!
//! Transitions are stored column-wise in fixed-capacity dense arrays behind
//! a circular write cursor. [`ReplayBuffer`] samples uniformly with
//! replacement; [`PrioritizedReplayBuffer`] layers priority-weighted
//! sampling and importance-sampling correction on top of the same storage.
mod base;
mod batch;
mod config;
mod per;
pub use base::ReplayBuffer;
pub use batch::{ArrayBatch, BatchBase, GoalBatch, TransitionBatch};
pub use config::{PerConfig, PriorityMode, PrioritizedReplayBufferConfig, ReplayBufferConfig};
pub use per::{IwScheduler, PrioritizedReplayBuffer, SumTree};
