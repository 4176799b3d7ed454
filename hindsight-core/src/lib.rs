#![warn(missing_docs)]
//! Experience replay for reinforcement learning.
//!
//! This crate provides the replay subsystem used by off-policy agents:
//!
//! * [`replay_buffer::ReplayBuffer`]: fixed-capacity circular storage with
//!   batched writes and uniform sampling.
//! * [`replay_buffer::PrioritizedReplayBuffer`]: priority-weighted sampling
//!   with proportional and rank-based strategies and annealed
//!   importance-sampling correction.
//! * [`her`]: hindsight goal relabeling of full episode trajectories.
//! * [`sync`]: the across-process gradient synchronization contract for
//!   multi-worker training.
//!
//! Training loops hold buffers through the [`ExperienceBufferBase`] and
//! [`ReplayBufferBase`] interfaces. Policy and value models, environments
//! and experiment trackers are external collaborators; this crate never
//! inspects their internals.
pub mod error;
pub mod her;
pub mod replay_buffer;
pub mod sync;

mod base;
pub use base::{ExperienceBufferBase, ReplayBufferBase};
