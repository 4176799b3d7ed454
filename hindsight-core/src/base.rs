//! Interfaces the training loops program against.
mod replay_buffer;
pub use replay_buffer::{ExperienceBufferBase, ReplayBufferBase};
