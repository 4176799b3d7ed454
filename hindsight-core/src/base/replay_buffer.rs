//! Replay buffer interfaces.
use anyhow::Result;

/// Interface for buffers that store experiences from environments.
///
/// An off-policy training loop holds its buffer through this trait; the
/// hindsight relay in [`crate::her`] inserts relabeled transitions through
/// the same interface, so it works with any buffer implementation.
pub trait ExperienceBufferBase {
    /// The type of items stored in the buffer.
    type Item;

    /// Pushes a batch of experiences into the buffer.
    fn push(&mut self, tr: Self::Item) -> Result<()>;

    /// Returns the current number of experiences in the buffer.
    fn len(&self) -> usize;

    /// Returns `true` if no experience has been stored yet.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Interface for replay buffers that generate batches for training.
pub trait ReplayBufferBase {
    /// Configuration parameters of the replay buffer.
    type Config: Clone;

    /// The type of batches generated for training.
    type Batch;

    /// Builds a replay buffer from the given configuration.
    fn build(config: &Self::Config) -> Self;

    /// Samples a batch of experiences for training.
    ///
    /// Fails on an empty buffer.
    fn batch(&mut self, size: usize) -> Result<Self::Batch>;

    /// Updates the priorities of the experiences at `ixs`.
    ///
    /// Used after a learning step to feed TD errors back into prioritized
    /// sampling. Buffers without prioritization ignore this call.
    fn update_priority(&mut self, ixs: &Option<Vec<usize>>, td_errs: &Option<Vec<f32>>);
}
