//! Across-process synchronization contract for multi-worker training.
//!
//! Every worker owns an independent replay buffer; transition data is never
//! shared between processes. After each learning step the workers combine
//! gradients through a sum-only all-reduce supplied by the process group.
//! This module names that capability; MPI-style backends implement it
//! outside this crate.
use anyhow::Result;

/// The collective operation workers use to combine gradients.
pub trait DistributedSync {
    /// Sums `grads` element-wise across all workers, in place.
    ///
    /// Sum only: scaling by the world size, if wanted, is the caller's
    /// responsibility.
    fn reduce_sum(&self, grads: &mut [f32]) -> Result<()>;

    /// Number of participating workers.
    fn world_size(&self) -> usize;
}

/// Single-process synchronization; `reduce_sum` leaves gradients untouched.
pub struct NullSync;

impl DistributedSync for NullSync {
    fn reduce_sum(&self, _grads: &mut [f32]) -> Result<()> {
        Ok(())
    }

    fn world_size(&self) -> usize {
        1
    }
}
