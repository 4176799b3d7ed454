//! Prioritized experience replay.
mod iw_scheduler;
mod sum_tree;
pub use iw_scheduler::IwScheduler;
pub use sum_tree::SumTree;

use super::{
    BatchBase, PriorityMode, PrioritizedReplayBufferConfig, ReplayBuffer, TransitionBatch,
};
use crate::{error::ReplayError, ExperienceBufferBase, ReplayBufferBase};
use anyhow::Result;
use log::warn;
use rand::Rng;
use std::cmp::Ordering;

/// Per-mode priority bookkeeping, rebuilt on `reset`.
enum PriorityState {
    Proportional {
        tree: SumTree,
    },
    Rank {
        priorities: Vec<f32>,
        max_priority: f32,
        /// Descending order over the valid range; `None` marks it stale.
        sorted: Option<Vec<usize>>,
    },
}

impl PriorityState {
    fn build(config: &PrioritizedReplayBufferConfig) -> Self {
        match config.per.mode {
            PriorityMode::Proportional => PriorityState::Proportional {
                tree: SumTree::new(config.base.capacity),
            },
            PriorityMode::Rank => PriorityState::Rank {
                priorities: vec![0f32; config.base.capacity],
                max_priority: 0f32,
                sorted: None,
            },
        }
    }
}

fn sort_descending(ps: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..ps.len()).collect();
    order.sort_by(|&a, &b| ps[b].partial_cmp(&ps[a]).unwrap_or(Ordering::Equal));
    order
}

/// A replay buffer with priority-weighted sampling and bias correction.
///
/// Wraps a [`ReplayBuffer`] for storage and adds per-slot priorities in one
/// of two strategies: `proportional` resolves stratified draws through a
/// [`SumTree`]; `rank` samples ranks from a power law over a lazily sorted
/// priority array. Sampled batches carry importance-sampling weights
/// normalized by their own maximum, and the indices needed to feed TD
/// errors back through [`update_priorities`](Self::update_priorities).
pub struct PrioritizedReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    config: PrioritizedReplayBufferConfig,
    inner: ReplayBuffer<O, A>,
    state: PriorityState,
    scheduler: IwScheduler,
}

impl<O, A> PrioritizedReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    /// Monotonic number of transitions ever pushed.
    pub fn counter(&self) -> usize {
        self.inner.counter()
    }

    /// Maximum number of stored transitions.
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// The configuration this buffer was built from.
    pub fn config(&self) -> &PrioritizedReplayBufferConfig {
        &self.config
    }

    /// The prioritization strategy in use.
    pub fn mode(&self) -> PriorityMode {
        self.config.per.mode
    }

    /// Current value of the importance-sampling exponent.
    pub fn beta(&self) -> f32 {
        self.scheduler.beta()
    }

    /// Gathers the transitions at `ixs` without sampling.
    pub fn lookup(&self, ixs: &Vec<usize>) -> TransitionBatch<O, A> {
        self.inner.lookup(ixs)
    }

    /// The stored priority of slot `ix`, after floor and exponentiation.
    pub fn priority(&self, ix: usize) -> f32 {
        match &self.state {
            PriorityState::Proportional { tree } => tree.priority(ix),
            PriorityState::Rank { priorities, .. } => priorities[ix],
        }
    }

    /// Anneals the importance-sampling exponent to the caller's
    /// optimization step.
    pub fn update_beta(&mut self, n_opts: usize) {
        self.scheduler.set_n_opts(n_opts);
    }

    /// Replaces the stored priorities of the transitions at `ixs`.
    ///
    /// Each priority becomes `max(|p|, epsilon).powf(alpha)`. NaN inputs
    /// are replaced with `1.0` before the floor and exponent are applied;
    /// the condition is logged as a warning and training continues, since
    /// halting on a transient NaN is worse than one mis-weighted sample.
    pub fn update_priorities(&mut self, ixs: &[usize], priorities: &[f32]) {
        debug_assert_eq!(ixs.len(), priorities.len());
        let alpha = self.config.per.alpha;
        let epsilon = self.config.per.epsilon;

        let n_nan = priorities.iter().filter(|p| p.is_nan()).count();
        if n_nan > 0 {
            warn!("found {} NaN values in priorities, replacing with 1.0", n_nan);
        }
        let ps = priorities
            .iter()
            .map(|p| if p.is_nan() { 1f32 } else { *p })
            .map(|p| p.abs().max(epsilon).powf(alpha))
            .collect::<Vec<_>>();

        match &mut self.state {
            PriorityState::Proportional { tree } => tree.update(ixs, &ps),
            PriorityState::Rank {
                priorities: store,
                max_priority,
                sorted,
            } => {
                for (&ix, &p) in ixs.iter().zip(ps.iter()) {
                    store[ix] = p;
                    if p > *max_priority {
                        *max_priority = p;
                    }
                }
                *sorted = None;
            }
        }
    }

    /// Clears stored transitions, priorities and the annealing state.
    pub fn reset(&mut self) {
        self.inner.reset();
        self.state = PriorityState::build(&self.config);
        self.scheduler.set_n_opts(0);
    }

    /// A new empty buffer with the same configuration.
    pub fn clone_empty(&self) -> Self {
        Self::build(&self.config)
    }

    /// Seeds the slots just written at `[start, start + n)` (mod capacity)
    /// with `max(max_priority, 1.0).powf(alpha)`, so fresh transitions are
    /// sampled at least once before TD feedback down-weights them.
    fn seed_priorities(&mut self, start: usize, n: usize) {
        let alpha = self.config.per.alpha;
        let capacity = self.inner.capacity();
        let ixs = (0..n).map(|j| (start + j) % capacity).collect::<Vec<_>>();

        match &mut self.state {
            PriorityState::Proportional { tree } => {
                let p = tree.max_priority().max(1f32).powf(alpha);
                let ps = vec![p; ixs.len()];
                tree.update(&ixs, &ps);
            }
            PriorityState::Rank {
                priorities,
                max_priority,
                sorted,
            } => {
                let p = max_priority.max(1f32).powf(alpha);
                for &ix in ixs.iter() {
                    priorities[ix] = p;
                }
                if p > *max_priority {
                    *max_priority = p;
                }
                *sorted = None;
            }
        }
    }
}

impl<O, A> ExperienceBufferBase for PrioritizedReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type Item = TransitionBatch<O, A>;

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        let len = tr.len();
        let start = self.inner.counter() % self.inner.capacity();
        self.inner.push(tr)?;
        self.seed_priorities(start, len);
        Ok(())
    }
}

impl<O, A> ReplayBufferBase for PrioritizedReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type Config = PrioritizedReplayBufferConfig;
    type Batch = TransitionBatch<O, A>;

    fn build(config: &Self::Config) -> Self {
        assert!(config.per.alpha > 0f32, "priority exponent alpha must be positive");
        assert!(config.per.epsilon > 0f32, "priority floor epsilon must be positive");
        assert!(config.per.n_opts_final > 0, "beta annealing length must be positive");

        Self {
            inner: ReplayBuffer::build(&config.base),
            state: PriorityState::build(config),
            scheduler: IwScheduler::new(
                config.per.beta_0,
                config.per.beta_final,
                config.per.n_opts_final,
            ),
            config: config.clone(),
        }
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        let n = self.inner.len();
        if n == 0 {
            return Err(ReplayError::EmptyBuffer.into());
        }
        let size = size.min(n);
        let beta = self.scheduler.beta();
        let alpha = self.config.per.alpha;
        let epsilon = self.config.per.epsilon;

        let (ixs, mut ws) = match &mut self.state {
            PriorityState::Proportional { tree } => {
                // stratified draws: one uniform value per equal segment of
                // the priority mass
                let total = tree.total();
                let segment = total / size as f32;
                let mut ixs = Vec::with_capacity(size);
                let mut ws = Vec::with_capacity(size);
                for i in 0..size {
                    let p = segment * (i as f32 + self.inner.rng().gen::<f32>());
                    let (ix, priority) = tree.get(p);
                    let prob = priority / total + epsilon;
                    ixs.push(ix);
                    ws.push((n as f32 * prob).powf(-beta));
                }
                (ixs, ws)
            }
            PriorityState::Rank {
                priorities, sorted, ..
            } => {
                let order = sorted.get_or_insert_with(|| sort_descending(&priorities[..n]));

                let mut ixs = Vec::with_capacity(size);
                let mut ws = Vec::with_capacity(size);
                for _ in 0..size {
                    // inverse-transform draw of a power-law rank
                    let u = self.inner.rng().gen::<f32>();
                    let rank = ((u.powf(1f32 / alpha) * n as f32) as usize).min(n - 1);
                    let prob = 1f32 / ((rank + 1) as f32).powf(alpha);
                    ixs.push(order[rank]);
                    ws.push((n as f32 * prob).powf(-beta));
                }
                (ixs, ws)
            }
        };

        // normalize by the batch maximum so the largest weight is exactly one
        let w_max = ws.iter().fold(0f32, |m, &w| w.max(m));
        if w_max > 0f32 {
            for w in ws.iter_mut() {
                *w /= w_max;
            }
        }

        let mut batch = self.inner.lookup(&ixs);
        batch.weight = Some(ws);
        Ok(batch)
    }

    fn update_priority(&mut self, ixs: &Option<Vec<usize>>, td_errs: &Option<Vec<f32>>) {
        let ixs = ixs
            .as_ref()
            .expect("ixs should be Some(_) in update_priority()");
        let td_errs = td_errs
            .as_ref()
            .expect("td_errs should be Some(_) in update_priority()");
        self.update_priorities(ixs, td_errs);
    }
}
