//! Uniform replay buffer with circular storage.
use super::{BatchBase, GoalBatch, ReplayBufferConfig, TransitionBatch};
use crate::{error::ReplayError, ExperienceBufferBase, ReplayBufferBase};
use anyhow::Result;
use rand::{rngs::StdRng, RngCore, SeedableRng};

/// A fixed-capacity circular replay buffer with uniform sampling.
///
/// Transitions are stored column-wise. The write cursor `counter` grows
/// monotonically; the physical slot of the next write is
/// `counter % capacity`, so once the buffer is full every push evicts the
/// oldest surviving transition.
pub struct ReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    config: ReplayBufferConfig,
    capacity: usize,
    counter: usize,
    obs: O,
    act: A,
    next_obs: O,
    reward: Vec<f32>,
    done: Vec<i8>,
    goals: Option<GoalBatch<O>>,
    rng: StdRng,
}

impl<O, A> ReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    #[inline]
    fn push_reward(&mut self, i: usize, b: &[f32]) {
        let mut j = i;
        for r in b.iter() {
            self.reward[j] = *r;
            j += 1;
            if j == self.capacity {
                j = 0;
            }
        }
    }

    #[inline]
    fn push_done(&mut self, i: usize, b: &[i8]) {
        let mut j = i;
        for d in b.iter() {
            self.done[j] = *d;
            j += 1;
            if j == self.capacity {
                j = 0;
            }
        }
    }

    fn sample_reward(&self, ixs: &Vec<usize>) -> Vec<f32> {
        ixs.iter().map(|ix| self.reward[*ix]).collect()
    }

    fn sample_done(&self, ixs: &Vec<usize>) -> Vec<i8> {
        ixs.iter().map(|ix| self.done[*ix]).collect()
    }

    /// Monotonic number of transitions ever pushed. The physical slot of the
    /// next write is `counter() % capacity()`.
    pub fn counter(&self) -> usize {
        self.counter
    }

    /// Maximum number of stored transitions.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the buffer carries goal columns.
    pub fn has_goals(&self) -> bool {
        self.goals.is_some()
    }

    /// The configuration this buffer was built from.
    pub fn config(&self) -> &ReplayBufferConfig {
        &self.config
    }

    /// Gathers the transitions at `ixs` without sampling.
    ///
    /// Useful for inspection and for post-processing passes that need
    /// specific slots rather than a random batch.
    pub fn lookup(&self, ixs: &Vec<usize>) -> TransitionBatch<O, A> {
        TransitionBatch {
            obs: self.obs.sample(ixs),
            act: self.act.sample(ixs),
            next_obs: self.next_obs.sample(ixs),
            reward: self.sample_reward(ixs),
            done: self.sample_done(ixs),
            goals: self.goals.as_ref().map(|g| GoalBatch {
                achieved: g.achieved.sample(ixs),
                next_achieved: g.next_achieved.sample(ixs),
                desired: g.desired.sample(ixs),
            }),
            weight: None,
            ix_sample: Some(ixs.clone()),
        }
    }

    /// Sum of all rewards currently in the storage.
    pub fn sum_rewards(&self) -> f32 {
        self.reward.iter().sum()
    }

    /// Number of done flags currently set in the storage.
    pub fn num_done_flags(&self) -> usize {
        self.done.iter().map(|d| *d as usize).sum()
    }

    /// Zeroes the storage and rewinds the write cursor.
    ///
    /// Used between independent runs, never mid-training.
    pub fn reset(&mut self) {
        self.obs.reset();
        self.act.reset();
        self.next_obs.reset();
        for r in self.reward.iter_mut() {
            *r = 0f32;
        }
        for d in self.done.iter_mut() {
            *d = 0;
        }
        if let Some(g) = self.goals.as_mut() {
            g.achieved.reset();
            g.next_achieved.reset();
            g.desired.reset();
        }
        self.counter = 0;
    }

    /// A new empty buffer with the same configuration.
    pub fn clone_empty(&self) -> Self {
        Self::build(&self.config)
    }

    pub(crate) fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

impl<O, A> ExperienceBufferBase for ReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type Item = TransitionBatch<O, A>;

    fn len(&self) -> usize {
        self.counter.min(self.capacity)
    }

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        if self.goals.is_some() && tr.goals.is_none() {
            return Err(ReplayError::MissingGoalData.into());
        }
        if self.goals.is_none() && tr.goals.is_some() {
            return Err(ReplayError::UnexpectedGoalData.into());
        }

        let len = tr.len();
        let i = self.counter % self.capacity;
        self.obs.push(i, &tr.obs);
        self.act.push(i, &tr.act);
        self.next_obs.push(i, &tr.next_obs);
        self.push_reward(i, &tr.reward);
        self.push_done(i, &tr.done);
        if let Some(cols) = self.goals.as_mut() {
            let g = tr.goals.as_ref().expect("goal presence checked above");
            cols.achieved.push(i, &g.achieved);
            cols.next_achieved.push(i, &g.next_achieved);
            cols.desired.push(i, &g.desired);
        }

        self.counter += len;
        Ok(())
    }
}

impl<O, A> ReplayBufferBase for ReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type Config = ReplayBufferConfig;
    type Batch = TransitionBatch<O, A>;

    fn build(config: &Self::Config) -> Self {
        assert!(config.capacity > 0, "replay buffer capacity must be positive");
        let capacity = config.capacity;
        let goals = config.goal_shape.as_ref().map(|_| GoalBatch {
            achieved: O::new(capacity),
            next_achieved: O::new(capacity),
            desired: O::new(capacity),
        });

        Self {
            config: config.clone(),
            capacity,
            counter: 0,
            obs: O::new(capacity),
            act: A::new(capacity),
            next_obs: O::new(capacity),
            reward: vec![0f32; capacity],
            done: vec![0; capacity],
            goals,
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        let n = self.len();
        if n == 0 {
            return Err(ReplayError::EmptyBuffer.into());
        }

        // with replacement, so `size` may exceed the stored count
        let ixs = (0..size)
            .map(|_| (self.rng.next_u32() as usize) % n)
            .collect::<Vec<_>>();

        Ok(self.lookup(&ixs))
    }

    fn update_priority(&mut self, _ixs: &Option<Vec<usize>>, _td_errs: &Option<Vec<f32>>) {}
}
