//! Column storage for transition batches.

/// A column of batch data.
///
/// A replay buffer keeps one column per transition field (observations,
/// actions, goals). Pushes wrap around the column's capacity, so the buffer
/// can hand a whole batch to the column and let it split the write at the
/// end of the array.
pub trait BatchBase {
    /// Builds an empty column with a capacity.
    fn new(capacity: usize) -> Self;

    /// Pushes the rows in `data`, starting at `index` and wrapping around.
    fn push(&mut self, index: usize, data: &Self);

    /// Gathers the rows at `ixs` into a new column.
    fn sample(&self, ixs: &Vec<usize>) -> Self;

    /// Zeroes the column in place.
    fn reset(&mut self);
}

/// A column of dense `f32` rows backed by a flat vector.
///
/// The row width is learned from the first pushed data; until then the
/// column holds no storage. This lets a buffer be built from its capacity
/// alone, with the environment's shape descriptors flowing in through the
/// first transition.
#[derive(Debug, Clone, Default)]
pub struct ArrayBatch {
    capacity: usize,
    dim: Option<usize>,
    data: Vec<f32>,
}

impl ArrayBatch {
    /// Builds a column from rows, all of the same width.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Self {
        let dim = rows.first().map(|r| r.as_ref().len());
        let mut data = Vec::new();
        for r in rows.iter() {
            debug_assert_eq!(Some(r.as_ref().len()), dim);
            data.extend_from_slice(r.as_ref());
        }
        Self {
            capacity: rows.len(),
            dim,
            data,
        }
    }

    /// Builds a column from a flat row-major vector of `len / dim` rows.
    pub fn from_flat(data: Vec<f32>, dim: usize) -> Self {
        assert!(dim > 0 && data.len() % dim == 0);
        Self {
            capacity: data.len() / dim,
            dim: Some(dim),
            data,
        }
    }

    /// Number of rows the column can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Row width, once any data has been pushed.
    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    /// The `ix`-th row.
    pub fn row(&self, ix: usize) -> &[f32] {
        let dim = self.dim.expect("row access on a column that has no data");
        &self.data[ix * dim..(ix + 1) * dim]
    }

    /// Flat row-major view of the column.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

impl BatchBase for ArrayBatch {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            dim: None,
            data: Vec::new(),
        }
    }

    fn push(&mut self, index: usize, data: &Self) {
        let (dim, rows) = match data.dim {
            Some(dim) if data.capacity > 0 => (dim, data.capacity),
            _ => return,
        };

        if self.dim.is_none() {
            self.dim = Some(dim);
            self.data = vec![0f32; self.capacity * dim];
        }
        debug_assert_eq!(self.dim, Some(dim));

        for r in 0..rows {
            let i = (index + r) % self.capacity;
            self.data[i * dim..(i + 1) * dim]
                .copy_from_slice(&data.data[r * dim..(r + 1) * dim]);
        }
    }

    fn sample(&self, ixs: &Vec<usize>) -> Self {
        let dim = self.dim.expect("sampling from a column that has no data");
        let mut data = Vec::with_capacity(ixs.len() * dim);
        for &ix in ixs.iter() {
            data.extend_from_slice(&self.data[ix * dim..(ix + 1) * dim]);
        }
        Self {
            capacity: ixs.len(),
            dim: Some(dim),
            data,
        }
    }

    fn reset(&mut self) {
        for v in self.data.iter_mut() {
            *v = 0f32;
        }
    }
}

/// The goal triple attached to goal-conditioned transitions.
#[derive(Debug, Clone)]
pub struct GoalBatch<G> {
    /// Goal achieved in the current state.
    pub achieved: G,

    /// Goal achieved in the next state.
    pub next_achieved: G,

    /// Goal the transition is conditioned on.
    pub desired: G,
}

/// A batch of transitions `(o_t, a_t, r_t, o_t+1, done_t)`, optionally
/// extended with the goal triple used by hindsight relabeling.
///
/// The same type is pushed into buffers (a batch of new transitions) and
/// returned from sampling (with `ix_sample`, and `weight` when the buffer
/// is prioritized).
#[derive(Debug)]
pub struct TransitionBatch<O, A> {
    /// Observations `o_t`.
    pub obs: O,

    /// Actions `a_t`.
    pub act: A,

    /// Next observations `o_t+1`.
    pub next_obs: O,

    /// Rewards `r_t`.
    pub reward: Vec<f32>,

    /// Episode-done flags.
    pub done: Vec<i8>,

    /// Goal triple, present iff the buffer is goal-shaped.
    pub goals: Option<GoalBatch<O>>,

    /// Importance-sampling weights attached by prioritized sampling.
    pub weight: Option<Vec<f32>>,

    /// Indices of the sampled transitions.
    pub ix_sample: Option<Vec<usize>>,
}

impl<O, A> TransitionBatch<O, A> {
    /// Builds a plain batch without goals, weights or indices.
    pub fn new(obs: O, act: A, next_obs: O, reward: Vec<f32>, done: Vec<i8>) -> Self {
        debug_assert_eq!(reward.len(), done.len());
        Self {
            obs,
            act,
            next_obs,
            reward,
            done,
            goals: None,
            weight: None,
            ix_sample: None,
        }
    }

    /// Attaches a goal triple.
    pub fn with_goals(mut self, goals: GoalBatch<O>) -> Self {
        self.goals = Some(goals);
        self
    }

    /// Returns the number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.reward.len()
    }

    /// Returns `true` if the batch holds no transitions.
    pub fn is_empty(&self) -> bool {
        self.reward.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{ArrayBatch, BatchBase};

    #[test]
    fn test_lazy_dim() {
        let mut col = ArrayBatch::new(4);
        assert_eq!(col.dim(), None);

        col.push(0, &ArrayBatch::from_rows(&[vec![1f32, 2.0]]));
        assert_eq!(col.dim(), Some(2));
        assert_eq!(col.row(0), &[1f32, 2.0]);
        assert_eq!(col.row(1), &[0f32, 0.0]);
    }

    #[test]
    fn test_push_wraps_around() {
        let mut col = ArrayBatch::new(3);
        let data = ArrayBatch::from_rows(&[vec![1f32], vec![2f32], vec![3f32], vec![4f32]]);
        col.push(2, &data);

        // rows land at slots 2, 0, 1, 2; the last write wins
        assert_eq!(col.row(0), &[2f32]);
        assert_eq!(col.row(1), &[3f32]);
        assert_eq!(col.row(2), &[4f32]);
    }

    #[test]
    fn test_sample_gathers_rows() {
        let col = ArrayBatch::from_flat(vec![0f32, 1.0, 2.0, 3.0, 4.0, 5.0], 2);
        let s = col.sample(&vec![2, 0, 2]);
        assert_eq!(s.capacity(), 3);
        assert_eq!(s.as_slice(), &[4f32, 5.0, 0.0, 1.0, 4.0, 5.0]);
    }

    #[test]
    fn test_reset_keeps_shape() {
        let mut col = ArrayBatch::from_flat(vec![1f32, 2.0, 3.0, 4.0], 2);
        col.reset();
        assert_eq!(col.dim(), Some(2));
        assert_eq!(col.as_slice(), &[0f32, 0.0, 0.0, 0.0]);
    }
}
