//! Sum tree for proportional prioritized sampling.
use log::warn;
use std::collections::BTreeMap;

/// A complete binary tree over leaf priorities, supporting O(log n) point
/// updates and O(log n) priority-to-leaf retrieval.
///
/// The tree is a flat array of `2 * capacity - 1` nodes; the leaf of buffer
/// slot `ix` lives at `ix + capacity - 1` and every internal node holds the
/// sum of its two children, so the root is the total priority mass.
#[derive(Debug)]
pub struct SumTree {
    capacity: usize,
    tree: Vec<f32>,
    max_priority: f32,
}

impl SumTree {
    /// Creates a tree with all leaf priorities at zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "sum tree capacity must be positive");
        Self {
            capacity,
            tree: vec![0f32; 2 * capacity - 1],
            max_priority: 0f32,
        }
    }

    /// Number of leaves.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total priority mass, stored at the root.
    pub fn total(&self) -> f32 {
        self.tree[0]
    }

    /// The largest priority ever written. Never decreases.
    pub fn max_priority(&self) -> f32 {
        self.max_priority
    }

    /// The stored priority of leaf `ix`.
    pub fn priority(&self, ix: usize) -> f32 {
        self.tree[ix + self.capacity - 1]
    }

    /// Sets the leaves at `ixs` to `ps` and repairs every partial sum.
    ///
    /// Ancestors shared by several updated leaves accumulate the sum of
    /// their deltas and are written once. A NaN priority is replaced with
    /// `1.0` and reported with a warning; it signals an unstable upstream
    /// loss, not a structural fault.
    pub fn update(&mut self, ixs: &[usize], ps: &[f32]) {
        debug_assert_eq!(ixs.len(), ps.len());

        let mut deltas: BTreeMap<usize, f32> = BTreeMap::new();
        let mut n_nan = 0;
        for (&ix, &p) in ixs.iter().zip(ps.iter()) {
            debug_assert!(ix < self.capacity);
            let p = if p.is_nan() {
                n_nan += 1;
                1f32
            } else {
                p
            };

            let leaf = ix + self.capacity - 1;
            let change = p - self.tree[leaf];
            self.tree[leaf] = p;
            if p > self.max_priority {
                self.max_priority = p;
            }

            let mut node = leaf;
            while node != 0 {
                node = (node - 1) / 2;
                *deltas.entry(node).or_insert(0f32) += change;
            }
        }

        if n_nan > 0 {
            warn!("replaced {} NaN priorities with 1.0 in sum tree update", n_nan);
        }

        for (node, change) in deltas {
            self.tree[node] += change;
        }
    }

    /// Finds the leaf holding the cumulative priority `p` in `[0, total())`.
    ///
    /// Descends from the root: left when `p` fits into the left subtree,
    /// otherwise right with the left mass subtracted. Returns the data index
    /// of the leaf and its stored priority. The result is unspecified on an
    /// all-zero tree; callers must not sample before any priority is set.
    pub fn get(&self, p: f32) -> (usize, f32) {
        let ix = self.retrieve(0, p);
        (ix + 1 - self.capacity, self.tree[ix])
    }

    fn retrieve(&self, ix: usize, p: f32) -> usize {
        let left = 2 * ix + 1;
        let right = left + 1;

        if left >= self.tree.len() {
            return ix;
        }

        // the right-subtree-zero guard absorbs float drift at the top end
        if p <= self.tree[left] || self.tree[right] == 0f32 {
            self.retrieve(left, p)
        } else {
            self.retrieve(right, p - self.tree[left])
        }
    }
}
