//! Sum tree for prioritized sampling.
//!
//! Code is adapted from https://github.com/jaromiru/AI-blog/blob/master/SumTree.py and
//! https://github.com/openai/baselines/blob/master/baselines/deepq/replay_buffer.py
use crate::ApexError;
use segment_tree::{ops::MaxIgnoreNaN, SegmentPoint};

/// A complete binary tree over fixed-capacity leaf slots storing scalar
/// priorities.
///
/// Internal nodes hold the sum of their children, so the total priority is
/// available in O(1) at the root, while point update and prefix-sum
/// sampling both take O(log capacity). Leaf `s` lives at array index
/// `s + capacity - 1`.
///
/// The tree stores priorities as given; exponents and epsilons are applied
/// by the replay buffer before they reach the tree.
#[derive(Debug)]
pub struct PriorityTree {
    capacity: usize,
    tree: Vec<f32>,
    max_tree: SegmentPoint<f32, MaxIgnoreNaN>,
    priority_ceiling: f32,
}

impl PriorityTree {
    /// Creates a tree with all leaf priorities at zero.
    ///
    /// `priority_ceiling` bounds the bootstrap priority reported by
    /// [`Self::max_priority`], so that one early outlier cannot dominate
    /// sampling for the lifetime of the buffer.
    pub fn new(capacity: usize, priority_ceiling: f32) -> Self {
        assert!(capacity > 0, "priority tree capacity must be positive");
        Self {
            capacity,
            tree: vec![0f32; 2 * capacity - 1],
            max_tree: SegmentPoint::build(vec![0f32; capacity], MaxIgnoreNaN),
            priority_ceiling,
        }
    }

    /// The number of leaf slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sum of all leaf priorities.
    pub fn total_priority(&self) -> f32 {
        self.tree[0]
    }

    /// Priority currently stored at `slot`.
    pub fn priority(&self, slot: usize) -> Result<f32, ApexError> {
        self.check_slot(slot)?;
        Ok(self.tree[slot + self.capacity - 1])
    }

    /// Bootstrap priority for freshly inserted experience.
    ///
    /// The maximum priority currently stored in any slot, floored at 1 so
    /// that the very first insert is sampled at all, and clamped by the
    /// configured ceiling.
    pub fn max_priority(&self) -> f32 {
        let max = self.max_tree.query(0, self.capacity);
        max.max(1.0).min(self.priority_ceiling)
    }

    /// Sets the priority of `slot` and propagates the change to the root.
    pub fn update(&mut self, slot: usize, priority: f32) -> Result<(), ApexError> {
        self.check_slot(slot)?;
        debug_assert!(priority >= 0.0 && !priority.is_nan());

        self.max_tree.modify(slot, priority);

        let mut ix = slot + self.capacity - 1;
        let delta = priority - self.tree[ix];
        self.tree[ix] = priority;
        while ix > 0 {
            ix = (ix - 1) / 2;
            self.tree[ix] += delta;
        }

        Ok(())
    }

    /// Walks from the root to the leaf whose cumulative priority range
    /// contains `target`, returning the slot and its priority.
    ///
    /// At each internal node the walk descends into the left child if
    /// `target` is below the left child's value, otherwise it subtracts
    /// that value and descends right; a zero-valued right child forces the
    /// walk left so that rounding never lands on an empty slot. `target`
    /// must lie in `[0, total_priority())`; the caller clamps.
    ///
    /// This walk is the hot path of sampling: it is iterative and does not
    /// allocate.
    pub fn sample_by_mass(&self, target: f32) -> (usize, f32) {
        debug_assert!(target >= 0.0 && target < self.total_priority());

        let mut target = target;
        let mut ix = 0;
        loop {
            let left = 2 * ix + 1;
            if left >= self.tree.len() {
                break;
            }
            let left_value = self.tree[left];
            if target < left_value || self.tree[left + 1] == 0f32 {
                ix = left;
            } else {
                target -= left_value;
                ix = left + 1;
            }
        }

        (ix + 1 - self.capacity, self.tree[ix])
    }

    fn check_slot(&self, slot: usize) -> Result<(), ApexError> {
        if slot >= self.capacity {
            Err(ApexError::InvalidSlot {
                slot,
                capacity: self.capacity,
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PriorityTree;
    use crate::ApexError;

    fn leaf_sum(tree: &PriorityTree) -> f32 {
        (0..tree.capacity())
            .map(|s| tree.priority(s).unwrap())
            .sum()
    }

    #[test]
    fn invariant_root_equals_leaf_sum() {
        let mut tree = PriorityTree::new(8, f32::MAX);
        let priorities = [0.5f32, 0.2, 0.8, 0.3, 1.1, 2.5, 3.9, 0.0];
        for (slot, &p) in priorities.iter().enumerate() {
            tree.update(slot, p).unwrap();
            assert!((tree.total_priority() - leaf_sum(&tree)).abs() < 1e-5);
        }

        // Point updates keep the invariant as well.
        tree.update(3, 7.0).unwrap();
        assert!((tree.total_priority() - leaf_sum(&tree)).abs() < 1e-5);
        tree.update(3, 0.0).unwrap();
        assert!((tree.total_priority() - leaf_sum(&tree)).abs() < 1e-5);
    }

    #[test]
    fn sample_by_mass_walk() {
        let mut tree = PriorityTree::new(4, f32::MAX);
        for slot in 0..4 {
            tree.update(slot, 1.0).unwrap();
        }
        assert_eq!(tree.total_priority(), 4.0);
        assert_eq!(tree.sample_by_mass(3.5).0, 3);

        tree.update(1, 5.0).unwrap();
        assert_eq!(tree.total_priority(), 8.0);
        assert_eq!(tree.sample_by_mass(3.5).0, 1);
    }

    #[test]
    fn sample_by_mass_returns_containing_range() {
        let mut tree = PriorityTree::new(8, f32::MAX);
        let priorities = [0.5f32, 0.2, 0.8, 0.3, 1.1, 2.5, 3.9, 0.0];
        for (slot, &p) in priorities.iter().enumerate() {
            tree.update(slot, p).unwrap();
        }

        let total = tree.total_priority();
        let mut m = 0f32;
        while m < total {
            let (slot, priority) = tree.sample_by_mass(m);
            let lower: f32 = priorities[..slot].iter().sum();
            // Tolerance absorbs float error at segment boundaries.
            assert!(
                m >= lower - 1e-4 && m < lower + priority + 1e-4,
                "mass {} at slot {}",
                m,
                slot
            );
            m += 0.05;
        }
    }

    #[test]
    fn zero_mass_returns_leftmost_nonzero_leaf() {
        let mut tree = PriorityTree::new(4, f32::MAX);
        tree.update(1, 2.0).unwrap();
        tree.update(2, 1.0).unwrap();
        tree.update(3, 1.0).unwrap();
        assert_eq!(tree.sample_by_mass(0.0).0, 1);
    }

    #[test]
    fn invalid_slot() {
        let mut tree = PriorityTree::new(4, f32::MAX);
        assert_eq!(
            tree.update(4, 1.0),
            Err(ApexError::InvalidSlot {
                slot: 4,
                capacity: 4
            })
        );
    }

    #[test]
    fn bootstrap_priority_is_clamped() {
        let mut tree = PriorityTree::new(4, 10.0);
        assert_eq!(tree.max_priority(), 1.0);

        tree.update(0, 3.0).unwrap();
        assert_eq!(tree.max_priority(), 3.0);

        tree.update(1, 1e6).unwrap();
        assert_eq!(tree.max_priority(), 10.0);

        // The outlier ages out when its slot is overwritten.
        tree.update(1, 0.5).unwrap();
        assert_eq!(tree.max_priority(), 3.0);
    }
}
