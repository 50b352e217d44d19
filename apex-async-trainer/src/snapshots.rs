//! Distribution of weight snapshots from the learner to its consumers.
use apex_core::WeightSnapshot;
use std::sync::{Arc, Mutex};

/// Shared cell holding the most recently published weight snapshot.
///
/// The learner publishes into the cell; workers and the evaluation loop
/// pull from it on their own schedule and work on clones, so a slow
/// consumer never delays publication or other consumers. Handles are
/// cheap to clone and all point at the same cell.
#[derive(Clone, Default)]
pub struct SnapshotCell {
    inner: Arc<Mutex<Option<WeightSnapshot>>>,
}

impl SnapshotCell {
    /// Creates an empty cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the published snapshot.
    pub fn publish(&self, snapshot: WeightSnapshot) {
        *self.inner.lock().unwrap() = Some(snapshot);
    }

    /// A clone of the latest snapshot, if one has been published.
    pub fn latest(&self) -> Option<WeightSnapshot> {
        self.inner.lock().unwrap().clone()
    }

    /// A clone of the latest snapshot, but only if it is newer than
    /// `version`; lets consumers skip snapshots they already hold.
    pub fn latest_after(&self, version: u64) -> Option<WeightSnapshot> {
        self.inner
            .lock()
            .unwrap()
            .as_ref()
            .filter(|s| s.version() > version)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::SnapshotCell;
    use apex_core::WeightSnapshot;

    #[test]
    fn publish_and_pull() {
        let cell = SnapshotCell::new();
        assert!(cell.latest().is_none());

        cell.publish(WeightSnapshot::new(1, vec![1, 2]));
        assert_eq!(cell.latest().unwrap().version(), 1);
        assert!(cell.latest_after(1).is_none());

        cell.publish(WeightSnapshot::new(2, vec![3, 4]));
        assert_eq!(cell.latest_after(1).unwrap().version(), 2);
    }
}
