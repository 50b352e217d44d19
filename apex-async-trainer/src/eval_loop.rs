//! Background scoring of published weight snapshots.
use anyhow::Result;
use apex_core::{Environment, SnapshotEvaluator, TrainableModel};
use log::{info, warn};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::SnapshotCell;

/// Polls the snapshot cell and scores each new version it sees.
///
/// Runs on its own thread with its own model and environment. Publication
/// outpacing evaluation is fine, intermediate versions are simply skipped.
/// On stop the loop scores one last time before returning, so a snapshot
/// published at the very end of training still gets a verdict.
pub struct EvalLoop<M, E>
where
    M: TrainableModel,
    E: Environment<State = M::State, Action = M::Action>,
{
    evaluator: SnapshotEvaluator<M, E>,
    snapshots: SnapshotCell,
    poll_interval: Duration,
    stop: Arc<Mutex<bool>>,
    last_version: u64,
}

impl<M, E> EvalLoop<M, E>
where
    M: TrainableModel,
    E: Environment<State = M::State, Action = M::Action>,
{
    /// Builds an evaluation loop polling `snapshots` every `poll_interval`.
    pub fn new(
        evaluator: SnapshotEvaluator<M, E>,
        snapshots: SnapshotCell,
        poll_interval: Duration,
        stop: Arc<Mutex<bool>>,
    ) -> Self {
        Self {
            evaluator,
            snapshots,
            poll_interval,
            stop,
            last_version: 0,
        }
    }

    /// Runs until the stop flag is set.
    ///
    /// A scoring failure is logged and the snapshot skipped; the loop
    /// keeps going, so one bad evaluation episode never loses the best
    /// snapshot seen elsewhere.
    pub fn run(mut self) -> Result<()> {
        loop {
            self.score_outstanding();
            if *self.stop.lock().unwrap() {
                break;
            }
            std::thread::sleep(self.poll_interval);
        }
        info!("stopped evaluation loop");
        Ok(())
    }

    fn score_outstanding(&mut self) {
        if let Some(snapshot) = self.snapshots.latest_after(self.last_version) {
            self.last_version = snapshot.version();
            match self.evaluator.score_snapshot(&snapshot) {
                Ok(score) => info!("snapshot v{} scored {}", snapshot.version(), score),
                Err(e) => warn!("evaluation of snapshot v{} failed: {}", snapshot.version(), e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EvalLoop;
    use crate::SnapshotCell;
    use apex_core::{
        dummy::{DummyModel, DummyModelConfig, LineEnv, LineEnvConfig},
        BestSnapshot, Configurable, Environment, SnapshotEvaluator, WeightSnapshot,
    };
    use std::{
        sync::{Arc, Mutex},
        thread,
        time::Duration,
    };

    #[test]
    fn scores_the_final_snapshot_before_stopping() {
        let model = DummyModel::build(DummyModelConfig::default());
        let env = LineEnv::build(&LineEnvConfig::default(), 0).unwrap();
        let best = BestSnapshot::new();
        let evaluator = SnapshotEvaluator::new(model, env, 1, best.clone());

        let snapshots = SnapshotCell::new();
        let stop = Arc::new(Mutex::new(false));
        let eval_loop = EvalLoop::new(
            evaluator,
            snapshots.clone(),
            Duration::from_millis(1),
            stop.clone(),
        );
        let handle = thread::spawn(move || eval_loop.run());

        snapshots.publish(WeightSnapshot::new(1, 0.5f32.to_le_bytes().to_vec()));
        thread::sleep(Duration::from_millis(20));
        snapshots.publish(WeightSnapshot::new(2, 0.9f32.to_le_bytes().to_vec()));
        *stop.lock().unwrap() = true;
        handle.join().unwrap().unwrap();

        // Both the early and the last-published snapshot were scored.
        assert!(best.score().is_some());
        assert!(best.snapshot().unwrap().version() >= 1);
    }
}
