use crate::{MergeMessage, SnapshotCell, WorkerStat};
use anyhow::Result;
use apex_core::{Environment, Experience, LocalBuffer, TrainableModel};
use crossbeam_channel::Sender;
use log::{debug, info, warn};
use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

/// Runs interaction between a policy and an environment, taking samples.
///
/// A worker owns its environment and a read-mostly copy of the policy. It
/// alternates between two states: collecting one episode into its
/// [`LocalBuffer`], then merging that buffer into the learner's replay
/// buffer and, every `sync_every` merges, pulling the latest published
/// weights. Workers never block on each other; a slow worker only delays
/// its own next merge.
pub struct Worker<M, E>
where
    M: TrainableModel,
    E: Environment<State = M::State, Action = M::Action>,
{
    id: usize,
    model: M,
    env: E,
    local: LocalBuffer<M::State, M::Action>,

    /// Exploration noise level, fixed at worker creation.
    explore_sigma: f32,

    /// Number of merges between weight pulls.
    sync_every: usize,
    merges_since_sync: usize,

    /// Version of the snapshot the local policy copy was taken from.
    last_version: u64,

    horizon: usize,
    snapshots: SnapshotCell,
    merge_sender: Sender<MergeMessage<M::State, M::Action>>,

    /// Stops the collection loop when set to `true`.
    stop: Arc<Mutex<bool>>,

    stat: WorkerStat,
}

impl<M, E> Worker<M, E>
where
    M: TrainableModel,
    E: Environment<State = M::State, Action = M::Action>,
{
    /// Creates a worker; collection starts with [`Self::run`].
    pub fn new(
        id: usize,
        model: M,
        env: E,
        explore_sigma: f32,
        sync_every: usize,
        horizon: usize,
        merge_sender: Sender<MergeMessage<M::State, M::Action>>,
        snapshots: SnapshotCell,
        stop: Arc<Mutex<bool>>,
    ) -> Self {
        assert!(sync_every > 0, "sync_every must be positive");
        Self {
            id,
            model,
            env,
            local: LocalBuffer::new(horizon),
            explore_sigma,
            sync_every,
            merges_since_sync: 0,
            last_version: 0,
            horizon,
            snapshots,
            merge_sender,
            stop,
            stat: WorkerStat::default(),
        }
    }

    /// Runs the collection loop until the stop flag is set or the merge
    /// channel closes, returning the collection stats.
    pub fn run(mut self) -> WorkerStat {
        info!(
            "worker {} starts collecting with sigma {}",
            self.id, self.explore_sigma
        );
        let start = Instant::now();
        self.try_sync();

        loop {
            if *self.stop.lock().unwrap() {
                break;
            }

            // COLLECTING
            match self.collect_episode() {
                Ok(steps) => {
                    self.stat.episodes += 1;
                    self.stat.env_steps += steps;
                }
                Err(e) => warn!("worker {}: episode aborted: {}", self.id, e),
            }

            // MERGING
            if !self.local.is_empty() {
                let local = std::mem::replace(&mut self.local, LocalBuffer::new(self.horizon));
                let msg = MergeMessage {
                    worker_id: self.id,
                    local,
                };
                if self.merge_sender.send(msg).is_err() {
                    info!("worker {}: merge channel closed, stopping", self.id);
                    break;
                }
                self.stat.merges += 1;
            }

            self.merges_since_sync += 1;
            if self.merges_since_sync >= self.sync_every {
                self.merges_since_sync = 0;
                self.try_sync();
            }
        }

        self.stat.duration = start.elapsed();
        info!("worker {} stopped", self.id);
        self.stat
    }

    /// Steps the environment until the episode terminates or the horizon
    /// is reached, staging every transition in the local buffer.
    fn collect_episode(&mut self) -> Result<usize> {
        let mut state = self.env.reset()?;
        let mut steps = 0;

        loop {
            let action = self.model.act(&state, Some(self.explore_sigma));
            let step = match self.env.step(&action) {
                Ok(step) => step,
                Err(e) => {
                    // The fault is isolated to this episode; whatever was
                    // collected before it is still merged.
                    warn!("worker {}: env step failed, ending episode: {}", self.id, e);
                    break;
                }
            };
            steps += 1;

            let experience = Experience {
                state: state.clone(),
                action,
                reward: step.reward,
                next_state: step.next_state.clone(),
                done: step.done,
                bootstrap_steps: 1,
            };
            self.local.push(experience)?;

            if step.done || self.local.len() == self.horizon {
                break;
            }
            state = step.next_state;
        }

        Ok(steps)
    }

    /// Replaces the local policy copy with the latest published snapshot.
    ///
    /// When no fresh snapshot is available the worker keeps operating on
    /// its last-known weights and retries on the next sync cycle.
    fn try_sync(&mut self) {
        if let Some(snapshot) = self.snapshots.latest_after(self.last_version) {
            self.last_version = snapshot.version();
            self.model.set_weights(&snapshot);
            debug!("worker {} synced to weights v{}", self.id, self.last_version);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Worker;
    use crate::SnapshotCell;
    use apex_core::{
        dummy::{DummyModel, DummyModelConfig, LineEnv, LineEnvConfig},
        Configurable, Environment, WeightSnapshot,
    };
    use crossbeam_channel::bounded;
    use std::{
        sync::{Arc, Mutex},
        thread,
        time::Duration,
    };

    #[test]
    fn collects_and_merges_episodes() {
        let (sender, receiver) = bounded(16);
        let snapshots = SnapshotCell::new();
        snapshots.publish(WeightSnapshot::new(1, 0.5f32.to_le_bytes().to_vec()));
        let stop = Arc::new(Mutex::new(false));

        let env_config = LineEnvConfig {
            horizon: 5,
            start: 1.0,
            fail_after: None,
        };
        let worker = Worker::new(
            0,
            DummyModel::build(DummyModelConfig::default()),
            LineEnv::build(&env_config, 0).unwrap(),
            0.1,
            1,
            8,
            sender,
            snapshots,
            stop.clone(),
        );
        let handle = thread::spawn(move || worker.run());

        let msg = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(msg.worker_id, 0);
        assert_eq!(msg.local.len(), 5);

        *stop.lock().unwrap() = true;
        drop(receiver);
        let stat = handle.join().unwrap();
        assert!(stat.episodes >= 1);
        assert!(stat.env_steps >= 5);
    }

    #[test]
    fn env_failure_ends_only_the_episode() {
        let (sender, receiver) = bounded(16);
        let snapshots = SnapshotCell::new();
        snapshots.publish(WeightSnapshot::new(1, 0.5f32.to_le_bytes().to_vec()));
        let stop = Arc::new(Mutex::new(false));

        // Every episode fails at its third step.
        let env_config = LineEnvConfig {
            horizon: 10,
            start: 1.0,
            fail_after: Some(3),
        };
        let worker = Worker::new(
            1,
            DummyModel::build(DummyModelConfig::default()),
            LineEnv::build(&env_config, 0).unwrap(),
            0.1,
            1,
            10,
            sender,
            snapshots,
            stop.clone(),
        );
        let handle = thread::spawn(move || worker.run());

        // The partial episode is still merged, and the worker keeps going.
        let first = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.local.len(), 3);
        let second = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(second.local.len(), 3);

        *stop.lock().unwrap() = true;
        drop(receiver);
        let stat = handle.join().unwrap();
        assert!(stat.merges >= 2);
    }
}
