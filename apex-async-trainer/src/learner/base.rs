use crate::{LearnerConfig, LearnerStat, MergeMessage, SnapshotCell};
use anyhow::Result;
use apex_core::{PrioritizedReplayBuffer, ReplayConfig, TrainableModel};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, info, warn};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

/// Owns the canonical replay buffer and the trainable model.
///
/// Two threads touch the learner's state: a merge-service thread drains
/// the merge channel into the replay buffer, and the training loop samples
/// from it. The buffer has its own lock, held only for the duration of a
/// merge, a sample or a priority write, never across a training step. The
/// model sits behind a separate lock shared with the coordination loop, so
/// weight reads and writes are atomic with respect to each other.
pub struct Learner<M>
where
    M: TrainableModel,
{
    config: LearnerConfig,
    model: Arc<Mutex<M>>,
    buffer: Arc<Mutex<PrioritizedReplayBuffer<M::State, M::Action>>>,
    merge_receiver: Receiver<MergeMessage<M::State, M::Action>>,
    snapshots: SnapshotCell,
    stop: Arc<Mutex<bool>>,
    version: u64,
    samples_merged: Arc<AtomicUsize>,
}

impl<M> Learner<M>
where
    M: TrainableModel,
    M::State: Send + 'static,
    M::Action: Send + 'static,
{
    /// Builds a [`Learner`]; the training loop is started explicitly with
    /// [`Self::run`], typically from the coordination loop.
    pub fn build(
        config: LearnerConfig,
        replay_config: &ReplayConfig,
        model: Arc<Mutex<M>>,
        merge_receiver: Receiver<MergeMessage<M::State, M::Action>>,
        snapshots: SnapshotCell,
        stop: Arc<Mutex<bool>>,
    ) -> Self {
        Self {
            config,
            model,
            buffer: Arc::new(Mutex::new(PrioritizedReplayBuffer::build(replay_config))),
            merge_receiver,
            snapshots,
            stop,
            version: 0,
            samples_merged: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The model behind its weight lock, shared with the coordination
    /// loop for pushing evaluated snapshots back in.
    pub fn model(&self) -> Arc<Mutex<M>> {
        self.model.clone()
    }

    /// The shared replay buffer.
    pub fn buffer(&self) -> Arc<Mutex<PrioritizedReplayBuffer<M::State, M::Action>>> {
        self.buffer.clone()
    }

    /// Runs the training loop until `max_opt_steps` is reached or the
    /// stop flag is set.
    ///
    /// A model failure during an optimization step is fatal: there is
    /// exactly one learner and no failover, so the error is propagated to
    /// the caller after the merge thread has been shut down.
    pub fn run(mut self) -> Result<LearnerStat> {
        let merge_handle = self.run_merge_thread();
        let start = Instant::now();

        let result = self.train_loop();

        // Shut the merge thread down before reporting, also on the error
        // path.
        *self.stop.lock().unwrap() = true;
        merge_handle.join().unwrap();

        let opt_steps = result?;
        Ok(LearnerStat {
            opt_steps,
            samples_merged: self.samples_merged.load(Ordering::Relaxed),
            duration: start.elapsed(),
        })
    }

    fn train_loop(&mut self) -> Result<usize> {
        // Publish the initial snapshot so workers and the evaluator start
        // from the same weights.
        self.publish();

        let backoff = Duration::from_millis(self.config.warmup_backoff_ms);
        loop {
            if *self.stop.lock().unwrap() {
                return Ok(0);
            }
            if self.buffer.lock().unwrap().good_to_learn() {
                break;
            }
            std::thread::sleep(backoff);
        }
        info!("replay buffer warmed up, starting optimization");

        let mut opt_steps = 0;
        loop {
            if *self.stop.lock().unwrap() {
                break;
            }

            let batch = {
                let mut buffer = self.buffer.lock().unwrap();
                buffer.sample_batch(self.config.batch_size)
            };
            let batch = match batch {
                Ok(batch) => batch,
                Err(e) => {
                    warn!("sampling failed: {}", e);
                    std::thread::sleep(backoff);
                    continue;
                }
            };

            let output = {
                let mut model = self.model.lock().unwrap();
                model.train_step(&batch)?
            };

            {
                let mut buffer = self.buffer.lock().unwrap();
                buffer.update_from_batch(&batch, &output.priorities)?;
            }

            opt_steps += 1;
            if opt_steps % 100 == 0 {
                debug!("optimization step {}, loss {}", opt_steps, output.loss);
            }
            if opt_steps % self.config.publish_interval == 0 {
                self.publish();
            }
            if let Some(max) = self.config.max_opt_steps {
                if opt_steps >= max {
                    break;
                }
            }
        }

        Ok(opt_steps)
    }

    /// Takes a copy of the current weights under the weight lock and
    /// publishes it under the next version number.
    fn publish(&mut self) {
        let snapshot = {
            let model = self.model.lock().unwrap();
            model.get_weights()
        };
        self.version += 1;
        debug!("publishing weights v{}", self.version);
        self.snapshots.publish(snapshot.with_version(self.version));
    }

    /// Runs the thread draining worker merges into the replay buffer.
    fn run_merge_thread(&self) -> JoinHandle<()> {
        let buffer = self.buffer.clone();
        let receiver = self.merge_receiver.clone();
        let stop = self.stop.clone();
        let samples_merged = self.samples_merged.clone();

        std::thread::spawn(move || {
            loop {
                match receiver.recv_timeout(Duration::from_millis(50)) {
                    Ok(mut msg) => {
                        // Lock scope is just this merge; sampling proceeds
                        // in between merges from many workers.
                        let merged = buffer.lock().unwrap().merge(&mut msg.local);
                        match merged {
                            Ok(n) => {
                                samples_merged.fetch_add(n, Ordering::Relaxed);
                            }
                            Err(e) => {
                                warn!("merge from worker {} failed: {}", msg.worker_id, e)
                            }
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
                if *stop.lock().unwrap() {
                    break;
                }
            }
            info!("stopped merge thread");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Learner;
    use crate::{LearnerConfig, MergeMessage, SnapshotCell};
    use apex_core::{
        dummy::{line_experience, DummyModel, DummyModelConfig},
        Configurable, LocalBuffer, PerConfig, ReplayConfig,
    };
    use crossbeam_channel::bounded;
    use std::{
        sync::{Arc, Mutex},
        thread,
    };

    #[test]
    fn trains_and_publishes() {
        let replay_config = ReplayConfig::default()
            .capacity(128)
            .min_size_to_learn(32)
            .per(PerConfig::default().n_samples_final(100));
        let learner_config = LearnerConfig::default()
            .batch_size(8)
            .publish_interval(10)
            .max_opt_steps(Some(20))
            .warmup_backoff_ms(1);

        let (sender, receiver) = bounded(64);
        let snapshots = SnapshotCell::new();
        let stop = Arc::new(Mutex::new(false));
        let model = Arc::new(Mutex::new(DummyModel::build(DummyModelConfig::default())));

        let learner = Learner::build(
            learner_config,
            &replay_config,
            model,
            receiver,
            snapshots.clone(),
            stop,
        );
        let handle = thread::spawn(move || learner.run());

        // Feed eight episodes of ten transitions; the learner needs 32 to
        // start optimizing.
        for i in 0..8 {
            let mut local = LocalBuffer::new(10);
            for j in 0..10 {
                local
                    .push(line_experience(j as f32, 0.1, -(i as f32), j == 9))
                    .unwrap();
            }
            sender
                .send(MergeMessage {
                    worker_id: 0,
                    local,
                })
                .unwrap();
        }

        let stat = handle.join().unwrap().unwrap();
        assert_eq!(stat.opt_steps, 20);
        assert!(stat.samples_merged >= 32);

        // Initial publication plus two interval publications.
        assert_eq!(snapshots.latest().unwrap().version(), 3);
    }
}
