//! Wiring and lifecycle of a complete asynchronous training run.
use anyhow::Result;
use apex_core::{
    BestSnapshot, Configurable, Environment, ReplayConfig, SnapshotEvaluator, TrainableModel,
    WeightSnapshot,
};
use crossbeam_channel::bounded;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use crate::{
    worker_stats_fmt, AsyncTrainError, EvalLoop, Learner, LearnerConfig, LearnerStat,
    SnapshotCell, WorkerPool, WorkerPoolConfig, WorkerStat,
};

/// Configuration of [`train_async`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Interval of pushing the best evaluated weights back into the
    /// learner, in milliseconds.
    pub push_interval_ms: u64,

    /// Interval of polling for new weight snapshots on the evaluation
    /// thread, in milliseconds.
    pub eval_poll_interval_ms: u64,

    /// Number of episodes averaged per snapshot evaluation.
    pub eval_episodes: usize,

    /// Seed of the evaluation environment.
    pub eval_seed: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            push_interval_ms: 600_000,
            eval_poll_interval_ms: 10_000,
            eval_episodes: 1,
            eval_seed: 0,
        }
    }
}

impl CoordinatorConfig {
    /// Sets the best-weights push interval in milliseconds.
    pub fn push_interval_ms(mut self, push_interval_ms: u64) -> Self {
        self.push_interval_ms = push_interval_ms;
        self
    }

    /// Sets the snapshot poll interval in milliseconds.
    pub fn eval_poll_interval_ms(mut self, eval_poll_interval_ms: u64) -> Self {
        self.eval_poll_interval_ms = eval_poll_interval_ms;
        self
    }

    /// Sets the number of evaluation episodes per snapshot.
    pub fn eval_episodes(mut self, eval_episodes: usize) -> Self {
        self.eval_episodes = eval_episodes;
        self
    }

    /// Sets the seed of the evaluation environment.
    pub fn eval_seed(mut self, eval_seed: u64) -> Self {
        self.eval_seed = eval_seed;
        self
    }

    /// Constructs [`CoordinatorConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`CoordinatorConfig`] to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Outcome of a training run.
#[derive(Debug)]
pub struct TrainReport {
    /// Statistics of the learner.
    pub learner: LearnerStat,

    /// Statistics of each worker.
    pub workers: Vec<WorkerStat>,

    /// Score of the best evaluated snapshot, if any snapshot was scored.
    pub best_score: Option<f32>,

    /// The best evaluated snapshot.
    pub best_snapshot: Option<WeightSnapshot>,
}

/// Runs asynchronous training with parallel workers, a learner and a
/// background evaluation thread.
///
/// Workers collect transitions into per-worker staging buffers and send
/// them over a bounded channel; the learner merges them into the replay
/// buffer, optimizes, and publishes weight snapshots. The evaluation
/// thread scores published snapshots and keeps the best. On the push
/// interval the best weights are loaded back into the learner's model.
///
/// The run ends when the learner finishes (its `max_opt_steps` is
/// reached or a training step fails). Teardown then stops the workers
/// and the evaluation thread and joins all of them, so the returned
/// report reflects the complete run.
pub fn train_async<M, E>(
    config: &CoordinatorConfig,
    pool_config: &WorkerPoolConfig,
    learner_config: &LearnerConfig,
    replay_config: &ReplayConfig,
    model_config: &M::Config,
    env_config: &E::Config,
) -> Result<TrainReport>
where
    M: TrainableModel + Configurable + Send + 'static,
    E: Environment<State = M::State, Action = M::Action> + Send + 'static,
    M::Config: Send + 'static,
    E::Config: Send + 'static,
    M::State: Send + 'static,
    M::Action: Send + 'static,
{
    let (merge_sender, merge_receiver) = bounded(pool_config.merge_channel_bound);
    let snapshots = SnapshotCell::new();
    let stop = Arc::new(Mutex::new(false));
    let best = BestSnapshot::new();

    let model = Arc::new(Mutex::new(M::build(model_config.clone())));
    let learner = Learner::build(
        learner_config.clone(),
        replay_config,
        model.clone(),
        merge_receiver,
        snapshots.clone(),
        stop.clone(),
    );

    let eval_model = M::build(model_config.clone());
    let eval_env = E::build(env_config, config.eval_seed)?;
    let eval_loop = EvalLoop::new(
        SnapshotEvaluator::new(eval_model, eval_env, config.eval_episodes, best.clone()),
        snapshots.clone(),
        Duration::from_millis(config.eval_poll_interval_ms),
        stop.clone(),
    );

    let mut pool = WorkerPool::<M, E>::build(
        pool_config.clone(),
        model_config.clone(),
        env_config.clone(),
        merge_sender,
        snapshots,
        stop.clone(),
    );

    pool.run();
    let eval_handle = std::thread::spawn(move || eval_loop.run());
    let learner_handle = std::thread::spawn(move || learner.run());
    info!("started training");

    // Push the best evaluated weights into the learner on the push
    // interval until the learner finishes.
    let push_interval = Duration::from_millis(config.push_interval_ms);
    let mut last_push = Instant::now();
    while !learner_handle.is_finished() {
        if last_push.elapsed() >= push_interval {
            if let Some(snapshot) = best.snapshot() {
                model.lock().unwrap().set_weights(&snapshot);
                info!("loaded best snapshot v{} into the learner", snapshot.version());
            }
            last_push = Instant::now();
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    let learner_result = learner_handle
        .join()
        .map_err(|_| AsyncTrainError::LearnerPanicked)?;

    // Workers and the evaluation loop stop on this flag.
    *stop.lock().unwrap() = true;
    let workers = pool.stop_and_join();
    eval_handle
        .join()
        .map_err(|_| AsyncTrainError::EvalPanicked)??;

    let learner = learner_result?;
    info!("worker stats\n{}", worker_stats_fmt(&workers));
    info!("learner stats\n{}", learner.fmt());
    info!("finished training, best score {:?}", best.score());

    Ok(TrainReport {
        learner,
        workers,
        best_score: best.score(),
        best_snapshot: best.snapshot(),
    })
}
