use crate::{MergeMessage, SnapshotCell, Worker, WorkerPoolConfig, WorkerStat};
use apex_core::{Configurable, Environment, TrainableModel};
use crossbeam_channel::Sender;
use log::{error, info};
use std::{
    sync::{Arc, Mutex},
    thread::JoinHandle,
};

/// Spawns and manages the [`Worker`]s of a training run.
///
/// Every worker runs on its own thread with its own model and environment
/// instance, built inside the thread from the shared configurations. The
/// pool only hands out the channel ends and the shared stop flag; workers
/// never communicate with each other.
pub struct WorkerPool<M, E>
where
    M: TrainableModel + Configurable,
    E: Environment<State = M::State, Action = M::Action>,
{
    config: WorkerPoolConfig,
    model_config: M::Config,
    env_config: E::Config,
    merge_sender: Sender<MergeMessage<M::State, M::Action>>,
    snapshots: SnapshotCell,
    stop: Arc<Mutex<bool>>,
    threads: Vec<JoinHandle<WorkerStat>>,
}

impl<M, E> WorkerPool<M, E>
where
    M: TrainableModel + Configurable,
    E: Environment<State = M::State, Action = M::Action>,
    M::Config: Send + 'static,
    E::Config: Send + 'static,
    M::State: Send + 'static,
    M::Action: Send + 'static,
{
    /// Builds a [`WorkerPool`]; threads are spawned by [`Self::run`].
    pub fn build(
        config: WorkerPoolConfig,
        model_config: M::Config,
        env_config: E::Config,
        merge_sender: Sender<MergeMessage<M::State, M::Action>>,
        snapshots: SnapshotCell,
        stop: Arc<Mutex<bool>>,
    ) -> Self {
        Self {
            config,
            model_config,
            env_config,
            merge_sender,
            snapshots,
            stop,
            threads: vec![],
        }
    }

    /// Spawns one thread per worker; collection starts immediately.
    pub fn run(&mut self) {
        for id in 0..self.config.n_workers {
            let explore_sigma = self.config.explore_sigma_for(id);
            let sync_every = self.config.sync_every;
            let horizon = self.config.episode_horizon;
            let model_config = self.model_config.clone();
            let env_config = self.env_config.clone();
            let merge_sender = self.merge_sender.clone();
            let snapshots = self.snapshots.clone();
            let stop = self.stop.clone();

            let handle = std::thread::spawn(move || {
                let model = M::build(model_config);
                let env = match E::build(&env_config, id as u64) {
                    Ok(env) => env,
                    Err(e) => {
                        error!("worker {}: failed to build env: {}", id, e);
                        return WorkerStat::default();
                    }
                };
                Worker::new(
                    id,
                    model,
                    env,
                    explore_sigma,
                    sync_every,
                    horizon,
                    merge_sender,
                    snapshots,
                    stop,
                )
                .run()
            });
            self.threads.push(handle);
        }
        info!("spawned {} workers", self.config.n_workers);
    }

    /// Sets the stop flag shared with the worker threads.
    pub fn stop(&self) {
        let mut stop = self.stop.lock().unwrap();
        *stop = true;
    }

    /// Waits until all workers finish.
    pub fn join(self) -> Vec<WorkerStat> {
        self.threads
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect()
    }

    /// Stops and joins the workers.
    pub fn stop_and_join(self) -> Vec<WorkerStat> {
        self.stop();
        self.join()
    }
}
