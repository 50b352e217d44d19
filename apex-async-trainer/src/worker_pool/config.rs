use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`WorkerPool`](super::WorkerPool).
///
/// Exploration noise is worker-specific and fixed at worker creation:
/// worker 0 runs near-deterministically with `lead_sigma`, the others draw
/// a level from `[sigma_min, sigma_max)`. This spreads the population over
/// the exploration/exploitation spectrum without central coordination.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    /// Number of workers to spawn.
    pub n_workers: usize,

    /// Maximum number of steps per episode.
    pub episode_horizon: usize,

    /// Number of merges between weight pulls of each worker.
    ///
    /// The default value is 1, i.e. a pull after every merge.
    pub sync_every: usize,

    /// Capacity of the merge channel to the learner.
    pub merge_channel_bound: usize,

    /// Exploration noise of worker 0, the near-deterministic one.
    pub lead_sigma: f32,

    /// Lower bound of the exploration noise of the remaining workers.
    pub sigma_min: f32,

    /// Upper bound of the exploration noise of the remaining workers.
    pub sigma_max: f32,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            n_workers: 4,
            episode_horizon: 1000,
            sync_every: 1,
            merge_channel_bound: 1000,
            lead_sigma: 0.1,
            sigma_min: 0.4,
            sigma_max: 1.0,
        }
    }
}

impl WorkerPoolConfig {
    /// Sets the number of workers.
    pub fn n_workers(mut self, n_workers: usize) -> Self {
        self.n_workers = n_workers;
        self
    }

    /// Sets the episode horizon.
    pub fn episode_horizon(mut self, episode_horizon: usize) -> Self {
        self.episode_horizon = episode_horizon;
        self
    }

    /// Sets the number of merges between weight pulls.
    pub fn sync_every(mut self, sync_every: usize) -> Self {
        self.sync_every = sync_every;
        self
    }

    /// Sets the capacity of the merge channel.
    pub fn merge_channel_bound(mut self, merge_channel_bound: usize) -> Self {
        self.merge_channel_bound = merge_channel_bound;
        self
    }

    /// Exploration noise level of the worker with the given id.
    pub fn explore_sigma_for(&self, id: usize) -> f32 {
        if id == 0 {
            self.lead_sigma
        } else {
            self.sigma_min + (self.sigma_max - self.sigma_min) * fastrand::f32()
        }
    }

    /// Constructs [`WorkerPoolConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`WorkerPoolConfig`] to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
