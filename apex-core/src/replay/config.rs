//! Configuration of the replay buffer.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of prioritized sampling.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PerConfig {
    /// Exponent applied to priorities. Higher values concentrate sampling
    /// on high-error transitions; a value of 0 degenerates to uniform
    /// sampling.
    pub alpha: f32,

    /// Initial value of the importance sampling exponent.
    pub beta_0: f32,

    /// Final value of the importance sampling exponent. Typically 1.0 to
    /// fully compensate for the non-uniform sampling.
    pub beta_final: f32,

    /// Number of sampling calls after which beta reaches its final value.
    pub n_samples_final: usize,

    /// Upper bound on the bootstrap priority assigned to freshly merged
    /// experience, preventing one early outlier from dominating sampling.
    pub priority_ceiling: f32,
}

impl Default for PerConfig {
    /// Commonly used values:
    /// - `alpha = 0.6` (moderate prioritization)
    /// - `beta_0 = 0.4`, `beta_final = 1.0` over `500_000` sampling calls
    /// - `priority_ceiling = 100.0`
    fn default() -> Self {
        Self {
            alpha: 0.6,
            beta_0: 0.4,
            beta_final: 1.0,
            n_samples_final: 500_000,
            priority_ceiling: 100.0,
        }
    }
}

impl PerConfig {
    /// Sets the prioritization exponent `alpha`.
    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the initial importance sampling exponent `beta_0`.
    pub fn beta_0(mut self, beta_0: f32) -> Self {
        self.beta_0 = beta_0;
        self
    }

    /// Sets the final importance sampling exponent `beta_final`.
    pub fn beta_final(mut self, beta_final: f32) -> Self {
        self.beta_final = beta_final;
        self
    }

    /// Sets the number of sampling calls to reach the final beta value.
    pub fn n_samples_final(mut self, n_samples_final: usize) -> Self {
        self.n_samples_final = n_samples_final;
        self
    }

    /// Sets the upper bound on the bootstrap priority.
    pub fn priority_ceiling(mut self, priority_ceiling: f32) -> Self {
        self.priority_ceiling = priority_ceiling;
        self
    }
}

/// Configuration of [`PrioritizedReplayBuffer`](super::PrioritizedReplayBuffer).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ReplayConfig {
    /// Maximum number of transitions that can be stored in the buffer.
    /// When the buffer is full, new transitions replace the oldest ones.
    pub capacity: usize,

    /// Minimum number of transitions that must be stored before batches
    /// can be sampled.
    pub min_size_to_learn: usize,

    /// Random seed of the stratified sampling draws.
    pub seed: u64,

    /// Prioritization parameters.
    pub per: PerConfig,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            capacity: 100_000,
            min_size_to_learn: 1_000,
            seed: 42,
            per: PerConfig::default(),
        }
    }
}

impl ReplayConfig {
    /// Sets the capacity of the replay buffer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the minimum number of transitions required for sampling.
    pub fn min_size_to_learn(mut self, min_size_to_learn: usize) -> Self {
        self.min_size_to_learn = min_size_to_learn;
        self
    }

    /// Sets the random seed for sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the prioritization parameters.
    pub fn per(mut self, per: PerConfig) -> Self {
        self.per = per;
        self
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ReplayConfig;
    use tempdir::TempDir;

    #[test]
    fn yaml_round_trip() {
        let dir = TempDir::new("replay_config").unwrap();
        let path = dir.path().join("replay.yaml");

        let config = ReplayConfig::default()
            .capacity(4096)
            .min_size_to_learn(128)
            .seed(7);
        config.save(&path).unwrap();

        let loaded = ReplayConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
