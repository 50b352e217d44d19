use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Learner`](super::Learner).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LearnerConfig {
    /// Number of transitions per sampled batch.
    pub batch_size: usize,

    /// Interval of publishing weight snapshots in optimization steps.
    pub publish_interval: usize,

    /// The maximum number of optimization steps; `None` trains until the
    /// stop flag is set.
    pub max_opt_steps: Option<usize>,

    /// Sleep between buffer-size checks while waiting for enough data,
    /// in milliseconds.
    pub warmup_backoff_ms: u64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            publish_interval: 100,
            max_opt_steps: None,
            warmup_backoff_ms: 100,
        }
    }
}

impl LearnerConfig {
    /// Sets the batch size.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the snapshot publication interval.
    pub fn publish_interval(mut self, publish_interval: usize) -> Self {
        self.publish_interval = publish_interval;
        self
    }

    /// Sets the maximum number of optimization steps.
    pub fn max_opt_steps(mut self, max_opt_steps: Option<usize>) -> Self {
        self.max_opt_steps = max_opt_steps;
        self
    }

    /// Sets the warmup backoff in milliseconds.
    pub fn warmup_backoff_ms(mut self, warmup_backoff_ms: u64) -> Self {
        self.warmup_backoff_ms = warmup_backoff_ms;
        self
    }

    /// Constructs [`LearnerConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`LearnerConfig`] to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
