//! This module is used for tests.
//!
//! [`DummyModel`] and [`LineEnv`] stand in for the external model and
//! environment collaborators: a linear policy on a one-dimensional line
//! world, cheap enough for threaded integration tests.
use crate::{
    Configurable, EnvStep, Environment, Experience, SampledBatch, TrainOutput, TrainableModel,
    WeightSnapshot,
};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Configuration of [`DummyModel`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DummyModelConfig {
    /// Initial gain of the policy.
    pub gain: f32,
}

impl Default for DummyModelConfig {
    fn default() -> Self {
        Self { gain: 0.5 }
    }
}

/// A linear policy whose single parameter is carried in its snapshots.
pub struct DummyModel {
    gain: f32,
    /// Number of completed optimization steps.
    pub train_calls: usize,
}

impl Configurable for DummyModel {
    type Config = DummyModelConfig;

    fn build(config: Self::Config) -> Self {
        Self {
            gain: config.gain,
            train_calls: 0,
        }
    }
}

impl TrainableModel for DummyModel {
    type State = f32;
    type Action = f32;

    fn act(&mut self, state: &f32, explore_sigma: Option<f32>) -> f32 {
        let action = -self.gain * state;
        match explore_sigma {
            Some(sigma) => action + sigma * (fastrand::f32() - 0.5),
            None => action,
        }
    }

    fn train_step(&mut self, batch: &SampledBatch<f32, f32>) -> Result<TrainOutput> {
        self.train_calls += 1;
        // Nudge the gain toward the stabilizing value.
        self.gain += 0.01 * (1.0 - self.gain);
        let priorities = batch
            .experiences
            .iter()
            .map(|e| e.reward.abs() + 0.1)
            .collect();
        Ok(TrainOutput {
            loss: batch.experiences.iter().map(|e| e.reward.abs()).sum(),
            priorities,
        })
    }

    fn get_weights(&self) -> WeightSnapshot {
        WeightSnapshot::new(0, self.gain.to_le_bytes().to_vec())
    }

    fn set_weights(&mut self, snapshot: &WeightSnapshot) {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&snapshot.params()[..4]);
        self.gain = f32::from_le_bytes(bytes);
    }
}

/// Configuration of [`LineEnv`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineEnvConfig {
    /// Steps per episode.
    pub horizon: usize,

    /// Initial position.
    pub start: f32,

    /// If set, every step from this one on fails, for testing fault
    /// containment in the collection loop.
    pub fail_after: Option<usize>,
}

impl Default for LineEnvConfig {
    fn default() -> Self {
        Self {
            horizon: 10,
            start: 1.0,
            fail_after: None,
        }
    }
}

/// A one-dimensional world: the agent pushes a point around a line and is
/// rewarded for staying near the origin.
pub struct LineEnv {
    config: LineEnvConfig,
    pos: f32,
    steps: usize,
}

impl Environment for LineEnv {
    type Config = LineEnvConfig;
    type State = f32;
    type Action = f32;

    fn build(config: &Self::Config, _seed: u64) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            pos: config.start,
            steps: 0,
        })
    }

    fn reset(&mut self) -> Result<f32> {
        self.pos = self.config.start;
        self.steps = 0;
        Ok(self.pos)
    }

    fn step(&mut self, action: &f32) -> Result<EnvStep<f32>> {
        if let Some(fail_after) = self.config.fail_after {
            if self.steps >= fail_after {
                bail!("simulator fault at step {}", self.steps);
            }
        }
        self.steps += 1;
        self.pos += action;
        Ok(EnvStep {
            next_state: self.pos,
            reward: -self.pos.abs(),
            done: self.steps >= self.config.horizon,
        })
    }
}

/// Builds an [`Experience`] for tests of the buffer machinery.
pub fn line_experience(state: f32, action: f32, reward: f32, done: bool) -> Experience<f32, f32> {
    Experience {
        state,
        action,
        reward,
        next_state: state + action,
        done,
        bootstrap_steps: 1,
    }
}
