//! Environment.
use anyhow::Result;
use std::fmt::Debug;

/// The outcome of a single environment step.
#[derive(Clone, Debug)]
pub struct EnvStep<S> {
    /// Observation after the step.
    pub next_state: S,

    /// Immediate reward.
    pub reward: f32,

    /// `true` if the episode ended with this step.
    pub done: bool,
}

/// Represents an environment, typically an MDP.
///
/// Environment simulation itself is out of scope of this crate; this trait
/// is the narrow interface through which workers and evaluators interact
/// with an external simulator.
pub trait Environment: Sized {
    /// Configurations.
    type Config: Clone;

    /// Observation of the environment.
    type State: Clone + Debug;

    /// Action applied to the environment.
    type Action: Clone + Debug;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: u64) -> Result<Self>;

    /// Resets the environment and returns the initial observation.
    fn reset(&mut self) -> Result<Self::State>;

    /// Performs an environment step.
    ///
    /// A step error is not fatal to a training run: the worker treats it
    /// as termination of the current episode.
    fn step(&mut self, action: &Self::Action) -> Result<EnvStep<Self::State>>;
}
