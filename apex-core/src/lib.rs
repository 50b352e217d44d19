#![warn(missing_docs)]
//! Core of a distributed prioritized experience replay pipeline.
//!
//! This crate provides the data structures shared by many concurrent
//! data-collecting workers and a single learner:
//!
//! - [`PriorityTree`]: O(log n) point update and prefix-sum sampling over
//!   fixed-capacity priority slots
//! - [`PrioritizedReplayBuffer`]: proportional prioritized replay with
//!   stratified sampling, importance-sampling correction and stale-update
//!   discard
//! - [`LocalBuffer`]: per-worker episode staging
//! - [`SnapshotEvaluator`]: deterministic scoring of weight snapshots
//!
//! The neural network itself is an external collaborator behind the
//! [`TrainableModel`] trait; environments sit behind [`Environment`].
//! The asynchronous worker/learner machinery lives in the
//! `apex-async-trainer` crate.
pub mod dummy;
mod error;
pub use error::ApexError;

mod base;
pub use base::{
    Configurable, EnvStep, Environment, Experience, TrainOutput, TrainableModel, WeightSnapshot,
};

mod replay;
pub use replay::{
    IwScheduler, LocalBuffer, PerConfig, PrioritizedReplayBuffer, PriorityTree, ReplayConfig,
    SampledBatch,
};

mod evaluator;
pub use evaluator::{BestSnapshot, SnapshotEvaluator};
