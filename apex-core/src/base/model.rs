//! Trainable model interface.
use crate::SampledBatch;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A versioned, immutable copy of policy parameters.
///
/// The parameter blob is opaque to this crate; its layout is defined by the
/// [`TrainableModel`] implementation that produced it. Snapshots are shared
/// by value: every consumer works on its own clone and no consumer mutates
/// a snapshot in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightSnapshot {
    version: u64,
    params: Vec<u8>,
}

impl WeightSnapshot {
    /// Creates a snapshot from serialized parameters.
    pub fn new(version: u64, params: Vec<u8>) -> Self {
        Self { version, params }
    }

    /// Monotonic version counter, stamped by the publisher.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Serialized parameters.
    pub fn params(&self) -> &[u8] {
        &self.params
    }

    /// Returns the same parameters under a new version number.
    ///
    /// Used by the learner, which owns the version sequence, before
    /// publication.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }
}

/// The result of one optimization step.
#[derive(Clone, Debug)]
pub struct TrainOutput {
    /// Scalar loss of the step.
    pub loss: f32,

    /// Per-sample priority, typically the absolute TD error, in the order
    /// of the samples of the batch.
    pub priorities: Vec<f32>,
}

/// A trainable policy.
///
/// This is the narrow interface to the external model collaborator. Network
/// architecture, gradient computation and device placement are all behind
/// it. Algorithm variants are selected by choosing an implementation at
/// construction, not through a type hierarchy.
pub trait TrainableModel {
    /// Observation consumed by the policy.
    type State: Clone + Debug;

    /// Action produced by the policy.
    type Action: Clone + Debug;

    /// Samples an action for the given observation.
    ///
    /// `explore_sigma` is the exploration noise level; `None` runs the
    /// policy deterministically, as the evaluator does.
    fn act(&mut self, state: &Self::State, explore_sigma: Option<f32>) -> Self::Action;

    /// Performs one optimization step on a sampled batch.
    ///
    /// An error here is fatal to the training run.
    fn train_step(&mut self, batch: &SampledBatch<Self::State, Self::Action>)
        -> Result<TrainOutput>;

    /// Returns a copy of the current parameters.
    fn get_weights(&self) -> WeightSnapshot;

    /// Replaces the current parameters with those of the snapshot.
    fn set_weights(&mut self, snapshot: &WeightSnapshot);
}
