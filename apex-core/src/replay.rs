//! Prioritized experience replay.
//!
//! This module provides the shared, priority-weighted memory that the
//! distributed training roles communicate through:
//! - [`PriorityTree`]: sub-linear-time prioritized sampling and update
//! - [`PrioritizedReplayBuffer`]: a circular store of experiences paired
//!   1:1 with a priority tree
//! - [`LocalBuffer`]: a per-worker staging buffer merged into the global
//!   buffer once per episode
mod base;
mod config;
mod iw_scheduler;
mod local;
mod priority_tree;
pub use base::{PrioritizedReplayBuffer, SampledBatch};
pub use config::{PerConfig, ReplayConfig};
pub use iw_scheduler::IwScheduler;
pub use local::LocalBuffer;
pub use priority_tree::PriorityTree;
