//! Learner updating the policy from the shared replay buffer.
mod base;
mod config;
mod stat;
pub use base::Learner;
pub use config::LearnerConfig;
pub use stat::LearnerStat;
