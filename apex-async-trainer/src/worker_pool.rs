//! Pool of data-collecting workers.
mod base;
mod config;
pub use base::WorkerPool;
pub use config::WorkerPoolConfig;
