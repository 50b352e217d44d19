//! Data-collecting worker.
mod base;
mod stat;
pub use base::Worker;
pub use stat::{worker_stats_fmt, WorkerStat};
