#![warn(missing_docs)]
//! Asynchronous training with parallel workers and a prioritized replay
//! buffer.
//!
//! # Roles
//! * [`Worker`] collects transitions and merges them to the learner over a
//!   bounded channel.
//! * [`WorkerPool`] spawns and manages worker threads.
//! * [`Learner`] owns the replay buffer, runs optimization steps and
//!   publishes weight snapshots through a [`SnapshotCell`].
//! * [`EvalLoop`] scores published snapshots in the background.
//! * [`train_async`] wires the roles together for a complete run.
mod coordinator;
mod error;
mod eval_loop;
mod learner;
mod messages;
mod snapshots;
mod worker;
mod worker_pool;
pub use coordinator::{train_async, CoordinatorConfig, TrainReport};
pub use error::AsyncTrainError;
pub use eval_loop::EvalLoop;
pub use learner::{Learner, LearnerConfig, LearnerStat};
pub use messages::MergeMessage;
pub use snapshots::SnapshotCell;
pub use worker::{worker_stats_fmt, Worker, WorkerStat};
pub use worker_pool::{WorkerPool, WorkerPoolConfig};

#[cfg(test)]
mod test {
    use super::{train_async, CoordinatorConfig, LearnerConfig, WorkerPoolConfig};
    use apex_core::{
        dummy::{DummyModel, DummyModelConfig, LineEnv, LineEnvConfig},
        ReplayConfig,
    };
    use test_log::test;

    fn replay_config() -> ReplayConfig {
        ReplayConfig::default().capacity(512).min_size_to_learn(64)
    }

    fn pool_config() -> WorkerPoolConfig {
        WorkerPoolConfig::default()
            .n_workers(2)
            .episode_horizon(20)
            .merge_channel_bound(64)
    }

    fn learner_config() -> LearnerConfig {
        LearnerConfig::default()
            .batch_size(16)
            .publish_interval(5)
            .max_opt_steps(Some(50))
            .warmup_backoff_ms(1)
    }

    fn coordinator_config() -> CoordinatorConfig {
        CoordinatorConfig::default()
            .push_interval_ms(20)
            .eval_poll_interval_ms(1)
    }

    #[test]
    fn trains_asynchronously_end_to_end() {
        let report = train_async::<DummyModel, LineEnv>(
            &coordinator_config(),
            &pool_config(),
            &learner_config(),
            &replay_config(),
            &DummyModelConfig::default(),
            &LineEnvConfig::default(),
        )
        .unwrap();

        assert_eq!(report.learner.opt_steps, 50);
        assert!(report.learner.samples_merged >= 64);
        assert_eq!(report.workers.len(), 2);
        for stat in &report.workers {
            assert!(stat.episodes > 0);
            assert!(stat.env_steps > 0);
            // The final merge may hit an already-closed channel.
            assert!(stat.merges > 0 && stat.merges <= stat.episodes);
        }
        assert!(report.best_score.is_some());
        assert!(report.best_snapshot.is_some());
    }
}
