use std::time::Duration;

/// Stats of the collection loop of one [`Worker`](crate::Worker).
#[derive(Clone, Debug, Default)]
pub struct WorkerStat {
    /// The number of completed episodes.
    pub episodes: usize,

    /// The number of steps of interaction between policy and env.
    pub env_steps: usize,

    /// The number of episodes merged into the replay buffer.
    pub merges: usize,

    /// Duration of the collection loop.
    pub duration: Duration,
}

/// Returns a formatted string of the set of [`WorkerStat`]s for reporting.
pub fn worker_stats_fmt(stats: &[WorkerStat]) -> String {
    let mut s = "worker id, episodes, env steps, merges, steps per sec\n".to_string();
    for (i, stat) in stats.iter().enumerate() {
        let n = stat.env_steps;
        let d = stat.duration.as_secs_f32();
        let p = (n as f32) / d;
        s += format!("{}, {}, {}, {}, {}\n", i, stat.episodes, n, stat.merges, p).as_str();
    }
    s
}
