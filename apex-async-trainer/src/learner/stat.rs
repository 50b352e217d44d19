use std::time::Duration;

/// Stats of [`Learner`](super::Learner)`::run()`.
#[derive(Clone, Debug, Default)]
pub struct LearnerStat {
    /// The number of completed optimization steps.
    pub opt_steps: usize,

    /// The number of transitions merged from workers.
    pub samples_merged: usize,

    /// Duration of the training loop.
    pub duration: Duration,
}

impl LearnerStat {
    /// Returns a formatted string.
    pub fn fmt(&self) -> String {
        let d = self.duration.as_secs_f32();
        let mut s = "opt_steps, samples merged, opt_steps/sec, duration [sec]\n".to_string();
        s += format!(
            "{}, {}, {}, {}\n",
            self.opt_steps,
            self.samples_merged,
            self.opt_steps as f32 / d,
            d
        )
        .as_str();
        s
    }
}
