//! Scheduling the exponent of importance weight.
use serde::{Deserialize, Serialize};

/// Anneals the importance sampling exponent $\beta$ over sampling calls.
///
/// $\beta$ grows linearly from `beta_0` toward `beta_final`, reducing bias
/// correction late in training when the policy is close to converged.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct IwScheduler {
    /// Initial value of $\beta$.
    pub beta_0: f32,

    /// Final value of $\beta$.
    pub beta_final: f32,

    /// Sampling calls after which beta reaches its final value.
    pub n_samples_final: usize,

    /// Current number of sampling calls.
    pub n_samples: usize,
}

impl IwScheduler {
    /// Creates a scheduler.
    pub fn new(beta_0: f32, beta_final: f32, n_samples_final: usize) -> Self {
        Self {
            beta_0,
            beta_final,
            n_samples_final,
            n_samples: 0,
        }
    }

    /// Gets the exponent of the importance sampling weight.
    pub fn beta(&self) -> f32 {
        let n_samples = self.n_samples;
        if n_samples >= self.n_samples_final {
            self.beta_final
        } else {
            let d = self.beta_final - self.beta_0;
            self.beta_0 + d * (n_samples as f32 / self.n_samples_final as f32)
        }
    }

    /// Counts a sampling call for scheduling beta through training.
    pub fn add_n_samples(&mut self) {
        self.n_samples += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::IwScheduler;

    #[test]
    fn beta_anneals_linearly_and_saturates() {
        let mut scheduler = IwScheduler::new(0.4, 1.0, 10);
        assert!((scheduler.beta() - 0.4).abs() < 1e-6);

        for _ in 0..5 {
            scheduler.add_n_samples();
        }
        assert!((scheduler.beta() - 0.7).abs() < 1e-6);

        for _ in 0..10 {
            scheduler.add_n_samples();
        }
        assert!((scheduler.beta() - 1.0).abs() < 1e-6);
    }
}
