//! Scoring weight snapshots without polluting training data.
use crate::{Environment, TrainableModel, WeightSnapshot};
use anyhow::Result;
use log::info;
use std::sync::{Arc, Mutex};

/// Thread-safe record of the best-scoring snapshot seen so far.
///
/// A snapshot replaces the incumbent only on strict improvement; ties keep
/// the earlier snapshot. Handles are cheap to clone and share one record,
/// which is how the evaluation thread hands its verdict to the
/// coordination loop.
#[derive(Clone, Default)]
pub struct BestSnapshot {
    inner: Arc<Mutex<Option<(f32, WeightSnapshot)>>>,
}

impl BestSnapshot {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a scored snapshot; returns `true` if it became the best.
    pub fn offer(&self, score: f32, snapshot: &WeightSnapshot) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.as_ref() {
            Some((best, _)) if score <= *best => false,
            _ => {
                *inner = Some((score, snapshot.clone()));
                true
            }
        }
    }

    /// The best snapshot so far, if any snapshot has been scored.
    pub fn snapshot(&self) -> Option<WeightSnapshot> {
        self.inner.lock().unwrap().as_ref().map(|(_, s)| s.clone())
    }

    /// The score of the best snapshot so far.
    pub fn score(&self) -> Option<f32> {
        self.inner.lock().unwrap().as_ref().map(|(score, _)| *score)
    }
}

/// Runs the policy deterministically to score weight snapshots.
///
/// The evaluator owns its own model and environment, so scoring never
/// interferes with data collection or training.
pub struct SnapshotEvaluator<M, E> {
    model: M,
    env: E,
    n_episodes: usize,
    best: BestSnapshot,
}

impl<M, E> SnapshotEvaluator<M, E>
where
    M: TrainableModel,
    E: Environment<State = M::State, Action = M::Action>,
{
    /// Constructs an evaluator averaging over `n_episodes` episodes.
    pub fn new(model: M, env: E, n_episodes: usize, best: BestSnapshot) -> Self {
        assert!(n_episodes > 0, "evaluation needs at least one episode");
        Self {
            model,
            env,
            n_episodes,
            best,
        }
    }

    /// Loads the snapshot into the local model, scores it and records it
    /// if it strictly improves on the best seen so far.
    pub fn score_snapshot(&mut self, snapshot: &WeightSnapshot) -> Result<f32> {
        self.model.set_weights(snapshot);
        let score = self.evaluate()?;
        if self.best.offer(score, snapshot) {
            info!(
                "snapshot v{} is the new best with score {}",
                snapshot.version(),
                score
            );
        }
        Ok(score)
    }

    /// Average return of complete episodes with exploration disabled.
    pub fn evaluate(&mut self) -> Result<f32> {
        let mut r_total = 0f32;

        for _ in 0..self.n_episodes {
            let mut state = self.env.reset()?;
            loop {
                let action = self.model.act(&state, None);
                let step = self.env.step(&action)?;
                r_total += step.reward;
                if step.done {
                    break;
                }
                state = step.next_state;
            }
        }

        Ok(r_total / self.n_episodes as f32)
    }

    /// Handle to the best-snapshot record shared with this evaluator.
    pub fn best(&self) -> BestSnapshot {
        self.best.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::BestSnapshot;
    use crate::WeightSnapshot;

    #[test]
    fn strict_improvement_rule() {
        let best = BestSnapshot::new();
        let a = WeightSnapshot::new(1, vec![1]);
        let b = WeightSnapshot::new(2, vec![2]);
        let c = WeightSnapshot::new(3, vec![3]);

        assert!(best.offer(10.0, &a));
        assert!(best.offer(12.0, &b));
        assert!(!best.offer(9.0, &c));
        assert_eq!(best.snapshot().unwrap().version(), 2);
        assert_eq!(best.score(), Some(12.0));

        // A tie keeps the earlier snapshot.
        assert!(!best.offer(12.0, &c));
        assert_eq!(best.snapshot().unwrap().version(), 2);
    }
}
