//! Per-worker staging buffer.
use crate::{ApexError, Experience};

/// Accumulates the transitions of a single episode before handoff.
///
/// A local buffer is owned exclusively by one worker and is never shared:
/// the worker fills it during collection, sends it to the learner for a
/// merge, and continues with a fresh one. Its capacity is the episode
/// horizon; an episode must not exceed it.
#[derive(Debug)]
pub struct LocalBuffer<S, A> {
    horizon: usize,
    entries: Vec<Experience<S, A>>,
}

impl<S, A> LocalBuffer<S, A> {
    /// Creates an empty buffer for episodes of at most `horizon` steps.
    pub fn new(horizon: usize) -> Self {
        Self {
            horizon,
            entries: Vec::with_capacity(horizon),
        }
    }

    /// Appends one transition.
    pub fn push(&mut self, experience: Experience<S, A>) -> Result<(), ApexError> {
        if self.entries.len() >= self.horizon {
            return Err(ApexError::HorizonExceeded {
                horizon: self.horizon,
            });
        }
        self.entries.push(experience);
        Ok(())
    }

    /// Clears the buffer, keeping its allocation.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Moves all entries out of the buffer.
    pub fn drain(&mut self) -> std::vec::Drain<'_, Experience<S, A>> {
        self.entries.drain(..)
    }

    /// The episode horizon.
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Number of staged transitions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if no transitions are staged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::LocalBuffer;
    use crate::{ApexError, Experience};

    fn exp(reward: f32) -> Experience<f32, f32> {
        Experience {
            state: 0.0,
            action: 0.0,
            reward,
            next_state: 0.0,
            done: false,
            bootstrap_steps: 1,
        }
    }

    #[test]
    fn push_reset_drain() {
        let mut local = LocalBuffer::new(3);
        local.push(exp(1.0)).unwrap();
        local.push(exp(2.0)).unwrap();
        assert_eq!(local.len(), 2);

        local.reset();
        assert!(local.is_empty());

        local.push(exp(3.0)).unwrap();
        let drained: Vec<_> = local.drain().collect();
        assert_eq!(drained.len(), 1);
        assert!(local.is_empty());
    }

    #[test]
    fn horizon_is_enforced() {
        let mut local = LocalBuffer::new(1);
        local.push(exp(1.0)).unwrap();
        assert_eq!(
            local.push(exp(2.0)),
            Err(ApexError::HorizonExceeded { horizon: 1 })
        );
    }
}
