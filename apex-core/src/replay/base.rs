//! Proportional prioritized replay buffer.
use super::{IwScheduler, LocalBuffer, PriorityTree, ReplayConfig};
use crate::{ApexError, Experience};
use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Additive constant keeping zero-error transitions sampleable.
const PRIORITY_EPS: f32 = 1e-8;

/// A batch drawn from a [`PrioritizedReplayBuffer`].
///
/// Besides the experiences themselves the batch carries the bookkeeping
/// needed to write updated priorities back after a training step: the slot
/// of every sample and the generation of that slot at sampling time.
#[derive(Clone, Debug)]
pub struct SampledBatch<S, A> {
    /// Sampled experiences, cloned out of the buffer.
    pub experiences: Vec<Experience<S, A>>,

    /// Slot index of every sample.
    pub slots: Vec<usize>,

    /// Generation of every sampled slot, used to discard stale priority
    /// updates after the slot has been overwritten.
    pub generations: Vec<u64>,

    /// Stored priority of every sample at sampling time.
    pub priorities: Vec<f32>,

    /// Importance sampling weights, normalized so that the largest is 1.
    pub weights: Vec<f32>,

    /// The beta exponent used to compute the weights.
    pub beta: f32,
}

impl<S, A> SampledBatch<S, A> {
    /// Number of samples in the batch.
    pub fn len(&self) -> usize {
        self.experiences.len()
    }

    /// `true` if the batch holds no samples.
    pub fn is_empty(&self) -> bool {
        self.experiences.is_empty()
    }
}

/// Fixed-capacity circular store of experiences paired 1:1 with a
/// [`PriorityTree`].
///
/// The buffer is a circular log, not a set: a write pointer advances in
/// ring order and wraps, silently discarding the oldest entry once full.
/// Sampling is stratified over the cumulative priority mass, which
/// guarantees full-range coverage and reduces batch-to-batch variance
/// compared with i.i.d. draws.
pub struct PrioritizedReplayBuffer<S, A> {
    capacity: usize,
    size: usize,
    write_index: usize,
    min_size_to_learn: usize,
    entries: Vec<Experience<S, A>>,
    generations: Vec<u64>,
    tree: PriorityTree,
    iw_scheduler: IwScheduler,
    alpha: f32,
    rng: StdRng,
}

impl<S, A> PrioritizedReplayBuffer<S, A>
where
    S: Clone + std::fmt::Debug,
    A: Clone + std::fmt::Debug,
{
    /// Creates an empty buffer from the given configuration.
    pub fn build(config: &ReplayConfig) -> Self {
        assert!(
            config.min_size_to_learn <= config.capacity,
            "min_size_to_learn must not exceed capacity"
        );
        Self {
            capacity: config.capacity,
            size: 0,
            write_index: 0,
            min_size_to_learn: config.min_size_to_learn,
            entries: Vec::with_capacity(config.capacity),
            generations: vec![0; config.capacity],
            tree: PriorityTree::new(config.capacity, config.per.priority_ceiling),
            iw_scheduler: IwScheduler::new(
                config.per.beta_0,
                config.per.beta_final,
                config.per.n_samples_final,
            ),
            alpha: config.per.alpha,
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    /// Current number of stored transitions.
    pub fn len(&self) -> usize {
        self.size
    }

    /// `true` if no transitions are stored.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Maximum number of transitions that can be stored.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `true` once enough transitions are stored to sample batches.
    pub fn good_to_learn(&self) -> bool {
        self.size >= self.min_size_to_learn
    }

    /// The priority tree paired with this buffer.
    pub fn tree(&self) -> &PriorityTree {
        &self.tree
    }

    /// The experience stored at `slot`, if the slot has been written.
    pub fn get(&self, slot: usize) -> Option<&Experience<S, A>> {
        self.entries.get(slot)
    }

    /// Inserts one transition with the given raw priority.
    ///
    /// Writes at the current write index, overwriting the previous
    /// occupant wholesale, and advances the ring pointer.
    pub fn insert(&mut self, experience: Experience<S, A>, priority: f32) -> Result<(), ApexError> {
        let stored = self.transform(priority);
        self.insert_stored(experience, stored)
    }

    /// Appends every entry of a local buffer, assigning each the current
    /// bootstrap priority so that fresh experience is sampled soon.
    pub fn merge(&mut self, local: &mut LocalBuffer<S, A>) -> Result<usize, ApexError> {
        let bootstrap = self.tree.max_priority();
        let n = local.len();
        let staged: Vec<_> = local.drain().collect();
        for experience in staged {
            self.insert_stored(experience, bootstrap)?;
        }
        debug!("merged {} transitions at priority {}", n, bootstrap);
        Ok(n)
    }

    /// Samples `n` transitions, one per equal-width segment of the
    /// cumulative priority mass.
    ///
    /// Fails with [`ApexError::InsufficientData`] until the buffer holds
    /// `min_size_to_learn` transitions. Each call advances the beta
    /// schedule by one step.
    pub fn sample_batch(&mut self, n: usize) -> Result<SampledBatch<S, A>, ApexError> {
        assert!(n > 0, "batch size must be positive");
        if !self.good_to_learn() {
            return Err(ApexError::InsufficientData {
                len: self.size,
                min: self.min_size_to_learn,
            });
        }

        let total = self.tree.total_priority();
        let segment = total / n as f32;
        let beta = self.iw_scheduler.beta();

        let mut experiences = Vec::with_capacity(n);
        let mut slots = Vec::with_capacity(n);
        let mut generations = Vec::with_capacity(n);
        let mut priorities = Vec::with_capacity(n);

        for i in 0..n {
            let u: f32 = self.rng.gen();
            // Clamp the draw into [0, total); the tree walk requires it.
            let target = ((i as f32 + u) * segment).min(total * (1.0 - f32::EPSILON));
            let (slot, priority) = self.tree.sample_by_mass(target);
            experiences.push(self.entries[slot].clone());
            slots.push(slot);
            generations.push(self.generations[slot]);
            priorities.push(priority);
        }

        // w_i = (N * P(i))^-beta, normalized by the largest weight of the
        // batch to keep gradient scales bounded.
        let n_over_total = self.size as f32 / total;
        let raw: Vec<f32> = priorities
            .iter()
            .map(|&p| (n_over_total * p).powf(-beta))
            .collect();
        let w_max = raw.iter().fold(f32::MIN, |m, &w| w.max(m));
        let weights = raw.iter().map(|w| w / w_max).collect();

        self.iw_scheduler.add_n_samples();

        Ok(SampledBatch {
            experiences,
            slots,
            generations,
            priorities,
            weights,
            beta,
        })
    }

    /// Writes updated priorities back after a training step.
    ///
    /// An entry whose slot generation has changed since the batch was
    /// sampled refers to an overwritten experience; such stale updates are
    /// silently discarded, which is expected under concurrent merges and
    /// not an error.
    pub fn update_priorities(
        &mut self,
        slots: &[usize],
        generations: &[u64],
        errors: &[f32],
    ) -> Result<(), ApexError> {
        debug_assert_eq!(slots.len(), generations.len());
        debug_assert_eq!(slots.len(), errors.len());

        for ((&slot, &generation), &error) in slots.iter().zip(generations).zip(errors) {
            if slot >= self.capacity {
                return Err(ApexError::InvalidSlot {
                    slot,
                    capacity: self.capacity,
                });
            }
            if self.generations[slot] != generation {
                debug!("discarding stale priority update for slot {}", slot);
                continue;
            }
            let stored = self.transform(error);
            self.tree.update(slot, stored)?;
        }

        Ok(())
    }

    /// Writes the per-sample priorities of a training step back for the
    /// batch they were computed on.
    pub fn update_from_batch(
        &mut self,
        batch: &SampledBatch<S, A>,
        errors: &[f32],
    ) -> Result<(), ApexError> {
        self.update_priorities(&batch.slots, &batch.generations, errors)
    }

    /// `(|p| + eps)^alpha`, applied at the buffer boundary so that the
    /// tree itself stores plain scalars.
    fn transform(&self, priority: f32) -> f32 {
        (priority.abs() + PRIORITY_EPS).powf(self.alpha)
    }

    fn insert_stored(
        &mut self,
        experience: Experience<S, A>,
        stored_priority: f32,
    ) -> Result<(), ApexError> {
        let slot = self.write_index;
        if self.entries.len() < self.capacity {
            self.entries.push(experience);
        } else {
            self.entries[slot] = experience;
        }
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.tree.update(slot, stored_priority)?;

        self.write_index = (slot + 1) % self.capacity;
        if self.size < self.capacity {
            self.size += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::PrioritizedReplayBuffer;
    use crate::{ApexError, Experience, LocalBuffer, PerConfig, ReplayConfig};

    fn exp(reward: f32) -> Experience<f32, f32> {
        Experience {
            state: reward,
            action: 0.0,
            reward,
            next_state: reward + 1.0,
            done: false,
            bootstrap_steps: 1,
        }
    }

    fn config(capacity: usize, min: usize) -> ReplayConfig {
        ReplayConfig::default()
            .capacity(capacity)
            .min_size_to_learn(min)
            // alpha = 1 keeps stored priorities equal to raw ones, which
            // makes the expectations below exact.
            .per(PerConfig::default().alpha(1.0))
    }

    #[test]
    fn ring_overwrite() {
        let mut buffer = PrioritizedReplayBuffer::build(&config(4, 1));
        for i in 0..4 {
            buffer.insert(exp(i as f32), 1.0).unwrap();
        }
        assert_eq!(buffer.len(), 4);

        buffer.insert(exp(100.0), 1.0).unwrap();
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.get(0).unwrap().reward, 100.0);
        assert_eq!(buffer.get(1).unwrap().reward, 1.0);
    }

    #[test]
    fn insufficient_data_then_success() {
        let mut buffer = PrioritizedReplayBuffer::build(&config(8, 2));
        assert_eq!(
            buffer.sample_batch(2).err(),
            Some(ApexError::InsufficientData { len: 0, min: 2 })
        );

        buffer.insert(exp(0.0), 1.0).unwrap();
        buffer.insert(exp(1.0), 1.0).unwrap();
        let batch = buffer.sample_batch(2).unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn stratified_sampling_covers_the_occupied_range() {
        let mut buffer = PrioritizedReplayBuffer::build(&config(64, 1));
        for i in 0..64 {
            buffer.insert(exp(i as f32), 1.0).unwrap();
        }

        // With uniform priorities, sample i must come from the i-th of the
        // equal-width segments, i.e. a band of 4 slots.
        let batch = buffer.sample_batch(16).unwrap();
        for (i, &slot) in batch.slots.iter().enumerate() {
            assert!(
                slot >= i * 4 && slot < (i + 1) * 4,
                "sample {} fell into slot {}",
                i,
                slot
            );
        }
    }

    #[test]
    fn importance_weights_are_normalized() {
        let mut buffer = PrioritizedReplayBuffer::build(&config(16, 1));
        for i in 0..16 {
            buffer.insert(exp(i as f32), 0.5 + i as f32).unwrap();
        }

        let batch = buffer.sample_batch(8).unwrap();
        let max = batch.weights.iter().fold(f32::MIN, |m, &w| w.max(m));
        assert!((max - 1.0).abs() < 1e-6);
        assert!(batch.weights.iter().all(|&w| w > 0.0 && w <= 1.0));
    }

    #[test]
    fn merge_assigns_bootstrap_priority() {
        let mut buffer = PrioritizedReplayBuffer::build(&config(8, 1));
        buffer.insert(exp(0.0), 3.0).unwrap();

        let mut local = LocalBuffer::new(4);
        local.push(exp(1.0)).unwrap();
        local.push(exp(2.0)).unwrap();
        assert_eq!(buffer.merge(&mut local).unwrap(), 2);
        assert!(local.is_empty());

        assert_eq!(buffer.len(), 3);
        // Both merged entries carry the maximum stored priority.
        let p = buffer.tree().priority(1).unwrap();
        assert!((p - buffer.tree().priority(2).unwrap()).abs() < 1e-6);
        assert!((p - 3.0).abs() < 1e-3);
    }

    #[test]
    fn stale_priority_updates_are_discarded() {
        let mut buffer = PrioritizedReplayBuffer::build(&config(2, 1));
        buffer.insert(exp(0.0), 1.0).unwrap();
        buffer.insert(exp(1.0), 1.0).unwrap();

        let batch = buffer.sample_batch(2).unwrap();

        // A concurrent merge reuses both slots before the batch's
        // priorities are written back.
        let mut local = LocalBuffer::new(2);
        local.push(exp(10.0)).unwrap();
        local.push(exp(11.0)).unwrap();
        buffer.merge(&mut local).unwrap();

        let before: Vec<f32> = (0..2).map(|s| buffer.tree().priority(s).unwrap()).collect();
        buffer
            .update_from_batch(&batch, &[999.0, 999.0])
            .unwrap();
        let after: Vec<f32> = (0..2).map(|s| buffer.tree().priority(s).unwrap()).collect();
        assert_eq!(before, after);

        // A batch sampled after the overwrite carries fresh generations
        // and its updates do apply.
        let batch = buffer.sample_batch(2).unwrap();
        buffer.update_from_batch(&batch, &[999.0, 999.0]).unwrap();
        assert!(buffer.tree().priority(batch.slots[0]).unwrap() > 900.0);
    }

    #[test]
    fn invalid_slot_in_update() {
        let mut buffer = PrioritizedReplayBuffer::build(&config(2, 1));
        buffer.insert(exp(0.0), 1.0).unwrap();
        assert_eq!(
            buffer.update_priorities(&[5], &[1], &[1.0]).err(),
            Some(ApexError::InvalidSlot {
                slot: 5,
                capacity: 2
            })
        );
    }
}
