//! Experience records.

/// A single transition taken from an environment.
///
/// An experience is immutable once it has been written into a buffer slot.
/// On overwrite, the whole record is replaced, never partially mutated.
#[derive(Clone, Debug, PartialEq)]
pub struct Experience<S, A> {
    /// Observation before the action was taken.
    pub state: S,

    /// Action taken by the policy.
    pub action: A,

    /// Immediate reward.
    pub reward: f32,

    /// Observation after the action was taken.
    pub next_state: S,

    /// `true` if the episode ended at this step.
    pub done: bool,

    /// Number of steps over which the target is bootstrapped.
    ///
    /// Carried along for n-step targets; the buffer neither interprets
    /// nor validates it.
    pub bootstrap_steps: u32,
}
