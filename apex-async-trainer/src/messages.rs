//! Messages passed between the training roles.
use apex_core::LocalBuffer;

/// One episode of experience handed from a worker to the learner.
///
/// The worker sends its whole local buffer by value and continues with a
/// fresh one, so collection never waits for the merge to complete.
pub struct MergeMessage<S, A> {
    /// Id of the worker that collected the episode.
    pub worker_id: usize,

    /// The staged episode.
    pub local: LocalBuffer<S, A>,
}
