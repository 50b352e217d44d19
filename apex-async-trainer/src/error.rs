//! Errors of the asynchronous trainer.
use thiserror::Error;

/// Errors raised while running the asynchronous training roles.
#[derive(Debug, Error)]
pub enum AsyncTrainError {
    /// The learner thread panicked instead of returning a result.
    #[error("the learner thread panicked")]
    LearnerPanicked,

    /// The evaluation thread panicked.
    #[error("the evaluation thread panicked")]
    EvalPanicked,
}
