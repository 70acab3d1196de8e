use thiserror::Error;

use super::state::SubmitBlocker;
use crate::services::SubmissionError;

/// Errors that can occur during order session operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    #[error("Order validation error: {0}")]
    Validation(String),
    #[error("Order cannot be submitted yet: {0}")]
    NotReady(SubmitBlocker),
    #[error("The form is locked while {0}")]
    Locked(&'static str),
    #[error("A new order can be started in {remaining_secs}s")]
    CooldownActive { remaining_secs: u64 },
    #[error("There is no completed order to move on from")]
    NoCompletedOrder,
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}
