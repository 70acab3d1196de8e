use thiserror::Error;

/// Errors that can occur when talking to the distance resolver.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DistanceError {
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}
