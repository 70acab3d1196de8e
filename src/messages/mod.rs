use tokio::sync::oneshot;

use crate::distance_actor::{DistanceError, DistanceStatus};
use crate::domain::{Coordinate, DraftField};
use crate::session_actor::{SessionError, SessionView, SubmissionConfirmation};

/// Generic type aliases for service communication
pub type ServiceResult<T, E> = std::result::Result<T, E>;
pub type ServiceResponse<T, E> = oneshot::Sender<ServiceResult<T, E>>;

/// Typed message enums for actor communication. Each variant includes parameters
/// and a oneshot channel for responses.

#[derive(Debug)]
pub enum DistanceRequest {
    SetDestination {
        destination: Option<Coordinate>,
        respond_to: ServiceResponse<DistanceStatus, DistanceError>,
    },
    GetStatus {
        respond_to: ServiceResponse<DistanceStatus, DistanceError>,
    },
    Shutdown,
}

#[derive(Debug)]
pub enum SessionRequest {
    UpdateField {
        field: DraftField,
        value: String,
        respond_to: ServiceResponse<SessionView, SessionError>,
    },
    SetDestination {
        destination: Option<Coordinate>,
        respond_to: ServiceResponse<SessionView, SessionError>,
    },
    GetView {
        respond_to: ServiceResponse<SessionView, SessionError>,
    },
    Submit {
        respond_to: ServiceResponse<SubmissionConfirmation, SessionError>,
    },
    StartNewOrder {
        respond_to: ServiceResponse<SessionView, SessionError>,
    },
    /// Once-per-second countdown refresh while in cooldown.
    Tick,
    Shutdown,
}
