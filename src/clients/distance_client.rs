use tokio::sync::mpsc;

use super::macros::{client_method, client_signal};
use crate::distance_actor::{DistanceError, DistanceStatus};
use crate::domain::Coordinate;
use crate::messages::DistanceRequest;

/// Handle to the distance resolver actor.
#[derive(Clone)]
pub struct DistanceClient {
    sender: mpsc::Sender<DistanceRequest>,
}

impl DistanceClient {
    pub fn new(sender: mpsc::Sender<DistanceRequest>) -> Self {
        Self { sender }
    }
}

client_method!(DistanceClient => fn set_destination(destination: Option<Coordinate>) -> DistanceStatus as DistanceRequest::SetDestination, Error = DistanceError);
client_method!(DistanceClient => fn status() -> DistanceStatus as DistanceRequest::GetStatus, Error = DistanceError);
client_signal!(DistanceClient => fn shutdown() as DistanceRequest::Shutdown, Error = DistanceError);
