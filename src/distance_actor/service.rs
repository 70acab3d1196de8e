use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn, Instrument};

use super::error::DistanceError;
use super::status::DistanceStatus;
use crate::clients::DistanceClient;
use crate::domain::{meters_to_miles, Coordinate};
use crate::messages::{DistanceRequest, ServiceResponse};
use crate::services::{RoutingError, RoutingService};

/// Result of one routing lookup, tagged with the token it was issued under.
#[derive(Debug)]
struct RouteCompletion {
    token: u64,
    result: Result<f64, RoutingError>,
}

/// Resolves the driving distance from the warehouse to the current destination.
///
/// Each destination change issues a new token. Lookups run as background
/// tasks and report back through an internal channel; a completion is only
/// applied when its token is still the latest one, so a slow response for an
/// old address can never overwrite the distance for a newer one.
pub struct DistanceService {
    receiver: mpsc::Receiver<DistanceRequest>,
    routing: Arc<dyn RoutingService>,
    origin: Coordinate,
    completions_tx: mpsc::UnboundedSender<RouteCompletion>,
    completions_rx: mpsc::UnboundedReceiver<RouteCompletion>,
    destination: Option<Coordinate>,
    latest_token: u64,
    status: DistanceStatus,
}

impl DistanceService {
    pub fn new(buffer_size: usize, routing: Arc<dyn RoutingService>, origin: Coordinate) -> (Self, DistanceClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let service = Self {
            receiver,
            routing,
            origin,
            completions_tx,
            completions_rx,
            destination: None,
            latest_token: 0,
            status: DistanceStatus::Unknown,
        };
        (service, DistanceClient::new(sender))
    }

    #[instrument(name = "distance_service", skip(self), fields(origin = %self.origin))]
    pub async fn run(mut self) {
        info!("DistanceService starting");

        loop {
            tokio::select! {
                msg = self.receiver.recv() => match msg {
                    Some(DistanceRequest::SetDestination { destination, respond_to }) => {
                        self.handle_set_destination(destination, respond_to);
                    }
                    Some(DistanceRequest::GetStatus { respond_to }) => {
                        let _ = respond_to.send(Ok(self.status));
                    }
                    Some(DistanceRequest::Shutdown) => {
                        info!("DistanceService shutting down");
                        break;
                    }
                    None => break,
                },
                Some(completion) = self.completions_rx.recv() => {
                    self.handle_route_completion(completion);
                }
            }
        }

        info!("DistanceService stopped");
    }

    #[instrument(skip(self, respond_to))]
    fn handle_set_destination(
        &mut self,
        destination: Option<Coordinate>,
        respond_to: ServiceResponse<DistanceStatus, DistanceError>,
    ) {
        if destination == self.destination {
            debug!("Destination unchanged");
            let _ = respond_to.send(Ok(self.status));
            return;
        }

        self.destination = destination;
        self.latest_token += 1;

        match destination {
            None => {
                debug!(token = self.latest_token, "Destination cleared");
                self.status = DistanceStatus::Unknown;
            }
            Some(destination) => {
                info!(token = self.latest_token, "Resolving driving distance");
                self.status = DistanceStatus::Calculating;
                self.spawn_lookup(self.latest_token, destination);
            }
        }

        let _ = respond_to.send(Ok(self.status));
    }

    fn spawn_lookup(&self, token: u64, destination: Coordinate) {
        let routing = Arc::clone(&self.routing);
        let origin = self.origin;
        let completions = self.completions_tx.clone();
        let span = tracing::debug_span!("route_lookup", token, %destination);

        tokio::spawn(
            async move {
                let result = routing.driving_distance_meters(origin, destination).await;
                let _ = completions.send(RouteCompletion { token, result });
            }
            .instrument(span),
        );
    }

    #[instrument(fields(token = completion.token), skip(self, completion))]
    fn handle_route_completion(&mut self, completion: RouteCompletion) {
        if completion.token != self.latest_token {
            debug!(latest = self.latest_token, "Dropping stale route response");
            return;
        }

        self.status = match completion.result {
            Ok(meters) => {
                let miles = meters_to_miles(meters);
                info!(miles, "Distance resolved");
                DistanceStatus::Resolved { miles }
            }
            Err(e) => {
                warn!(error = %e, "Distance lookup failed");
                DistanceStatus::Unknown
            }
        };
    }
}
