//! # Mock Framework
//!
//! Scripted stand-ins for the remote services.
//!
//! Use [`create_mock_routing`] or [`create_mock_gateway`] to get a service
//! and a receiver. Every call made to the service shows up on the receiver
//! carrying a oneshot responder, so a test decides when and how each call
//! completes. Helpers like [`expect_route_call`] and [`expect_submission`]
//! pull the next call off the receiver.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::domain::{Coordinate, OrderPayload};
use crate::services::{RoutingError, RoutingService, SubmissionError, SubmissionGateway, SubmissionReceipt};

/// A routing lookup waiting for the test to answer it.
#[derive(Debug)]
pub struct RouteCall {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub respond_to: oneshot::Sender<Result<f64, RoutingError>>,
}

pub struct MockRouting {
    calls: mpsc::Sender<RouteCall>,
}

#[async_trait]
impl RoutingService for MockRouting {
    async fn driving_distance_meters(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<f64, RoutingError> {
        let (respond_to, response) = oneshot::channel();
        self.calls
            .send(RouteCall { origin, destination, respond_to })
            .await
            .map_err(|_| RoutingError::Request("mock receiver closed".to_string()))?;
        response
            .await
            .map_err(|_| RoutingError::Request("mock responder dropped".to_string()))?
    }
}

/// Creates a mock routing service and the receiver its calls arrive on.
pub fn create_mock_routing(buffer_size: usize) -> (Arc<MockRouting>, mpsc::Receiver<RouteCall>) {
    let (calls, receiver) = mpsc::channel(buffer_size);
    (Arc::new(MockRouting { calls }), receiver)
}

/// Helper to wait for the next routing lookup
pub async fn expect_route_call(receiver: &mut mpsc::Receiver<RouteCall>) -> Option<RouteCall> {
    receiver.recv().await
}

/// A submission waiting for the test to answer it.
#[derive(Debug)]
pub struct SubmissionCall {
    pub payload: OrderPayload,
    pub respond_to: oneshot::Sender<Result<SubmissionReceipt, SubmissionError>>,
}

pub struct MockGateway {
    calls: mpsc::Sender<SubmissionCall>,
}

#[async_trait]
impl SubmissionGateway for MockGateway {
    async fn submit(&self, payload: &OrderPayload) -> Result<SubmissionReceipt, SubmissionError> {
        let (respond_to, response) = oneshot::channel();
        self.calls
            .send(SubmissionCall { payload: payload.clone(), respond_to })
            .await
            .map_err(|_| SubmissionError::Request("mock receiver closed".to_string()))?;
        response
            .await
            .map_err(|_| SubmissionError::Request("mock responder dropped".to_string()))?
    }
}

/// Creates a mock submission gateway and the receiver its calls arrive on.
pub fn create_mock_gateway(buffer_size: usize) -> (Arc<MockGateway>, mpsc::Receiver<SubmissionCall>) {
    let (calls, receiver) = mpsc::channel(buffer_size);
    (Arc::new(MockGateway { calls }), receiver)
}

/// Helper to wait for the next submission
pub async fn expect_submission(receiver: &mut mpsc::Receiver<SubmissionCall>) -> Option<SubmissionCall> {
    receiver.recv().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_routing_round_trip() {
        let (routing, mut calls) = create_mock_routing(1);

        let lookup = tokio::spawn(async move {
            routing
                .driving_distance_meters(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 1.0))
                .await
        });

        let call = expect_route_call(&mut calls).await.expect("Expected route call");
        assert_eq!(call.destination, Coordinate::new(1.0, 1.0));
        call.respond_to.send(Ok(42.0)).unwrap();

        assert_eq!(lookup.await.unwrap(), Ok(42.0));
    }

    #[tokio::test]
    async fn test_dropped_responder_is_a_request_error() {
        let (routing, mut calls) = create_mock_routing(1);
        let lookup = tokio::spawn(async move {
            routing
                .driving_distance_meters(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 1.0))
                .await
        });
        drop(expect_route_call(&mut calls).await);
        assert!(matches!(lookup.await.unwrap(), Err(RoutingError::Request(_))));
    }
}
