use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::domain::Coordinate;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RoutingError {
    #[error("Routing request failed: {0}")]
    Request(String),
    #[error("Routing service returned status {0}")]
    Status(u16),
    #[error("Malformed routing response: {0}")]
    MalformedResponse(String),
    #[error("No route between origin and destination")]
    NoRoute,
}

/// Driving-distance lookup between two points.
#[async_trait]
pub trait RoutingService: Send + Sync {
    /// Distance in meters of the first candidate driving route.
    async fn driving_distance_meters(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<f64, RoutingError>;
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    distance: f64,
}

/// Client for a Mapbox-compatible directions API.
pub struct MapboxRouting {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl MapboxRouting {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>, timeout: Duration) -> Result<Self, RoutingError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RoutingError::Request(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    fn directions_url(&self, origin: Coordinate, destination: Coordinate) -> String {
        format!(
            "{}/directions/v5/mapbox/driving/{};{}",
            self.base_url, origin, destination
        )
    }
}

#[async_trait]
impl RoutingService for MapboxRouting {
    #[instrument(skip(self))]
    async fn driving_distance_meters(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<f64, RoutingError> {
        debug!("Sending directions request");
        let response = self
            .http
            .get(self.directions_url(origin, destination))
            .query(&[("access_token", self.access_token.as_str())])
            .send()
            .await
            .map_err(|e| RoutingError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RoutingError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RoutingError::Request(e.to_string()))?;
        first_route_meters(&body)
    }
}

/// Extracts the first route's distance from a directions response body.
pub fn first_route_meters(body: &str) -> Result<f64, RoutingError> {
    let parsed: DirectionsResponse =
        serde_json::from_str(body).map_err(|e| RoutingError::MalformedResponse(e.to_string()))?;
    let route = parsed.routes.into_iter().next().ok_or(RoutingError::NoRoute)?;
    if route.distance.is_finite() && route.distance >= 0.0 {
        Ok(route.distance)
    } else {
        Err(RoutingError::MalformedResponse(format!("distance {}", route.distance)))
    }
}
