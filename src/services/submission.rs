use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::domain::{DeliveryMethod, OrderPayload};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SubmissionError {
    #[error("Submission request failed: {0}")]
    Request(String),
    #[error("Submission rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// What the endpoint told us about an accepted order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    /// Informational note, e.g. when the ledger could not be written.
    pub warning: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    warning: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Backend that accepts finished orders.
#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    async fn submit(&self, payload: &OrderPayload) -> Result<SubmissionReceipt, SubmissionError>;
}

/// POSTs orders as JSON to the configured submission URL.
pub struct HttpSubmissionGateway {
    http: reqwest::Client,
    url: String,
}

impl HttpSubmissionGateway {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SubmissionError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubmissionError::Request(e.to_string()))?;
        Ok(Self { http, url: url.into() })
    }
}

#[async_trait]
impl SubmissionGateway for HttpSubmissionGateway {
    #[instrument(skip(self, payload), fields(url = %self.url))]
    async fn submit(&self, payload: &OrderPayload) -> Result<SubmissionReceipt, SubmissionError> {
        debug!("Posting order");
        let response = self
            .http
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| SubmissionError::Request(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        interpret_response(status.as_u16(), &body)
    }
}

/// Maps an HTTP status and body to a receipt or an error.
pub fn interpret_response(status: u16, body: &str) -> Result<SubmissionReceipt, SubmissionError> {
    let parsed: SubmitResponse = serde_json::from_str(body).unwrap_or_default();
    if !(200..300).contains(&status) {
        return Err(SubmissionError::Rejected {
            status,
            message: parsed.error.unwrap_or_else(|| "Failed to process submission".to_string()),
        });
    }
    if let Some(warning) = &parsed.warning {
        warn!(warning = %warning, "Submission accepted with warning");
    }
    Ok(SubmissionReceipt { warning: parsed.warning })
}

/// One row of the operator's order ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerRow {
    pub timestamp: String,
    pub name: String,
    pub phone: String,
    pub product: String,
    pub quantity: String,
    pub unit: String,
    pub fulfillment: String,
    pub notes: String,
}

impl LedgerRow {
    pub fn from_payload(payload: &OrderPayload, at: DateTime<Utc>) -> Self {
        let draft = &payload.draft;
        let fulfillment = match draft.delivery_method {
            DeliveryMethod::Pickup => "Pickup".to_string(),
            DeliveryMethod::Delivered => draft.address.clone().unwrap_or_default(),
        };
        Self {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            name: draft.full_name(),
            phone: draft.phone.clone(),
            product: draft.product.map(|p| p.to_string()).unwrap_or_default(),
            quantity: draft.quantity.map(|q| q.to_string()).unwrap_or_default(),
            unit: draft.unit.to_string(),
            fulfillment,
            notes: draft.notes.clone().unwrap_or_default(),
        }
    }

    /// Cells in ledger column order (A through H).
    pub fn cells(&self) -> [&str; 8] {
        [
            self.timestamp.as_str(),
            self.name.as_str(),
            self.phone.as_str(),
            self.product.as_str(),
            self.quantity.as_str(),
            self.unit.as_str(),
            self.fulfillment.as_str(),
            self.notes.as_str(),
        ]
    }
}
