use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::domain::Product;

/// Label shown next to a product whose availability is unknown.
pub const UNKNOWN_AVAILABILITY: &str = "...";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum InventoryError {
    #[error("Inventory request failed: {0}")]
    Request(String),
    #[error("Inventory service returned status {0}")]
    Status(u16),
    #[error("Malformed inventory response: {0}")]
    MalformedResponse(String),
}

/// Available quantity per lowercased product name, as free text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory(BTreeMap<String, String>);

impl Inventory {
    /// Mapping used when the ledger has no inventory rows at all.
    pub fn fallback() -> Self {
        Self(BTreeMap::from([
            ("wheat".to_string(), "100".to_string()),
            ("alfalfa".to_string(), "50".to_string()),
        ]))
    }

    /// Builds a mapping from ledger rows of `[name, quantity]`.
    ///
    /// Names are trimmed and lowercased, a missing quantity reads as `"0"`,
    /// rows without a name are skipped, and an empty result becomes the
    /// fallback mapping.
    pub fn from_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator<Item = Vec<S>>,
        S: AsRef<str>,
    {
        let mut map = BTreeMap::new();
        for row in rows {
            let Some(name) = row.first().map(|n| n.as_ref().trim().to_lowercase()) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            let quantity = row
                .get(1)
                .map(|q| q.as_ref().trim().to_string())
                .filter(|q| !q.is_empty())
                .unwrap_or_else(|| "0".to_string());
            map.insert(name, quantity);
        }
        if map.is_empty() {
            Self::fallback()
        } else {
            Self(map)
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Availability text for a product choice.
    pub fn label_for(&self, product: Product) -> &str {
        self.get(product.as_str()).unwrap_or(UNKNOWN_AVAILABILITY)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Read-only source of inventory levels.
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn fetch(&self) -> Result<Inventory, InventoryError>;
}

#[derive(Debug, Deserialize)]
struct InventoryResponse {
    #[serde(default)]
    inventory: Inventory,
}

pub struct HttpInventorySource {
    http: reqwest::Client,
    url: String,
}

impl HttpInventorySource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, InventoryError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InventoryError::Request(e.to_string()))?;
        Ok(Self { http, url: url.into() })
    }
}

#[async_trait]
impl InventorySource for HttpInventorySource {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<Inventory, InventoryError> {
        debug!("Fetching inventory");
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| InventoryError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InventoryError::Status(status.as_u16()));
        }
        let body = response
            .text()
            .await
            .map_err(|e| InventoryError::Request(e.to_string()))?;
        parse_inventory(&body)
    }
}

pub fn parse_inventory(body: &str) -> Result<Inventory, InventoryError> {
    let parsed: InventoryResponse =
        serde_json::from_str(body).map_err(|e| InventoryError::MalformedResponse(e.to_string()))?;
    Ok(Inventory(
        parsed
            .inventory
            .0
            .into_iter()
            .map(|(name, quantity)| (name.trim().to_lowercase(), quantity))
            .collect(),
    ))
}

/// Fetches inventory, degrading any failure to an empty mapping.
pub async fn load_inventory(source: &dyn InventorySource) -> Inventory {
    match source.fetch().await {
        Ok(inventory) => inventory,
        Err(e) => {
            warn!(error = %e, "Inventory load failed");
            Inventory::default()
        }
    }
}
