use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::{CompletionRecord, DraftField, FieldChange, OrderDraft};
use crate::storage::{KeyValueStore, StorageError};

pub const DRAFT_KEY_PREFIX: &str = "form_";
pub const COMPLETED_AT_KEY: &str = "order_completed_at";
pub const SNAPSHOT_KEY: &str = "order_snapshot";
pub const TOTAL_KEY: &str = "order_total";

pub fn draft_key(field: DraftField) -> String {
    format!("{}{}", DRAFT_KEY_PREFIX, field.name())
}

/// The session's view of durable storage: one expiring key per draft field
/// and three permanent keys for the last completed order.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    draft_ttl: Duration,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>, draft_ttl: Duration) -> Self {
        Self { store, draft_ttl }
    }

    /// Persists one field edit, refreshing its expiry.
    pub async fn save_field(&self, field: DraftField, change: &FieldChange) -> Result<(), StorageError> {
        let key = draft_key(field);
        match change {
            FieldChange::Set(value) => self.store.set(&key, value.clone(), Some(self.draft_ttl)).await,
            FieldChange::Cleared => self.store.remove(&key).await,
        }
    }

    /// Rebuilds a draft from whatever fields are still stored.
    /// Values that no longer parse are skipped.
    pub async fn restore_draft(&self) -> Result<OrderDraft, StorageError> {
        let mut draft = OrderDraft::default();
        for field in DraftField::ALL {
            if let Some(value) = self.store.get(&draft_key(field)).await? {
                if let Err(e) = draft.apply(field, &value) {
                    warn!(field = %field, error = %e, "Skipping unreadable stored field");
                }
            }
        }
        Ok(draft)
    }

    pub async fn clear_draft(&self) -> Result<(), StorageError> {
        for field in DraftField::ALL {
            self.store.remove(&draft_key(field)).await?;
        }
        Ok(())
    }

    pub async fn save_completion(&self, record: &CompletionRecord) -> Result<(), StorageError> {
        let snapshot = serde_json::to_string(&record.draft)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store
            .set(COMPLETED_AT_KEY, record.completed_at.timestamp_millis().to_string(), None)
            .await?;
        self.store.set(SNAPSHOT_KEY, snapshot, None).await?;
        self.store.set(TOTAL_KEY, record.grand_total.to_string(), None).await
    }

    /// Loads the last completion. The timestamp is authoritative; a damaged
    /// snapshot or total degrades to an empty draft or zero.
    pub async fn load_completion(&self) -> Result<Option<CompletionRecord>, StorageError> {
        let Some(raw_at) = self.store.get(COMPLETED_AT_KEY).await? else {
            return Ok(None);
        };
        let Some(completed_at) = raw_at
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
        else {
            warn!(value = %raw_at, "Ignoring unreadable completion timestamp");
            return Ok(None);
        };

        let draft = match self.store.get(SNAPSHOT_KEY).await? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Unreadable order snapshot");
                OrderDraft::default()
            }),
            None => OrderDraft::default(),
        };
        let grand_total = self
            .store
            .get(TOTAL_KEY)
            .await?
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|total| total.is_finite())
            .unwrap_or(0.0);

        Ok(Some(CompletionRecord { completed_at, draft, grand_total }))
    }

    pub async fn clear_completion(&self) -> Result<(), StorageError> {
        self.store.remove(COMPLETED_AT_KEY).await?;
        self.store.remove(SNAPSHOT_KEY).await?;
        self.store.remove(TOTAL_KEY).await
    }
}
