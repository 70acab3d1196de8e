use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::draft::OrderDraft;

/// Price estimate derived from the draft and the resolved distance.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub product_subtotal: f64,
    pub delivery_fee: f64,
    pub grand_total: f64,
}

/// Body POSTed to the submission endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    #[serde(flatten)]
    pub draft: OrderDraft,
    pub distance: Option<f64>,
    pub delivery_fee: f64,
    pub product_subtotal: f64,
    pub grand_total: f64,
}

impl OrderPayload {
    pub fn new(draft: OrderDraft, distance: Option<f64>, breakdown: PriceBreakdown) -> Self {
        Self {
            draft,
            distance,
            delivery_fee: breakdown.delivery_fee,
            product_subtotal: breakdown.product_subtotal,
            grand_total: breakdown.grand_total,
        }
    }
}

/// What is remembered about the last successful submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub completed_at: DateTime<Utc>,
    pub draft: OrderDraft,
    pub grand_total: f64,
}
