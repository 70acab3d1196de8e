//! Pure price calculation for the order form.
//!
//! Everything here is synchronous and total: missing or malformed input
//! degrades to a zero amount so the estimate can be recomputed on every
//! keystroke.

use crate::domain::{DeliveryMethod, OrderDraft, PriceBreakdown, Product, Unit};

/// Delivery charge per driven mile, in dollars.
pub const RATE_PER_MILE: f64 = 4.0;

/// The subset of form state the price depends on.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PricingInput {
    pub product: Option<Product>,
    pub quantity: Option<u32>,
    pub unit: Unit,
    pub delivery_method: DeliveryMethod,
    pub distance_miles: Option<f64>,
}

impl PricingInput {
    pub fn from_draft(draft: &OrderDraft, distance_miles: Option<f64>) -> Self {
        Self {
            product: draft.product,
            quantity: draft.quantity,
            unit: draft.unit,
            delivery_method: draft.delivery_method,
            distance_miles,
        }
    }
}

/// Computes subtotal, delivery fee and grand total.
pub fn quote(input: &PricingInput) -> PriceBreakdown {
    let product_subtotal = product_subtotal(input.product, input.quantity, input.unit);
    let delivery_fee = delivery_fee(input.delivery_method, input.distance_miles);
    PriceBreakdown {
        product_subtotal,
        delivery_fee,
        grand_total: product_subtotal + delivery_fee,
    }
}

pub fn product_subtotal(product: Option<Product>, quantity: Option<u32>, unit: Unit) -> f64 {
    match (product, quantity) {
        (Some(product), Some(quantity)) => {
            product.price_per_bale() * f64::from(quantity) * f64::from(unit.multiplier())
        }
        _ => 0.0,
    }
}

pub fn delivery_fee(method: DeliveryMethod, distance_miles: Option<f64>) -> f64 {
    match (method, distance_miles) {
        (DeliveryMethod::Delivered, Some(miles)) if miles.is_finite() => {
            round_cents(miles * RATE_PER_MILE)
        }
        _ => 0.0,
    }
}

/// Parses a raw quantity; anything that is not a positive integer is absent.
pub fn parse_quantity(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|q| *q > 0)
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Formats a dollar amount for display, e.g. `$5,101.20`.
pub fn format_usd(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let (sign, cents) = if cents < 0 { ("-", -cents) } else { ("", cents) };
    let dollars = (cents / 100).to_string();
    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, ch) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}
