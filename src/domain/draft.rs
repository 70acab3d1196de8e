use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::product::{DeliveryMethod, Product, Unit};

/// In-progress order form state.
///
/// Every field is optional or defaulted so that a half-filled form is still a
/// valid value. Completeness is checked by [`OrderDraft::missing_fields`]
/// right before submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub product: Option<Product>,
    pub quantity: Option<u32>,
    pub unit: Unit,
    pub delivery_method: DeliveryMethod,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// A single editable field of the draft. Each one is persisted under its own key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftField {
    FirstName,
    LastName,
    Email,
    Phone,
    Product,
    Quantity,
    Unit,
    DeliveryMethod,
    Address,
    Notes,
}

impl DraftField {
    pub const ALL: [DraftField; 10] = [
        DraftField::FirstName,
        DraftField::LastName,
        DraftField::Email,
        DraftField::Phone,
        DraftField::Product,
        DraftField::Quantity,
        DraftField::Unit,
        DraftField::DeliveryMethod,
        DraftField::Address,
        DraftField::Notes,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DraftField::FirstName => "firstName",
            DraftField::LastName => "lastName",
            DraftField::Email => "email",
            DraftField::Phone => "phone",
            DraftField::Product => "product",
            DraftField::Quantity => "quantity",
            DraftField::Unit => "unit",
            DraftField::DeliveryMethod => "deliveryMethod",
            DraftField::Address => "address",
            DraftField::Notes => "notes",
        }
    }
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DraftField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DraftField::ALL
            .into_iter()
            .find(|field| field.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown field: {}", s))
    }
}

/// Outcome of applying raw input to a draft field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    /// The field now holds this value, which should be persisted.
    Set(String),
    /// The field was emptied or held unusable input; its stored value should be dropped.
    Cleared,
}

impl OrderDraft {
    /// Applies raw user input to one field.
    ///
    /// Enumerated fields reject unknown values and leave the draft untouched.
    /// A non-numeric or non-positive quantity clears the quantity instead of
    /// failing, so the price degrades to zero.
    pub fn apply(&mut self, field: DraftField, raw: &str) -> Result<FieldChange, String> {
        let value = raw.trim();
        let change = match field {
            DraftField::FirstName => set_text(&mut self.first_name, value),
            DraftField::LastName => set_text(&mut self.last_name, value),
            DraftField::Email => set_text(&mut self.email, value),
            DraftField::Phone => set_text(&mut self.phone, &format_phone(value)),
            DraftField::Address => set_optional(&mut self.address, value),
            DraftField::Notes => set_optional(&mut self.notes, value),
            DraftField::Product => {
                if value.is_empty() {
                    self.product = None;
                    FieldChange::Cleared
                } else {
                    let product: Product = value.parse()?;
                    self.product = Some(product);
                    FieldChange::Set(product.to_string())
                }
            }
            DraftField::Quantity => match crate::pricing::parse_quantity(value) {
                Some(quantity) => {
                    self.quantity = Some(quantity);
                    FieldChange::Set(quantity.to_string())
                }
                None => {
                    self.quantity = None;
                    FieldChange::Cleared
                }
            },
            DraftField::Unit => {
                let unit: Unit = value.parse()?;
                self.unit = unit;
                FieldChange::Set(unit.to_string())
            }
            DraftField::DeliveryMethod => {
                let method: DeliveryMethod = value.parse()?;
                self.delivery_method = method;
                FieldChange::Set(method.to_string())
            }
        };
        Ok(change)
    }

    /// Names of the fields that block submission, in form order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.first_name.is_empty() {
            missing.push(DraftField::FirstName.name());
        }
        if self.last_name.is_empty() {
            missing.push(DraftField::LastName.name());
        }
        if self.email.is_empty() {
            missing.push(DraftField::Email.name());
        }
        if self.phone.is_empty() {
            missing.push(DraftField::Phone.name());
        }
        if self.product.is_none() {
            missing.push(DraftField::Product.name());
        }
        match self.quantity {
            Some(q) if (self.unit.min_quantity()..=self.unit.max_quantity()).contains(&q) => {}
            _ => missing.push(DraftField::Quantity.name()),
        }
        if self.delivery_method == DeliveryMethod::Delivered && self.address.is_none() {
            missing.push(DraftField::Address.name());
        }
        missing
    }

    /// Full customer name as written to the operator ledger.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

fn set_text(slot: &mut String, value: &str) -> FieldChange {
    *slot = value.to_string();
    if value.is_empty() {
        FieldChange::Cleared
    } else {
        FieldChange::Set(value.to_string())
    }
}

fn set_optional(slot: &mut Option<String>, value: &str) -> FieldChange {
    if value.is_empty() {
        *slot = None;
        FieldChange::Cleared
    } else {
        *slot = Some(value.to_string());
        FieldChange::Set(value.to_string())
    }
}

/// Normalises phone input to the form's `(555) 123-4567` mask.
pub fn format_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).take(10).collect();
    match digits.len() {
        n if n > 6 => format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..]),
        n if n > 3 => format!("({}) {}", &digits[..3], &digits[3..]),
        _ => digits,
    }
}
