use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Hay products sold through the order form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    Alfalfa,
    Wheat,
}

impl Product {
    pub const ALL: [Product; 2] = [Product::Alfalfa, Product::Wheat];

    /// Price of a single bale in dollars.
    pub fn price_per_bale(self) -> f64 {
        match self {
            Product::Alfalfa => 14.0,
            Product::Wheat => 10.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Product::Alfalfa => "alfalfa",
            Product::Wheat => "wheat",
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Product {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alfalfa" => Ok(Product::Alfalfa),
            "wheat" => Ok(Product::Wheat),
            other => Err(format!("unknown product: {}", other)),
        }
    }
}

/// Unit a quantity is counted in. Each unit is a fixed number of bales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Bale,
    Block,
    Truck,
}

impl Unit {
    pub const ALL: [Unit; 3] = [Unit::Bale, Unit::Block, Unit::Truck];

    /// Number of bales in one unit.
    pub fn multiplier(self) -> u32 {
        match self {
            Unit::Bale => 1,
            Unit::Block => 74,
            Unit::Truck => 500,
        }
    }

    pub fn min_quantity(self) -> u32 {
        1
    }

    /// Largest quantity the form accepts for this unit.
    pub fn max_quantity(self) -> u32 {
        match self {
            Unit::Truck => 10,
            Unit::Bale | Unit::Block => 9999,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Bale => "bale",
            Unit::Block => "block",
            Unit::Truck => "truck",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bale" => Ok(Unit::Bale),
            "block" => Ok(Unit::Block),
            "truck" => Ok(Unit::Truck),
            other => Err(format!("unknown unit: {}", other)),
        }
    }
}

/// How the order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    #[default]
    Pickup,
    Delivered,
}

impl DeliveryMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryMethod::Pickup => "pickup",
            DeliveryMethod::Delivered => "delivered",
        }
    }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pickup" => Ok(DeliveryMethod::Pickup),
            "delivered" | "delivery" => Ok(DeliveryMethod::Delivered),
            other => Err(format!("unknown delivery method: {}", other)),
        }
    }
}
