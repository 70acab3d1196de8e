//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::domain::{DeliveryMethod, DraftField, Product, Unit};

#[derive(Parser, Debug)]
#[command(name = "grower-direct")]
#[command(about = "Grower Direct hay order form core", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "GROWER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Price an order without touching any service
    Quote {
        #[arg(long)]
        product: Product,
        #[arg(long)]
        quantity: String,
        #[arg(long, default_value = "bale")]
        unit: Unit,
        /// Delivery distance in miles; implies a delivered order
        #[arg(long)]
        miles: Option<f64>,
    },

    /// Show current availability per product
    Inventory,

    /// Show the stored draft or the cooldown left on the last order
    Status {
        /// Keep printing the countdown until a new order can be started
        #[arg(long)]
        follow: bool,
    },

    /// Update the stored draft with the given fields and submit it
    Submit(OrderFields),

    /// Clear the last order once its cooldown has elapsed
    NewOrder,
}

/// Draft fields settable from the command line. Omitted fields keep
/// whatever the stored draft already holds.
#[derive(ClapArgs, Debug, Default)]
pub struct OrderFields {
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub product: Option<Product>,
    #[arg(long)]
    pub quantity: Option<String>,
    #[arg(long)]
    pub unit: Option<Unit>,
    #[arg(long)]
    pub delivery: Option<DeliveryMethod>,
    #[arg(long)]
    pub address: Option<String>,
    /// Geocoded destination longitude, required with --latitude for delivery
    #[arg(long, requires = "latitude", allow_negative_numbers = true)]
    pub longitude: Option<f64>,
    #[arg(long, requires = "longitude", allow_negative_numbers = true)]
    pub latitude: Option<f64>,
    #[arg(long)]
    pub notes: Option<String>,
}

impl OrderFields {
    /// The given fields as raw edits, in form order.
    pub fn edits(&self) -> Vec<(DraftField, String)> {
        let mut edits = Vec::new();
        let mut push = |field: DraftField, value: Option<String>| {
            if let Some(value) = value {
                edits.push((field, value));
            }
        };
        push(DraftField::FirstName, self.first_name.clone());
        push(DraftField::LastName, self.last_name.clone());
        push(DraftField::Email, self.email.clone());
        push(DraftField::Phone, self.phone.clone());
        push(DraftField::Product, self.product.map(|p| p.to_string()));
        push(DraftField::Quantity, self.quantity.clone());
        push(DraftField::Unit, self.unit.map(|u| u.to_string()));
        push(DraftField::DeliveryMethod, self.delivery.map(|m| m.to_string()));
        push(DraftField::Notes, self.notes.clone());
        edits
    }
}
