//! Driving-distance resolution for delivered orders.

pub mod error;
pub mod service;
mod status;

pub use error::*;
pub use service::DistanceService;
pub use status::*;
