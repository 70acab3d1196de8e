//! Thin handles around the actors' message channels.

mod macros;

pub mod distance_client;
pub mod session_client;

pub use distance_client::DistanceClient;
pub use session_client::SessionClient;
