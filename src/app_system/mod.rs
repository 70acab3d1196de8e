//! System orchestration, startup, and shutdown logic.

pub mod order_system;
pub mod ticker;
pub mod tracing;

pub use order_system::*;
pub use ticker::*;
pub use tracing::*;
