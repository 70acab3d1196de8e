//! Clients for the remote services the order form depends on.

pub mod inventory;
pub mod routing;
pub mod submission;

pub use inventory::*;
pub use routing::*;
pub use submission::*;
