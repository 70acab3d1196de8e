//! The order session: draft editing, submission and the post-order cooldown.

pub mod error;
pub mod persistence;
pub mod service;
mod state;

pub use error::*;
pub use persistence::SessionStore;
pub use service::SessionService;
pub use state::*;
