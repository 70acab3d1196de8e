//! Core of the Grower Direct hay order form: pricing, delivery distance
//! resolution and the order session with its post-submission cooldown.

pub mod app_system;
pub mod cli;
pub mod clients;
pub mod clock;
pub mod config;
pub mod distance_actor;
pub mod domain;
pub mod messages;
pub mod pricing;
pub mod services;
pub mod session_actor;
pub mod storage;

#[cfg(test)]
mod mock_framework;
