//! # Autodial Common Library
//!
//! Shared code for the autodial services:
//! - Error type used across crates
//! - Configuration loading (TOML bootstrap + environment overrides)
//! - Campaign lifecycle events and the broadcast event bus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
