//! Confab Common - shared plumbing for the Confab chat gateway.
//!
//! This crate provides:
//! - The service-wide error type and result alias
//! - Environment-driven configuration loading
//! - Logging setup with library noise suppression

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{BedrockConfig, Config, Limits, ObservabilityConfig, ServerConfig};
pub use error::{Error, Result};
pub use logging::init_logging;
