//! Shared plumbing for the fedimark tools: errors, config loading and
//! tracing setup.

pub mod config;
pub mod error;
pub mod telemetry;

pub use crate::config::Config;
pub use crate::error::FedimarkError;
