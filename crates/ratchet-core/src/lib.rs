//! ratchet-core - Core library for Ratchet
//!
//! This crate provides the shared `Version` identifier, configuration parsing
//! for `ratchet.yml`, and the core error type used across all Ratchet
//! components.

pub mod config;
pub mod error;
pub mod version;

pub use config::{Config, DatabaseConfig, LockMode};
pub use error::{CoreError, CoreResult};
pub use version::Version;
