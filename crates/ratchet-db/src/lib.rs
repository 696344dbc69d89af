//! ratchet-db - Database abstraction layer for Ratchet
//!
//! This crate provides the `Database` and `Transaction` traits the migration
//! engine drives, and their DuckDB implementation.

pub mod duckdb;
pub mod error;
pub mod traits;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use traits::{Database, Transaction};
