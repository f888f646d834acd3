//! Configuration types for the import run and its database sinks.
//!
//! - `ConnectionConfig`: connection settings parsed from the URL
//! - `ImportConfig`: data directory and table list
//!
//! # Security
//! These configuration structs intentionally do NOT store passwords or credentials.

mod connection;
mod import;

pub use connection::{ConnectionConfig, MAX_BATCH_ROWS};
pub use import::{DEFAULT_DATA_DIR, DEFAULT_DATABASE_URL, DEFAULT_TABLES, ImportConfig};
