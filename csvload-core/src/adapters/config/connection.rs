//! Database connection configuration.
//!
//! This module provides the `ConnectionConfig` struct describing the single
//! connection an import run writes through.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest number of rows sent in one `INSERT` statement.
pub const MAX_BATCH_ROWS: usize = 1_000;

/// Configuration for database connections.
///
/// # Security
/// This struct intentionally does NOT store passwords or credentials.
/// The password stays inside the connection string handed to the driver.
///
/// # Example
/// ```rust
/// use csvload_core::adapters::ConnectionConfig;
///
/// let config = ConnectionConfig::new("localhost".to_string())
///     .with_port(5432)
///     .with_database("Testpaint".to_string())
///     .with_username("postgres".to_string());
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database host address
    pub host: String,
    /// Optional port number
    pub port: Option<u16>,
    /// Optional database name
    pub database: Option<String>,
    /// Optional username (password handled separately)
    pub username: Option<String>,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Per-statement timeout duration
    pub statement_timeout: Duration,
    /// Maximum number of connections in pool
    pub max_connections: u32,
    /// Rows per multi-row INSERT statement
    pub batch_rows: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            database: None,
            username: None,
            connect_timeout: Duration::from_secs(30),
            statement_timeout: Duration::from_secs(300),
            // One connection, reused serially for every table
            max_connections: 1,
            batch_rows: MAX_BATCH_ROWS,
        }
    }
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ConnectionConfig({}{}{})",
            self.host,
            self.port.map_or_else(String::new, |p| format!(":{}", p)),
            self.database
                .as_ref()
                .map_or_else(String::new, |db| format!("/{}", db))
        )
        // Intentionally omit username and never include credentials
    }
}

impl ConnectionConfig {
    /// Validates connection configuration parameters.
    ///
    /// # Errors
    /// Returns error if configuration values are invalid
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.is_empty() {
            return Err(crate::error::CsvLoadError::configuration(
                "host cannot be empty",
            ));
        }

        if let Some(port) = self.port
            && port == 0
        {
            return Err(crate::error::CsvLoadError::configuration(
                "port must be greater than 0",
            ));
        }

        if self.max_connections == 0 {
            return Err(crate::error::CsvLoadError::configuration(
                "max_connections must be greater than 0",
            ));
        }

        if self.connect_timeout.as_secs() == 0 {
            return Err(crate::error::CsvLoadError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }

        if self.statement_timeout.as_secs() == 0 {
            return Err(crate::error::CsvLoadError::configuration(
                "statement_timeout must be greater than 0",
            ));
        }

        if self.batch_rows == 0 || self.batch_rows > MAX_BATCH_ROWS {
            return Err(crate::error::CsvLoadError::configuration(format!(
                "batch_rows must be between 1 and {}",
                MAX_BATCH_ROWS
            )));
        }

        Ok(())
    }

    /// Creates a new connection config with defaults.
    pub fn new(host: String) -> Self {
        Self {
            host,
            ..Default::default()
        }
    }

    /// Builder method to set port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Builder method to set database.
    pub fn with_database(mut self, database: String) -> Self {
        self.database = Some(database);
        self
    }

    /// Builder method to set username.
    pub fn with_username(mut self, username: String) -> Self {
        self.username = Some(username);
        self
    }

    /// Builder method to set the INSERT batch size.
    pub fn with_batch_rows(mut self, batch_rows: usize) -> Self {
        self.batch_rows = batch_rows;
        self
    }
}
