//! PostgreSQL connection pool management and validation.
//!
//! The pool is capped at a single connection: every table is written
//! serially through the same session.

use super::{ConnectionConfig, PostgresSink};
use crate::Result;
use sqlx::PgPool;
use std::time::Duration;
use url::Url;

/// Longest identifier PostgreSQL keeps without truncation.
pub(super) const MAX_IDENTIFIER_LEN: usize = 63;

impl PostgresSink {
    /// Creates a new PostgreSQL sink.
    ///
    /// # Arguments
    /// * `connection_string` - PostgreSQL connection URL (credentials sanitized in errors)
    ///
    /// The pool connects lazily; call `test_connection` to surface an
    /// unreachable server before any table is touched.
    ///
    /// # Errors
    /// Returns error if:
    /// - Connection string format is invalid
    /// - Pool configuration is invalid
    pub async fn new(connection_string: &str) -> Result<Self> {
        let config = Self::parse_connection_config(connection_string)?;
        let pool = Self::create_connection_pool(connection_string, &config).await?;

        Ok(Self { pool, config })
    }

    /// Creates a new PostgreSQL sink with custom configuration
    ///
    /// # Arguments
    /// * `connection_string` - PostgreSQL connection URL
    /// * `config` - Custom connection configuration
    pub async fn with_config(connection_string: &str, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        Self::validate_connection_string(connection_string)?;
        let pool = Self::create_connection_pool(connection_string, &config).await?;

        Ok(Self { pool, config })
    }

    /// Parses connection string to extract configuration parameters
    ///
    /// # Arguments
    /// * `connection_string` - PostgreSQL connection URL (credentials sanitized in errors)
    ///
    /// # Errors
    /// Returns error if connection string is malformed
    pub fn parse_connection_config(connection_string: &str) -> Result<ConnectionConfig> {
        Self::validate_connection_string(connection_string)?;

        let url = Url::parse(connection_string).map_err(|e| {
            crate::error::CsvLoadError::configuration(format!(
                "Invalid PostgreSQL connection string format: {}",
                e
            ))
        })?;

        let mut config = ConnectionConfig::new(url.host_str().unwrap_or("localhost").to_string());

        match url.port() {
            Some(0) => {
                return Err(crate::error::CsvLoadError::configuration(
                    "Invalid port number: must be greater than 0",
                ));
            }
            Some(port) => config = config.with_port(port),
            None => config = config.with_port(5432), // PostgreSQL default port
        }

        let database = url.path().trim_start_matches('/');
        if !database.is_empty() {
            if database.len() > MAX_IDENTIFIER_LEN {
                return Err(crate::error::CsvLoadError::configuration(
                    "Database name too long: maximum 63 characters",
                ));
            }
            config = config.with_database(database.to_string());
        }

        let username = url.username();
        if !username.is_empty() {
            if username.len() > MAX_IDENTIFIER_LEN {
                return Err(crate::error::CsvLoadError::configuration(
                    "Username too long: maximum 63 characters",
                ));
            }
            config = config.with_username(username.to_string());
        }

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "connect_timeout" => {
                    if let Ok(timeout_secs) = value.parse::<u64>()
                        && timeout_secs > 0
                        && timeout_secs <= 300
                    {
                        config.connect_timeout = Duration::from_secs(timeout_secs);
                    }
                }
                "statement_timeout" => {
                    if let Ok(timeout_ms) = value.parse::<u64>()
                        && timeout_ms >= 1_000
                    {
                        config.statement_timeout = Duration::from_millis(timeout_ms);
                    }
                }
                "batch_rows" => {
                    if let Ok(rows) = value.parse::<usize>() {
                        config.batch_rows = rows;
                    }
                }
                _ => {} // Passed through to the driver untouched
            }
        }

        config.validate()?;

        Ok(config)
    }

    /// Creates a single-connection pool with session settings applied.
    ///
    /// Every new connection gets:
    /// - `statement_timeout` from the config
    /// - `application_name` identifying csvload and its version
    pub(crate) async fn create_connection_pool(
        connection_string: &str,
        config: &ConnectionConfig,
    ) -> Result<PgPool> {
        use sqlx::Executor;

        Self::validate_connection_string(connection_string)?;

        let statement_timeout_ms = config.statement_timeout.as_millis();

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(0)
            .acquire_timeout(config.connect_timeout)
            .test_before_acquire(true)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    conn.execute(
                        format!("SET statement_timeout = {}", statement_timeout_ms).as_str(),
                    )
                    .await?;

                    let app_name = format!("csvload-{}", env!("CARGO_PKG_VERSION"));
                    conn.execute(format!("SET application_name = '{}'", app_name).as_str())
                        .await?;

                    Ok(())
                })
            })
            .connect_lazy(connection_string)
            .map_err(|e| crate::error::CsvLoadError::Connection {
                context: format!(
                    "Failed to create PostgreSQL connection pool to {}",
                    crate::adapters::redact_database_url(connection_string)
                ),
                source: Box::new(e),
            })?;

        Ok(pool)
    }

    /// Validates connection string format
    ///
    /// # Errors
    /// Returns error if the scheme is not PostgreSQL or no host is given
    pub fn validate_connection_string(connection_string: &str) -> Result<()> {
        let url = Url::parse(connection_string).map_err(|e| {
            crate::error::CsvLoadError::configuration(format!(
                "Invalid PostgreSQL connection string format: {}",
                e
            ))
        })?;

        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(crate::error::CsvLoadError::configuration(
                "Connection string must use postgres:// or postgresql:// scheme",
            ));
        }

        if url.host_str().is_none_or(str::is_empty) {
            return Err(crate::error::CsvLoadError::configuration(
                "Connection string must specify a host",
            ));
        }

        Ok(())
    }
}
