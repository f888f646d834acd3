//! PostgreSQL table sink.
//!
//! # Module Structure
//! - `connection`: Connection pool management and validation
//! - `type_mapping`: Inferred column type to PostgreSQL type names

mod connection;
mod type_mapping;

#[cfg(test)]
mod tests;

use super::helpers::{
    count_rows_sql, create_table_sql, drop_table_sql, insert_prefix, rows_per_statement,
};
use super::{ConnectionConfig, TableSink};
use crate::error::CsvLoadError;
use crate::models::{CellValue, ColumnType, CsvTable, DatabaseType};
use crate::Result;
use async_trait::async_trait;
use sqlx::query_builder::Separated;
use sqlx::{PgPool, Postgres, QueryBuilder};

pub use type_mapping::postgres_type_name;

/// Bind parameter limit of the PostgreSQL wire protocol.
pub const MAX_BIND_PARAMS: usize = 65_535;

/// PostgreSQL sink writing through a single pooled connection
pub struct PostgresSink {
    pub pool: PgPool,
    pub config: ConnectionConfig,
}

impl std::fmt::Debug for PostgresSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresSink")
            .field("config", &self.config)
            .field("pool_size", &self.pool.size())
            .field("pool_idle", &self.pool.num_idle())
            .finish()
    }
}

#[async_trait]
impl TableSink for PostgresSink {
    async fn test_connection(&self) -> Result<()> {
        let connectivity_result: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(CsvLoadError::connection_failed)?;

        if connectivity_result != 1 {
            return Err(CsvLoadError::configuration(
                "Basic connectivity test failed: unexpected result",
            ));
        }

        Ok(())
    }

    async fn replace_table(&self, table: &CsvTable) -> Result<u64> {
        check_identifier_lengths(table)?;

        let name = table.name.as_str();
        let write_err = |context: &str, e: sqlx::Error| {
            CsvLoadError::write_failed(name, context.to_string(), e)
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| write_err("begin transaction", e))?;

        sqlx::query(&drop_table_sql(name))
            .execute(&mut *tx)
            .await
            .map_err(|e| write_err("drop existing table", e))?;

        let create_sql = create_table_sql(table, postgres_type_name);
        tracing::debug!("{}", create_sql);
        sqlx::query(&create_sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| write_err("create table", e))?;

        let chunk_rows = rows_per_statement(
            table.column_count(),
            MAX_BIND_PARAMS,
            self.config.batch_rows,
        );
        let prefix = insert_prefix(table);
        let mut written: u64 = 0;

        for chunk in table.rows.chunks(chunk_rows) {
            let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(prefix.as_str());
            builder.push_values(chunk, |mut row, cells| {
                for (cell, column) in cells.iter().zip(&table.columns) {
                    bind_cell(&mut row, cell, column.column_type);
                }
            });

            let result = builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| write_err("insert rows", e))?;
            written = written.saturating_add(result.rows_affected());
            tracing::trace!("Inserted {} rows into {}", written, name);
        }

        tx.commit()
            .await
            .map_err(|e| write_err("commit transaction", e))?;

        Ok(written)
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(&count_rows_sql(table))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CsvLoadError::read_failed(table, "count rows", e))?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn column_names(&self, table: &str) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT column_name::text FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 \
             ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CsvLoadError::read_failed(table, "read column names", e))
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::PostgreSQL
    }

    fn connection_config(&self) -> ConnectionConfig {
        self.config.clone()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Rejects table and column names PostgreSQL would silently truncate.
///
/// # Errors
/// Returns a configuration error naming the first identifier longer than
/// 63 bytes.
pub fn check_identifier_lengths(table: &CsvTable) -> Result<()> {
    let names = std::iter::once(("table", table.name.as_str()))
        .chain(table.columns.iter().map(|c| ("column", c.name.as_str())));

    for (kind, name) in names {
        if name.len() > connection::MAX_IDENTIFIER_LEN {
            return Err(CsvLoadError::configuration(format!(
                "{} name '{}' in table '{}' is {} bytes; PostgreSQL identifiers are limited to {} bytes",
                kind,
                name,
                table.name,
                name.len(),
                connection::MAX_IDENTIFIER_LEN
            )));
        }
    }

    Ok(())
}

/// Binds one cell, typing NULLs by their column so PostgreSQL accepts them.
fn bind_cell(
    row: &mut Separated<'_, '_, Postgres, &'static str>,
    cell: &CellValue,
    column_type: ColumnType,
) {
    match (cell, column_type) {
        (CellValue::Integer(v), _) => {
            row.push_bind(*v);
        }
        (CellValue::Float(v), _) => {
            row.push_bind(*v);
        }
        (CellValue::Boolean(v), _) => {
            row.push_bind(*v);
        }
        (CellValue::Text(v), _) => {
            row.push_bind(v.clone());
        }
        (CellValue::Null, ColumnType::Integer) => {
            row.push_bind(None::<i64>);
        }
        (CellValue::Null, ColumnType::Float) => {
            row.push_bind(None::<f64>);
        }
        (CellValue::Null, ColumnType::Boolean) => {
            row.push_bind(None::<bool>);
        }
        (CellValue::Null, ColumnType::Text) => {
            row.push_bind(None::<String>);
        }
    }
}
