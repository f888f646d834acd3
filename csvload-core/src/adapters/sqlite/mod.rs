//! SQLite table sink.
//!
//! # Module Structure
//! - `connection`: Connection handling (single connection, file or memory)
//! - `type_mapping`: Inferred column type to SQLite type names
//!
//! SQLite stores booleans as integers 0/1, the same layout dataframe
//! writers produce for it.

pub mod connection;
pub mod type_mapping;


use super::helpers::{
    count_rows_sql, create_table_sql, drop_table_sql, insert_prefix, rows_per_statement,
};
use super::{ConnectionConfig, TableSink};
use crate::error::CsvLoadError;
use crate::models::{CellValue, CsvTable, DatabaseType};
use crate::Result;
use async_trait::async_trait;
use sqlx::query_builder::Separated;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

pub use type_mapping::sqlite_type_name;

/// Default `SQLITE_MAX_VARIABLE_NUMBER` since SQLite 3.32.
pub const MAX_BIND_PARAMS: usize = 32_766;

/// SQLite sink over a single connection.
pub struct SqliteSink {
    pub pool: SqlitePool,
    pub config: ConnectionConfig,
    pub connection_string: String,
}

impl std::fmt::Debug for SqliteSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSink")
            .field("config", &self.config)
            .field("in_memory", &self.is_in_memory())
            .finish()
    }
}

#[async_trait]
impl TableSink for SqliteSink {
    async fn test_connection(&self) -> Result<()> {
        let result: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(CsvLoadError::connection_failed)?;

        if result != 1 {
            return Err(CsvLoadError::configuration(
                "Basic connectivity test failed: unexpected result",
            ));
        }

        Ok(())
    }

    async fn replace_table(&self, table: &CsvTable) -> Result<u64> {
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

        let create_sql = create_table_sql(table, sqlite_type_name);
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
            let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new(prefix.as_str());
            builder.push_values(chunk, |mut row, cells| {
                for cell in cells {
                    bind_cell(&mut row, cell);
                }
            });

            let result = builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| write_err("insert rows", e))?;
            written = written.saturating_add(result.rows_affected());
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
        sqlx::query_scalar::<_, String>("SELECT name FROM pragma_table_info(?) ORDER BY cid")
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CsvLoadError::read_failed(table, "read column names", e))
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    fn connection_config(&self) -> ConnectionConfig {
        self.config.clone()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// SQLite is dynamically typed, so NULLs need no column type.
fn bind_cell(row: &mut Separated<'_, '_, Sqlite, &'static str>, cell: &CellValue) {
    match cell {
        CellValue::Null => {
            row.push_bind(None::<String>);
        }
        CellValue::Integer(v) => {
            row.push_bind(*v);
        }
        CellValue::Float(v) => {
            row.push_bind(*v);
        }
        CellValue::Boolean(v) => {
            row.push_bind(*v);
        }
        CellValue::Text(v) => {
            row.push_bind(v.clone());
        }
    }
}
