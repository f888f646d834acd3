//! The import run: read each configured CSV file and replace its table.
//!
//! Files are processed strictly in list order over one connection. The run
//! stops at the first failure; tables replaced before it stay replaced and
//! tables after it are left untouched.

use crate::adapters::{ImportConfig, TableSink};
use crate::models::{ImportReport, TableLoad};
use crate::reader::load_csv_table;
use crate::Result;
use std::time::Instant;
use tracing::{debug, info};

/// Drives one import over a sink.
pub struct Importer {
    sink: Box<dyn TableSink>,
    config: ImportConfig,
}

impl std::fmt::Debug for Importer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Importer")
            .field("database_type", &self.sink.database_type())
            .field("config", &self.config)
            .finish()
    }
}

impl Importer {
    pub fn new(sink: Box<dyn TableSink>, config: ImportConfig) -> Self {
        Self { sink, config }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// The sink tables are written to.
    pub fn sink(&self) -> &dyn TableSink {
        self.sink.as_ref()
    }

    /// Runs the import.
    ///
    /// # Errors
    /// Returns the first failure (configuration, connection, read or write),
    /// wrapped with the table being processed where there is one.
    pub async fn run(&self) -> Result<ImportReport> {
        self.config.validate()?;

        let started = Instant::now();
        self.sink.test_connection().await?;
        info!(
            "Connected to {} ({})",
            self.sink.database_type(),
            self.sink.connection_config()
        );

        let mut report = ImportReport::new(self.sink.database_type());

        for table in &self.config.tables {
            let load = self
                .import_table(table)
                .await
                .map_err(|e| e.for_table(table.as_str()))?;
            report.tables.push(load);
        }

        report.elapsed = started.elapsed();
        info!(
            "Imported {} tables ({} rows) in {:.2?}",
            report.tables.len(),
            report.total_rows(),
            report.elapsed
        );

        Ok(report)
    }

    async fn import_table(&self, table: &str) -> Result<TableLoad> {
        let path = self.config.csv_path(table);
        info!("Loading {} from {}", table, path.display());

        let frame = load_csv_table(&path, table).await?;
        for column in &frame.columns {
            debug!(
                "{}.{}: {}{}",
                table,
                column.name,
                column.column_type,
                if column.nullable { " (nullable)" } else { "" }
            );
        }

        let rows = self.sink.replace_table(&frame).await?;
        info!("✓ Replaced table {} with {} rows", table, rows);

        Ok(TableLoad {
            table: table.to_string(),
            source: path,
            rows,
            columns: frame.column_count(),
        })
    }

    /// Closes the sink's connection.
    pub async fn close(self) {
        self.sink.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ConnectionConfig;
    use crate::error::CsvLoadError;
    use crate::models::{CsvTable, DatabaseType};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Records replaced tables instead of talking to a database.
    #[derive(Default)]
    struct RecordingSink {
        replaced: Arc<Mutex<Vec<(String, usize)>>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl TableSink for RecordingSink {
        async fn test_connection(&self) -> Result<()> {
            Ok(())
        }

        async fn replace_table(&self, table: &CsvTable) -> Result<u64> {
            if self.fail_on.as_deref() == Some(table.name.as_str()) {
                return Err(CsvLoadError::write_failed(
                    table.name.as_str(),
                    "insert rows",
                    std::io::Error::other("disk full"),
                ));
            }
            self.replaced
                .lock()
                .unwrap()
                .push((table.name.clone(), table.row_count()));
            Ok(table.row_count() as u64)
        }

        async fn row_count(&self, _table: &str) -> Result<u64> {
            Ok(0)
        }

        async fn column_names(&self, _table: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn database_type(&self) -> DatabaseType {
            DatabaseType::SQLite
        }

        fn connection_config(&self) -> ConnectionConfig {
            ConnectionConfig::default()
        }

        async fn close(&self) {}
    }

    fn write_csv(dir: &std::path::Path, name: &str, content: &str) {
        std::fs::write(dir.join(format!("{}.csv", name)), content).unwrap();
    }

    #[tokio::test]
    async fn test_run_loads_tables_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "museum", "museum_id,name\n1,Louvre\n2,Prado\n");
        write_csv(dir.path(), "work", "work_id\n10\n");

        let replaced = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink {
            replaced: Arc::clone(&replaced),
            fail_on: None,
        };
        let config = ImportConfig::new(dir.path())
            .with_tables(vec!["work".to_string(), "museum".to_string()]);

        let report = Importer::new(Box::new(sink), config).run().await.unwrap();

        assert_eq!(
            *replaced.lock().unwrap(),
            vec![("work".to_string(), 1), ("museum".to_string(), 2)]
        );
        assert_eq!(report.tables.len(), 2);
        assert_eq!(report.total_rows(), 3);
        assert_eq!(report.tables[1].columns, 2);
        assert_eq!(report.tables[1].source, dir.path().join("museum.csv"));
    }

    #[tokio::test]
    async fn test_missing_file_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "artist", "artist_id\n1\n");
        write_csv(dir.path(), "work", "work_id\n1\n");

        let replaced = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink {
            replaced: Arc::clone(&replaced),
            fail_on: None,
        };
        let config = ImportConfig::new(dir.path()).with_tables(vec![
            "artist".to_string(),
            "canvas_size".to_string(),
            "work".to_string(),
        ]);

        let err = Importer::new(Box::new(sink), config).run().await.unwrap_err();

        assert_eq!(err.table(), Some("canvas_size"));
        assert_eq!(*replaced.lock().unwrap(), vec![("artist".to_string(), 1)]);
    }

    #[tokio::test]
    async fn test_write_failure_is_tagged_with_table() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "subject", "work_id,subject\n1,Portraits\n");

        let sink = RecordingSink {
            fail_on: Some("subject".to_string()),
            ..Default::default()
        };
        let config =
            ImportConfig::new(dir.path()).with_tables(vec!["subject".to_string()]);

        let err = Importer::new(Box::new(sink), config).run().await.unwrap_err();

        assert!(matches!(err, CsvLoadError::Table { .. }));
        assert_eq!(err.table(), Some("subject"));
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let replaced = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink {
            replaced: Arc::clone(&replaced),
            fail_on: None,
        };
        let config = ImportConfig::new(dir.path()).with_tables(Vec::new());

        let err = Importer::new(Box::new(sink), config).run().await.unwrap_err();

        assert!(matches!(err, CsvLoadError::Configuration { .. }));
        assert!(replaced.lock().unwrap().is_empty());
    }
}
