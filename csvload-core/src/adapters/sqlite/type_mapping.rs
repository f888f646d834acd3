//! Inferred column type to SQLite type conversion.
//!
//! The names are chosen for their SQLite type affinity:
//! `INTEGER` and `REAL` keep numeric values numeric, `TEXT` keeps strings
//! as written.

use crate::models::ColumnType;

/// Maps an inferred column type to the SQLite type used in `CREATE TABLE`.
pub const fn sqlite_type_name(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Integer | ColumnType::Boolean => "INTEGER",
        ColumnType::Float => "REAL",
        ColumnType::Text => "TEXT",
    }
}
