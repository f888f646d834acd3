//! Inferred column type to PostgreSQL type conversion.

use crate::models::ColumnType;

/// Maps an inferred column type to the PostgreSQL type used in `CREATE TABLE`.
///
/// # Example
/// ```rust
/// use csvload_core::adapters::postgres::postgres_type_name;
/// use csvload_core::models::ColumnType;
///
/// assert_eq!(postgres_type_name(ColumnType::Float), "DOUBLE PRECISION");
/// ```
pub const fn postgres_type_name(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Integer => "BIGINT",
        ColumnType::Float => "DOUBLE PRECISION",
        ColumnType::Boolean => "BOOLEAN",
        ColumnType::Text => "TEXT",
    }
}
