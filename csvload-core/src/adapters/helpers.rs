//! SQL text helpers shared by the database sinks.
//!
//! Table and column names come straight from file names and CSV headers,
//! so every identifier is quoted before it reaches a statement.

use crate::models::{ColumnType, CsvTable};

/// Quotes an identifier with double quotes, doubling embedded quotes.
///
/// # Example
/// ```rust
/// use csvload_core::adapters::helpers::quote_identifier;
///
/// assert_eq!(quote_identifier("museum_hours"), "\"museum_hours\"");
/// assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `DROP TABLE IF EXISTS` for the given table.
pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_identifier(table))
}

/// `CREATE TABLE` with one column per CSV column, typed by `type_name`.
///
/// No keys or constraints are declared; columns inferred as never-null
/// still accept NULL so a later load with gaps does not need a new schema.
pub fn create_table_sql(table: &CsvTable, type_name: impl Fn(ColumnType) -> &'static str) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_identifier(&c.name), type_name(c.column_type)))
        .collect();

    format!(
        "CREATE TABLE {} ({})",
        quote_identifier(&table.name),
        columns.join(", ")
    )
}

/// `INSERT INTO "t" ("a", "b") ` prefix for a multi-row insert.
pub fn insert_prefix(table: &CsvTable) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| quote_identifier(&c.name))
        .collect();

    format!(
        "INSERT INTO {} ({}) ",
        quote_identifier(&table.name),
        columns.join(", ")
    )
}

/// `SELECT COUNT(*)` for the given table.
pub fn count_rows_sql(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", quote_identifier(table))
}

/// Rows per INSERT so that `rows * columns` stays within `max_params`.
///
/// Always at least one row, never more than `batch_rows`.
pub fn rows_per_statement(column_count: usize, max_params: usize, batch_rows: usize) -> usize {
    let by_params = max_params.checked_div(column_count).unwrap_or(max_params);
    by_params.min(batch_rows).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Column;

    fn sample_table() -> CsvTable {
        CsvTable::new(
            "canvas_size",
            vec![
                Column::new("size_id", ColumnType::Integer),
                Column::new("width", ColumnType::Float),
                Column::new("label", ColumnType::Text),
            ],
        )
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("work"), "\"work\"");
        assert_eq!(quote_identifier("Unnamed: 0"), "\"Unnamed: 0\"");
        assert_eq!(
            quote_identifier("x\"; DROP TABLE artist; --"),
            "\"x\"\"; DROP TABLE artist; --\""
        );
    }

    #[test]
    fn test_drop_and_count_sql() {
        assert_eq!(drop_table_sql("museum"), "DROP TABLE IF EXISTS \"museum\"");
        assert_eq!(count_rows_sql("museum"), "SELECT COUNT(*) FROM \"museum\"");
    }

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql(&sample_table(), |t| match t {
            ColumnType::Integer => "BIGINT",
            ColumnType::Float => "DOUBLE PRECISION",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Text => "TEXT",
        });

        assert_eq!(
            sql,
            "CREATE TABLE \"canvas_size\" (\"size_id\" BIGINT, \"width\" DOUBLE PRECISION, \"label\" TEXT)"
        );
    }

    #[test]
    fn test_insert_prefix() {
        assert_eq!(
            insert_prefix(&sample_table()),
            "INSERT INTO \"canvas_size\" (\"size_id\", \"width\", \"label\") "
        );
    }

    #[test]
    fn test_rows_per_statement() {
        assert_eq!(rows_per_statement(3, 65_535, 1_000), 1_000);
        assert_eq!(rows_per_statement(100, 65_535, 1_000), 655);
        assert_eq!(rows_per_statement(40_000, 32_766, 1_000), 1);
        assert_eq!(rows_per_statement(0, 65_535, 1_000), 1_000);
    }
}
