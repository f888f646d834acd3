//! CSV loading with per-column type inference.
//!
//! The reader turns a file into a [`CsvTable`]: the first record is the
//! header, every later record is a row. Cell types are inferred per column
//! from the non-null values, narrowest first:
//!
//! 1. `Integer` when every value parses as `i64`
//! 2. `Float` when every value parses as `f64`
//! 3. `Boolean` when every value is a recognised boolean spelling
//! 4. `Text` otherwise
//!
//! A column whose rows are all missing is typed `Float`, matching how
//! dataframe readers type an all-missing column. A header-only file has no
//! rows to infer from and every column is typed `Text`.

use crate::error::CsvLoadError;
use crate::models::{CellValue, Column, ColumnType, CsvTable};
use crate::Result;
use std::collections::HashSet;
use std::path::Path;

/// Cell strings that load as SQL NULL.
pub const NULL_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const TRUE_VALUES: &[&str] = &["True", "TRUE", "true"];
const FALSE_VALUES: &[&str] = &["False", "FALSE", "false"];

/// Returns true if the raw cell should be stored as NULL.
pub fn is_null_marker(value: &str) -> bool {
    NULL_MARKERS.contains(&value)
}

fn parse_bool(value: &str) -> Option<bool> {
    if TRUE_VALUES.contains(&value) {
        Some(true)
    } else if FALSE_VALUES.contains(&value) {
        Some(false)
    } else {
        None
    }
}

/// Reads `path` and parses it into a table called `name`.
///
/// # Errors
/// Returns `Io` if the file cannot be read and `Csv` if its content is not
/// a well-formed CSV with a header row.
pub async fn load_csv_table(path: &Path, name: &str) -> Result<CsvTable> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| CsvLoadError::io(format!("Failed to read {}", path.display()), e))?;

    tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());

    parse_csv_table(bytes.as_slice(), name).map_err(|e| match e {
        CsvLoadError::Csv { context, source } => CsvLoadError::Csv {
            context: format!("{}: {}", path.display(), context),
            source,
        },
        other => other,
    })
}

/// Parses CSV content from any reader into a typed table.
///
/// # Errors
/// Returns `Csv` when the header is missing, a record is malformed, or a
/// row has more fields than the header.
pub fn parse_csv_table<R: std::io::Read>(reader: R, name: &str) -> Result<CsvTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| CsvLoadError::csv("Failed to read header row", e))?
        .clone();

    if headers.is_empty() {
        return Err(CsvLoadError::csv(
            "Missing header row",
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "file is empty"),
        ));
    }

    let raw_headers: Vec<&str> = headers.iter().collect();
    let names = normalize_headers(&raw_headers);
    let width = names.len();

    let mut raw_rows: Vec<Vec<Option<String>>> = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|e| CsvLoadError::csv("Malformed record", e))?;

        if record.len() > width {
            let line = record.position().map_or(0, csv::Position::line);
            return Err(CsvLoadError::csv(
                format!(
                    "Line {} has {} fields, header has {}",
                    line,
                    record.len(),
                    width
                ),
                std::io::Error::new(std::io::ErrorKind::InvalidData, "too many fields"),
            ));
        }

        let mut row: Vec<Option<String>> = record
            .iter()
            .map(|field| (!is_null_marker(field)).then(|| field.to_string()))
            .collect();
        row.resize(width, None);
        raw_rows.push(row);
    }

    let mut columns = Vec::with_capacity(width);
    for (index, name) in names.into_iter().enumerate() {
        let values = raw_rows.iter().map(|row| row[index].as_deref());
        let column_type = infer_column_type(values.clone());
        let nullable = values.clone().any(|v| v.is_none());
        columns.push(Column {
            name,
            column_type,
            nullable,
        });
    }

    let rows = raw_rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&columns)
                .map(|(cell, column)| convert_cell(cell, column.column_type))
                .collect()
        })
        .collect();

    Ok(CsvTable {
        name: name.to_string(),
        columns,
        rows,
    })
}

/// Normalizes header names: blanks become `Unnamed: <index>` and repeated
/// names get `.1`, `.2`, ... suffixes so every column name is unique.
pub fn normalize_headers(raw: &[&str]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(raw.len());

    for (index, header) in raw.iter().enumerate() {
        let header = header.trim_start_matches('\u{feff}');
        let base = if header.is_empty() {
            format!("Unnamed: {}", index)
        } else {
            header.to_string()
        };

        let mut candidate = base.clone();
        let mut suffix = 1_u32;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix = suffix.saturating_add(1);
        }
        seen.insert(candidate.clone());
        names.push(candidate);
    }

    names
}

/// Infers the narrowest column type covering every non-null value.
///
/// An empty iterator (no rows) gives `Text`; rows that are all null give
/// `Float`.
pub fn infer_column_type<'a, I>(values: I) -> ColumnType
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut any_row = false;
    let mut any_value = false;
    let mut integer = true;
    let mut float = true;
    let mut boolean = true;

    for value in values {
        any_row = true;
        let Some(value) = value else {
            continue;
        };
        any_value = true;
        let trimmed = value.trim();
        if integer && trimmed.parse::<i64>().is_err() {
            integer = false;
        }
        if float && !integer && trimmed.parse::<f64>().is_err() {
            float = false;
        }
        if boolean && parse_bool(value).is_none() {
            boolean = false;
        }
        if !integer && !float && !boolean {
            return ColumnType::Text;
        }
    }

    if !any_row {
        return ColumnType::Text;
    }
    if !any_value {
        return ColumnType::Float;
    }

    if integer {
        ColumnType::Integer
    } else if float {
        ColumnType::Float
    } else if boolean {
        ColumnType::Boolean
    } else {
        ColumnType::Text
    }
}

fn convert_cell(cell: Option<String>, column_type: ColumnType) -> CellValue {
    let Some(value) = cell else {
        return CellValue::Null;
    };

    match column_type {
        ColumnType::Integer => value
            .trim()
            .parse::<i64>()
            .map_or(CellValue::Null, CellValue::Integer),
        ColumnType::Float => value
            .trim()
            .parse::<f64>()
            .map_or(CellValue::Null, CellValue::Float),
        ColumnType::Boolean => parse_bool(&value).map_or(CellValue::Null, CellValue::Boolean),
        ColumnType::Text => CellValue::Text(value),
    }
}
