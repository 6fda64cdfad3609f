//! CSV encoding for Bulk API uploads and decoding for query results.
//!
//! Columns follow first-seen key order across all records. A record missing
//! a column gets an empty cell; columns are never reordered.

use crate::error::Result;
use crate::record::{value_to_string, Record};

/// Column names in first-seen order across `records`.
pub fn header(records: &[Record]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for name in record.field_names() {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
    }
    columns
}

/// Header row followed by one row per record. Empty input yields no rows.
pub fn to_rows(records: &[Record]) -> Vec<Vec<String>> {
    if records.is_empty() {
        return Vec::new();
    }

    let columns = header(records);
    let mut rows = Vec::with_capacity(records.len() + 1);
    for record in records {
        rows.push(
            columns
                .iter()
                .map(|column| {
                    record
                        .as_map()
                        .get(column)
                        .map(value_to_string)
                        .unwrap_or_default()
                })
                .collect(),
        );
    }
    rows.insert(0, columns);
    rows
}

/// Encode records as comma-separated, LF-terminated CSV.
pub fn encode(records: &[Record]) -> Result<String> {
    encode_with(records, b',')
}

/// Encode records with a custom column delimiter.
pub fn encode_with(records: &[Record], delimiter: u8) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for row in to_rows(records) {
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| crate::Error::from(csv::Error::from(e.into_error())))?;
    Ok(String::from_utf8(bytes)?)
}

/// Parse comma-separated text into rows, header first. Quoting is removed.
pub fn decode(text: &str) -> Result<Vec<Vec<String>>> {
    decode_with(text, b',')
}

/// Parse delimited text into rows.
pub fn decode_with(text: &str, delimiter: u8) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    reader
        .records()
        .map(|row| -> Result<Vec<String>> { Ok(row?.iter().map(str::to_string).collect()) })
        .collect()
}
