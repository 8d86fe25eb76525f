//! CSV reader.

use std::path::Path;

use tracing::warn;

use crate::error::{ReadError, ReadResult};
use crate::types::{DataSet, Value};

use super::{typed_text_cell, unique_headers};

/// Read a CSV file into an in-memory [`DataSet`].
///
/// Rules:
///
/// - CSV must have a header row; column order follows the header.
/// - Cells are typed per [`typed_text_cell`](super::typed_text_cell): blank -> null, integers,
///   plain floats, everything else text.
/// - Short records are padded with nulls; surplus cells are dropped.
/// - `max_rows` limits how many data rows are read (used for previews).
pub fn read_csv_from_path(path: impl AsRef<Path>, max_rows: Option<usize>) -> ReadResult<DataSet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    read_csv_from_reader(&mut rdr, max_rows)
}

/// Read CSV data from an existing CSV reader.
pub fn read_csv_from_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
    max_rows: Option<usize>,
) -> ReadResult<DataSet> {
    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(ReadError::Layout {
            message: "csv has no header row".to_string(),
        });
    }
    let names = unique_headers(headers.iter());
    let width = names.len();

    let mut rows: Vec<Vec<Value>> = Vec::new();
    let mut dropped = 0usize;
    for result in rdr.records().take(max_rows.unwrap_or(usize::MAX)) {
        let record = result?;
        if record.len() > width {
            dropped += record.len() - width;
        }
        let row: Vec<Value> = (0..width)
            .map(|idx| record.get(idx).map_or(Value::Null, typed_text_cell))
            .collect();
        rows.push(row);
    }
    if dropped > 0 {
        warn!(cells = dropped, "dropped cells beyond the header width");
    }

    Ok(DataSet::from_rows(names, rows))
}
