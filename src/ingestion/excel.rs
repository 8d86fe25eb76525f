#![cfg(feature = "excel")]

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tracing::warn;

use crate::error::{ReadError, ReadResult};
use crate::types::{DataSet, DataType, Value};

use super::unique_headers;

/// Read one sheet of a spreadsheet (`.xlsx`, `.xls`, `.ods`, etc.) into an in-memory `DataSet`.
///
/// Behavior:
/// - Picks `sheet_name` if provided; otherwise uses the first sheet in the workbook
/// - Detects the first non-empty row as the header row
/// - Reads remaining rows (at most `max_rows`) and converts cells into typed `Value`s
pub fn read_excel_from_path(
    path: impl AsRef<Path>,
    sheet_name: Option<&str>,
    max_rows: Option<usize>,
) -> ReadResult<DataSet> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet = match sheet_name {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ReadError::Layout {
                message: "workbook has no sheets".to_string(),
            })?,
    };

    let range = workbook.worksheet_range(&sheet)?;
    read_sheet_range(&sheet, &range, max_rows)
}

fn read_sheet_range(sheet: &str, range: &calamine::Range<Data>, max_rows: Option<usize>) -> ReadResult<DataSet> {
    let header_row_idx = range
        .rows()
        .position(|row| row.iter().any(|c| !matches!(c, Data::Empty)))
        .ok_or_else(|| ReadError::Layout {
            message: format!("sheet '{sheet}' has no non-empty rows (no header row found)"),
        })?;

    let header_cells: Vec<String> = range
        .rows()
        .nth(header_row_idx)
        .map(|row| row.iter().map(cell_to_header_string).collect())
        .unwrap_or_default();
    let names = unique_headers(&header_cells);
    let width = names.len();

    let mut rows: Vec<Vec<Value>> = Vec::new();
    // Per column: (saw a native date cell, saw any other non-empty cell).
    let mut date_cells = vec![(false, false); width];
    let mut dropped = 0usize;
    for row in range
        .rows()
        .skip(header_row_idx + 1)
        .take(max_rows.unwrap_or(usize::MAX))
    {
        dropped += row
            .iter()
            .skip(width)
            .filter(|c| !matches!(c, Data::Empty))
            .count();
        for (idx, cell) in row.iter().take(width).enumerate() {
            match cell {
                Data::DateTime(_) | Data::DateTimeIso(_) => date_cells[idx].0 = true,
                Data::Empty => {}
                _ => date_cells[idx].1 = true,
            }
        }
        let out_row: Vec<Value> = (0..width)
            .map(|idx| row.get(idx).map_or(Value::Null, convert_cell))
            .collect();
        rows.push(out_row);
    }
    if dropped > 0 {
        warn!(sheet, cells = dropped, "dropped cells beyond the header width");
    }

    let mut ds = DataSet::from_rows(names, rows);
    for (field, (dates, other)) in ds.schema.fields.iter_mut().zip(date_cells) {
        if dates && !other {
            field.data_type = DataType::DateTime;
        }
    }
    Ok(ds)
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn convert_cell(c: &Data) -> Value {
    match c {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::Int(i) => Value::Int64(*i),
        // Workbooks store every number as a float; whole values read back as integers.
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Value::Int64(*f as i64),
        Data::Float(f) => Value::Float64(*f),
        Data::String(s) if s.trim().is_empty() => Value::Null,
        Data::String(s) => Value::Utf8(s.clone()),
        Data::Bool(b) => Value::Utf8(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => Value::Utf8(ndt.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Value::Float64(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Utf8(s.clone()),
    }
}
