//! Value normalization.
//!
//! After normalization a dataset holds exactly one null marker ([`Value::Null`]), date columns
//! hold `YYYY-MM-DD` text and REAL/NUMERIC columns hold floats. Normalization never fails on a
//! cell: anything that cannot be coerced becomes null and is counted.
//!
//! - [`normalize_nulls`]: collapse every null-like representation into [`Value::Null`]
//! - [`normalize`]: nulls + dates + decimals, driven by an inferred [`TableSchema`]
//! - [`correction::apply_schema`]: re-parse every column according to a corrected schema
//! - [`preview_from_path`]: first rows of a file, normalized for display

pub mod correction;

use std::path::Path;

use rayon::prelude::*;
use tracing::debug;

use crate::error::{CellParseError, LoadResult};
use crate::inference::{self, ColumnDates};
use crate::ingestion::{self, ReadOptions};
use crate::schema::{ColumnSchema, TableSchema};
use crate::types::{DataSet, Value};

pub use correction::{apply_schema, coerce_value};

/// Rows read by [`preview_from_path`] unless [`ReadOptions::max_rows`] says otherwise.
pub const DEFAULT_PREVIEW_ROWS: usize = 100;

/// A dataset after normalization, with what was done to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// The rewritten dataset.
    pub dataset: DataSet,
    /// Source names of the columns rewritten as dates.
    pub date_columns: Vec<String>,
    /// Non-null cells that failed coercion and were replaced by null.
    pub coerced_cells: usize,
}

/// Replace every null-like cell (NaN, blank text, `nan`/`nat`/`null` tokens) with
/// [`Value::Null`].
pub fn normalize_nulls(dataset: &mut DataSet) {
    dataset.rows.par_iter_mut().for_each(|row| {
        for cell in row.iter_mut() {
            if !cell.is_null() && cell.is_null_like() {
                *cell = Value::Null;
            }
        }
    });
}

/// Normalize a dataset for loading under `schema`: nulls are unified, columns with
/// `is_date` are rewritten to ISO dates and REAL/NUMERIC columns go through the decimal parser.
/// Other columns keep their values.
pub fn normalize(dataset: DataSet, schema: &TableSchema) -> Normalized {
    rewrite_columns(dataset, schema, |col, dates, value| {
        if col.is_date {
            Ok(dates.normalize(value))
        } else if col.storage_type.is_decimal() {
            inference::parse_decimal_value(value).map(Value::from)
        } else {
            Ok(value.clone())
        }
    })
}

/// Read the first rows of a file and normalize them the way a full load would.
pub fn preview_from_path(path: impl AsRef<Path>, options: &ReadOptions) -> LoadResult<DataSet> {
    let options = ReadOptions {
        max_rows: Some(options.max_rows.unwrap_or(DEFAULT_PREVIEW_ROWS)),
        ..options.clone()
    };
    let mut ds = ingestion::read_from_path(path, &options)?;
    normalize_nulls(&mut ds);
    let schema = inference::infer_schema(&ds);
    Ok(normalize(ds, &schema).dataset)
}

/// Rewrite every column named by `schema` cell by cell, columns in parallel.
///
/// Null cells stay null without calling `convert`. Cells whose conversion fails, or that
/// convert a non-null value to null, are counted as coerced. Columns taking the date path get
/// their date layout settled over all their values before any cell is converted.
pub(crate) fn rewrite_columns<F>(mut dataset: DataSet, schema: &TableSchema, convert: F) -> Normalized
where
    F: Fn(&ColumnSchema, &ColumnDates, &Value) -> Result<Value, CellParseError> + Sync,
{
    normalize_nulls(&mut dataset);

    let targets: Vec<(usize, &ColumnSchema)> = schema
        .columns
        .iter()
        .filter_map(|col| dataset.schema.index_of(&col.original_name).map(|idx| (idx, col)))
        .collect();
    let taken: Vec<(usize, &ColumnSchema, Vec<Value>)> = targets
        .into_iter()
        .map(|(idx, col)| (idx, col, dataset.take_column(idx)))
        .collect();

    let rewritten: Vec<(usize, &ColumnSchema, Vec<Value>, usize)> = taken
        .into_par_iter()
        .map(|(idx, col, values)| {
            let dates = if col.takes_date_path() {
                ColumnDates::settle(&values)
            } else {
                ColumnDates::default()
            };
            let mut coerced = 0usize;
            let out = values
                .iter()
                .map(|value| {
                    if value.is_null() {
                        return Value::Null;
                    }
                    match convert(col, &dates, value) {
                        Ok(Value::Null) => {
                            coerced += 1;
                            Value::Null
                        }
                        Ok(v) => v,
                        Err(err) => {
                            coerced += 1;
                            debug!(column = %col.original_name, %err, "cell coerced to null");
                            Value::Null
                        }
                    }
                })
                .collect();
            (idx, col, out, coerced)
        })
        .collect();

    let mut date_columns = Vec::new();
    let mut coerced_cells = 0usize;
    for (idx, col, values, coerced) in rewritten {
        if col.takes_date_path() {
            date_columns.push(col.original_name.clone());
        }
        coerced_cells += coerced;
        dataset.set_column(idx, values);
    }
    if coerced_cells > 0 {
        debug!(coerced_cells, "cells coerced to null during normalization");
    }

    Normalized {
        dataset,
        date_columns,
        coerced_cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::infer_schema;

    #[test]
    fn null_tokens_collapse_to_null() {
        let mut ds = DataSet::from_columns(vec![(
            "x",
            vec![
                Value::text("NULL"),
                Value::text(" "),
                Value::Float64(f64::NAN),
                Value::text("keep"),
            ],
        )]);
        normalize_nulls(&mut ds);
        let col: Vec<&Value> = ds.column(0).collect();
        assert_eq!(col, vec![&Value::Null, &Value::Null, &Value::Null, &Value::text("keep")]);
    }

    #[test]
    fn dates_become_iso_and_failures_null() {
        let ds = DataSet::from_columns(vec![(
            "Fecha",
            vec![Value::text("2023-01-15 08:30:00"), Value::text("null"), Value::text("15/02/2023")],
        )]);
        let schema = infer_schema(&ds);
        assert!(schema.columns[0].is_date);
        let out = normalize(ds, &schema);
        let col: Vec<&Value> = out.dataset.column(0).collect();
        assert_eq!(
            col,
            vec![&Value::text("2023-01-15"), &Value::Null, &Value::text("2023-02-15")]
        );
        assert_eq!(out.date_columns, vec!["Fecha".to_string()]);
        assert_eq!(out.coerced_cells, 0);
    }

    #[test]
    fn day_first_column_is_read_day_first_throughout() {
        let ds = DataSet::from_columns(vec![(
            "Fecha Alta",
            vec![Value::text("15/01/2023"), Value::text("05/03/2023"), Value::text("28/04/2023")],
        )]);
        let schema = infer_schema(&ds);
        let out = normalize(ds, &schema);
        let col: Vec<&Value> = out.dataset.column(0).collect();
        assert_eq!(
            col,
            vec![
                &Value::text("2023-01-15"),
                &Value::text("2023-03-05"),
                &Value::text("2023-04-28")
            ]
        );
    }

    #[test]
    fn preview_is_bounded_and_normalized() {
        let options = ReadOptions {
            max_rows: Some(2),
            ..ReadOptions::default()
        };
        let ds = preview_from_path("tests/fixtures/ventas.csv", &options).unwrap();
        assert_eq!(ds.row_count(), 2);
        let fecha = ds.schema.index_of("Fecha Alta").unwrap();
        assert_eq!(ds.rows[0][fecha], Value::text("2023-01-15"));
        let notas = ds.schema.index_of("Notas").unwrap();
        assert_eq!(ds.rows[1][notas], Value::Null);
    }
}
