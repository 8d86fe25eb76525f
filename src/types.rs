//! Core data model types for ingestion.
//!
//! Source files are read into an in-memory [`DataSet`]: an ordered list of columns (the
//! [`Schema`], one [`Field`] per source column) plus row-major [`Value`] storage. Every cell is
//! one of four tagged variants; all heuristics downstream match on the tag instead of probing
//! strings at runtime.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ReadError, ReadResult};

/// Declared type of a source column, derived from its non-null cells at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    /// Every non-null cell is an integer.
    Int64,
    /// Every non-null cell is numeric and at least one has a fractional representation.
    Float64,
    /// Free-form text, or a mix of text and numbers.
    Utf8,
    /// Every non-null cell was a native spreadsheet date/time.
    DateTime,
    /// The column has no non-null cells.
    Empty,
}

impl DataType {
    /// Whether the column is free-form text or datetime, i.e. a date candidate by type.
    pub fn is_textual(self) -> bool {
        matches!(self, Self::Utf8 | Self::DateTime)
    }
}

/// A single named source column in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Column name exactly as it appears in the source header.
    pub name: String,
    /// Declared type of the column.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered source columns of a [`DataSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Lowercase text tokens treated as null by the normalizer (blank text is null as well).
pub const NULL_TOKENS: &[&str] = &["nan", "nat", "null"];

/// A single cell value.
///
/// Serialized untagged, so a schema sample value reads as `42`, `1.5`, `"text"` or `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing value; the single null marker after normalization.
    #[default]
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// Create a text value.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Utf8(s.into())
    }

    /// Returns true for [`Value::Null`] only.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true for anything the normalizer collapses into [`Value::Null`]: the null
    /// marker itself, NaN floats, blank text and the [`NULL_TOKENS`].
    pub fn is_null_like(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Int64(_) => false,
            Self::Float64(f) => f.is_nan(),
            Self::Utf8(s) => {
                let t = s.trim();
                t.is_empty() || NULL_TOKENS.iter().any(|tok| t.eq_ignore_ascii_case(tok))
            }
        }
    }

    /// The value as a float, for numeric variants.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int64(i) => Some(*i as f64),
            Self::Float64(f) => Some(*f),
            _ => None,
        }
    }

    /// The value as text, for the text variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Utf8(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// String form of the value (`None` for null).
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int64(i) => write!(f, "{i}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Utf8(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Utf8(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Utf8(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields; all rows
/// share that one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Build a dataset from column names and raw rows, deriving each column's declared
    /// [`DataType`] from the values.
    ///
    /// Short rows are padded with [`Value::Null`]; longer rows are truncated.
    pub fn from_rows<S: Into<String>>(names: impl IntoIterator<Item = S>, rows: Vec<Vec<Value>>) -> Self {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let width = names.len();
        let rows: Vec<Vec<Value>> = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        let fields = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| Field::new(name, declared_type(rows.iter().map(|r| &r[idx]))))
            .collect();
        Self::new(Schema::new(fields), rows)
    }

    /// Build a dataset column-wise, e.g. `[("id", vec![1.into(), 2.into()])]`.
    ///
    /// Columns of unequal length are padded with nulls.
    pub fn from_columns<S: Into<String>>(columns: Vec<(S, Vec<Value>)>) -> Self {
        let height = columns.iter().map(|(_, c)| c.len()).max().unwrap_or(0);
        let mut names = Vec::with_capacity(columns.len());
        let mut rows = vec![Vec::with_capacity(columns.len()); height];
        for (name, values) in columns {
            names.push(name.into());
            let mut values = values.into_iter();
            for row in rows.iter_mut() {
                row.push(values.next().unwrap_or_default());
            }
        }
        Self::from_rows(names, rows)
    }

    /// Check that every row has one value per schema field.
    ///
    /// [`DataSet::new`] and the public `rows` field take rows as given; row-wise accessors
    /// assume this holds.
    pub fn check_shape(&self) -> ReadResult<()> {
        let width = self.column_count();
        match self.rows.iter().position(|row| row.len() != width) {
            None => Ok(()),
            Some(idx) => Err(ReadError::Layout {
                message: format!(
                    "row {} has {} values, expected {width}",
                    idx + 1,
                    self.rows[idx].len()
                ),
            }),
        }
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the dataset.
    pub fn column_count(&self) -> usize {
        self.schema.fields.len()
    }

    /// Iterate the values of column `idx` in row order.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |row| &row[idx])
    }

    /// Up to `limit` non-null-like values of column `idx`, in row order.
    pub fn sample(&self, idx: usize, limit: usize) -> Vec<&Value> {
        self.column(idx).filter(|v| !v.is_null_like()).take(limit).collect()
    }

    /// Replace column `idx` with `values` (one per row).
    pub(crate) fn set_column(&mut self, idx: usize, values: Vec<Value>) {
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
    }

    /// Take column `idx` out of the dataset, leaving nulls behind.
    pub(crate) fn take_column(&mut self, idx: usize) -> Vec<Value> {
        self.rows.iter_mut().map(|row| std::mem::take(&mut row[idx])).collect()
    }
}

/// Derive the declared type of a column from its cells.
pub fn declared_type<'a>(values: impl Iterator<Item = &'a Value>) -> DataType {
    let mut seen_int = false;
    let mut seen_float = false;
    let mut seen_text = false;
    for v in values {
        match v {
            Value::Null => {}
            Value::Int64(_) => seen_int = true,
            Value::Float64(f) if f.is_nan() => {}
            Value::Float64(_) => seen_float = true,
            Value::Utf8(_) => seen_text = true,
        }
    }
    match (seen_int, seen_float, seen_text) {
        (_, _, true) => DataType::Utf8,
        (_, true, false) => DataType::Float64,
        (true, false, false) => DataType::Int64,
        (false, false, false) => DataType::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_must_match_the_schema_width() {
        let schema = Schema::new(vec![Field::new("a", DataType::Int64), Field::new("b", DataType::Int64)]);
        let ds = DataSet::new(schema.clone(), vec![vec![Value::Int64(1), Value::Int64(2)]]);
        assert!(ds.check_shape().is_ok());

        let short = DataSet::new(schema, vec![vec![Value::Int64(1), Value::Int64(2)], vec![Value::Int64(1)]]);
        let err = short.check_shape().unwrap_err();
        assert!(err.to_string().contains("row 2 has 1 values, expected 2"), "{err}");
    }

    #[test]
    fn declared_type_follows_cells() {
        let ds = DataSet::from_columns(vec![
            ("ints", vec![Value::Int64(1), Value::Null, Value::Int64(3)]),
            ("floats", vec![Value::Int64(1), Value::Float64(2.5), Value::Null]),
            ("mixed", vec![Value::Int64(1), Value::text("a"), Value::Null]),
            ("empty", vec![Value::Null, Value::Null, Value::Null]),
        ]);
        let types: Vec<DataType> = ds.schema.fields.iter().map(|f| f.data_type).collect();
        assert_eq!(
            types,
            vec![DataType::Int64, DataType::Float64, DataType::Utf8, DataType::Empty]
        );
    }

    #[test]
    fn null_like_covers_tokens_and_blank_text() {
        assert!(Value::text("  ").is_null_like());
        assert!(Value::text("NULL").is_null_like());
        assert!(Value::text("NaT").is_null_like());
        assert!(Value::Float64(f64::NAN).is_null_like());
        assert!(!Value::text("none").is_null_like());
        assert!(!Value::Int64(0).is_null_like());
    }

    #[test]
    fn from_rows_pads_short_rows() {
        let ds = DataSet::from_rows(["a", "b"], vec![vec![Value::Int64(1)]]);
        assert_eq!(ds.rows[0], vec![Value::Int64(1), Value::Null]);
        assert_eq!(ds.sample(1, 10).len(), 0);
    }
}
