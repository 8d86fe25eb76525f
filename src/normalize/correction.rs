//! Applying a corrected (reviewer-edited) schema to a dataset.

use crate::error::CellParseError;
use crate::inference::{parse_boolean_token, parse_decimal_value, ColumnDates};
use crate::schema::{ColumnSchema, StorageType, TableSchema};
use crate::types::{DataSet, Value};

use super::{rewrite_columns, Normalized};

/// Re-parse every column of `dataset` according to `schema`.
///
/// - DATE/DATETIME (and TEXT columns flagged `is_date`): ISO date path, regardless of what
///   auto-detection decided
/// - REAL/NUMERIC: decimal parser
/// - INTEGER: integers kept, floats truncated, integer text parsed; never read as a date
/// - BOOLEAN: binary tokens mapped to `1` / `0`
/// - TEXT: string form
/// - BLOB: unchanged
///
/// A cell that fails to parse under its type becomes null; the load goes on.
///
/// ```rust
/// use tabload::normalize::apply_schema;
/// use tabload::schema::{ColumnSchema, StorageType, TableSchema};
/// use tabload::types::{DataSet, Value};
///
/// let ds = DataSet::from_columns(vec![("CycleFee", vec![Value::text("-42,37"), Value::text("1,234.56")])]);
/// let schema = TableSchema::from_columns(vec![ColumnSchema::new("CycleFee", StorageType::Real)]);
///
/// let out = apply_schema(ds, &schema);
/// assert_eq!(out.dataset.rows[0][0], Value::Float64(-42.37));
/// assert_eq!(out.dataset.rows[1][0], Value::Float64(1234.56));
/// ```
pub fn apply_schema(dataset: DataSet, schema: &TableSchema) -> Normalized {
    rewrite_columns(dataset, schema, coerce_with)
}

/// Coerce one non-null cell to the column's storage type.
///
/// A lone date cell is read in the first layout that fits it; [`apply_schema`] settles one
/// layout per column instead.
pub fn coerce_value(col: &ColumnSchema, value: &Value) -> Result<Value, CellParseError> {
    coerce_with(col, &ColumnDates::settle([value]), value)
}

fn coerce_with(
    col: &ColumnSchema,
    dates: &ColumnDates,
    value: &Value,
) -> Result<Value, CellParseError> {
    if col.takes_date_path() {
        return Ok(dates.normalize(value));
    }
    match col.storage_type {
        StorageType::Real | StorageType::Numeric => parse_decimal_value(value).map(Value::from),
        StorageType::Integer => coerce_integer(value),
        StorageType::Boolean => coerce_boolean(value),
        StorageType::Text => Ok(value.to_text().map_or(Value::Null, Value::Utf8)),
        StorageType::Blob | StorageType::Date | StorageType::Datetime => Ok(value.clone()),
    }
}

fn coerce_integer(value: &Value) -> Result<Value, CellParseError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Int64(i) => Ok(Value::Int64(*i)),
        Value::Float64(f) => float_to_int(*f, value),
        Value::Utf8(s) => {
            let t = s.trim();
            if let Ok(i) = t.parse::<i64>() {
                return Ok(Value::Int64(i));
            }
            // Plain numeric text only ("12.0", "-3.5"); dates and locale-grouped tokens fail.
            match t.parse::<f64>() {
                Ok(f) if t.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+')) => {
                    float_to_int(f, value)
                }
                _ => Err(CellParseError::new(s.clone(), "integer", "not an integer")),
            }
        }
    }
}

fn float_to_int(f: f64, raw: &Value) -> Result<Value, CellParseError> {
    if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Ok(Value::Int64(f.trunc() as i64))
    } else {
        Err(CellParseError::new(raw.to_string(), "integer", "out of range"))
    }
}

fn coerce_boolean(value: &Value) -> Result<Value, CellParseError> {
    let token = value.to_text().unwrap_or_default();
    match value {
        Value::Float64(f) if *f == 1.0 => Ok(Value::Int64(1)),
        Value::Float64(f) if *f == 0.0 => Ok(Value::Int64(0)),
        _ => parse_boolean_token(&token)
            .map(|b| Value::Int64(i64::from(b)))
            .ok_or_else(|| CellParseError::new(token, "boolean", "not a binary token")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(ty: StorageType) -> ColumnSchema {
        ColumnSchema::new("c", ty)
    }

    #[test]
    fn integer_coercion_never_reads_dates() {
        let c = col(StorageType::Integer);
        assert_eq!(coerce_value(&c, &Value::Int64(0)), Ok(Value::Int64(0)));
        assert_eq!(coerce_value(&c, &Value::Float64(12.9)), Ok(Value::Int64(12)));
        assert_eq!(coerce_value(&c, &Value::text(" 77 ")), Ok(Value::Int64(77)));
        assert_eq!(coerce_value(&c, &Value::text("-3.5")), Ok(Value::Int64(-3)));
        assert!(coerce_value(&c, &Value::text("2023-01-15")).is_err());
        assert!(coerce_value(&c, &Value::text("1.234,5")).is_err());
    }

    #[test]
    fn boolean_coercion_maps_binary_tokens() {
        let c = col(StorageType::Boolean);
        assert_eq!(coerce_value(&c, &Value::text("Yes")), Ok(Value::Int64(1)));
        assert_eq!(coerce_value(&c, &Value::text("f")), Ok(Value::Int64(0)));
        assert_eq!(coerce_value(&c, &Value::Int64(1)), Ok(Value::Int64(1)));
        assert_eq!(coerce_value(&c, &Value::Float64(0.0)), Ok(Value::Int64(0)));
        assert!(coerce_value(&c, &Value::text("maybe")).is_err());
    }

    #[test]
    fn date_columns_take_the_date_path() {
        let c = col(StorageType::Date);
        assert_eq!(coerce_value(&c, &Value::text("2023-03-01 10:00:00")), Ok(Value::text("2023-03-01")));
        assert_eq!(coerce_value(&c, &Value::Int64(0)), Ok(Value::Null));
    }

    #[test]
    fn text_columns_stringify() {
        let c = col(StorageType::Text);
        assert_eq!(coerce_value(&c, &Value::Int64(5)), Ok(Value::text("5")));
    }
}
