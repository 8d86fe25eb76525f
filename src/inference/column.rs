//! Column type inference and whole-table schema inference.

use rayon::prelude::*;
use tracing::debug;

use crate::schema::{ColumnSchema, StorageType, TableSchema};
use crate::types::{DataSet, Value};

use super::dates::{self, ColumnDates, DATE_SAMPLE_SIZE};

/// Decide the storage type of a (non-date) column from its non-null values.
///
/// - empty sample: `TEXT`, no example
/// - every value an integer: `INTEGER`, example is the first value
/// - every value numeric, at least one float: `REAL`, example is the first value as a float
/// - anything else: `TEXT`, example is the first value's string form
pub fn infer_column_type(sample: &[&Value]) -> (StorageType, Option<Value>) {
    let Some(first) = sample.first() else {
        return (StorageType::Text, None);
    };

    if sample.iter().all(|v| matches!(v, Value::Int64(_))) {
        return (StorageType::Integer, Some((*first).clone()));
    }
    if sample
        .iter()
        .all(|v| matches!(v, Value::Int64(_) | Value::Float64(_)))
    {
        return (StorageType::Real, first.as_f64().map(Value::Float64));
    }
    (StorageType::Text, first.to_text().map(Value::Utf8))
}

/// Infer the destination schema of a dataset.
///
/// Date columns (see [`dates::is_date_column`]) are typed `TEXT` with `is_date = true`; their
/// example value is the first value in ISO form. Other columns go through
/// [`infer_column_type`] over all their non-null values. Canonical-name collisions are
/// resolved by suffixing and recorded in [`TableSchema::warnings`].
pub fn infer_schema(dataset: &DataSet) -> TableSchema {
    let columns: Vec<ColumnSchema> = dataset
        .schema
        .fields
        .par_iter()
        .enumerate()
        .map(|(idx, field)| {
            let non_null = dataset.sample(idx, usize::MAX);
            let date_sample = &non_null[..non_null.len().min(DATE_SAMPLE_SIZE)];

            let mut col = if dates::is_date_column(&field.name, field.data_type, date_sample) {
                let column_dates = ColumnDates::settle(non_null.iter().copied());
                let example = non_null
                    .iter()
                    .map(|v| column_dates.normalize(v))
                    .find(|v| !v.is_null());
                ColumnSchema {
                    is_date: true,
                    sample_value: example,
                    ..ColumnSchema::new(field.name.clone(), StorageType::Text)
                }
            } else {
                let (storage_type, example) = infer_column_type(&non_null);
                ColumnSchema {
                    sample_value: example,
                    ..ColumnSchema::new(field.name.clone(), storage_type)
                }
            };
            if col.canonical_name.is_empty() {
                col.canonical_name = format!("column_{}", idx + 1);
            }
            col
        })
        .collect();

    let schema = TableSchema::from_columns(columns);
    debug!(
        columns = schema.len(),
        date_columns = schema.columns.iter().filter(|c| c.is_date).count(),
        "schema inferred"
    );
    schema
}

/// Canonical names for a list of source names, collision-resolved the same way
/// [`infer_schema`] does.
pub fn canonical_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let columns = names
        .into_iter()
        .map(|n| ColumnSchema::new(n, StorageType::Text))
        .collect();
    TableSchema::from_columns(columns)
        .columns
        .into_iter()
        .map(|c| c.canonical_name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_real_and_text_samples() {
        let ints = [Value::Int64(0), Value::Int64(7)];
        let refs: Vec<&Value> = ints.iter().collect();
        assert_eq!(infer_column_type(&refs), (StorageType::Integer, Some(Value::Int64(0))));

        let floats = [Value::Int64(1), Value::Float64(2.5)];
        let refs: Vec<&Value> = floats.iter().collect();
        assert_eq!(infer_column_type(&refs), (StorageType::Real, Some(Value::Float64(1.0))));

        let text = [Value::Int64(1), Value::text("x")];
        let refs: Vec<&Value> = text.iter().collect();
        assert_eq!(infer_column_type(&refs), (StorageType::Text, Some(Value::text("1"))));

        assert_eq!(infer_column_type(&[]), (StorageType::Text, None));
    }

    #[test]
    fn unnamed_columns_get_positional_names() {
        let ds = DataSet::from_columns(vec![("%%", vec![Value::Int64(1)])]);
        let schema = infer_schema(&ds);
        assert_eq!(schema.columns[0].canonical_name, "column_1");
    }

    #[test]
    fn canonical_names_resolve_collisions() {
        assert_eq!(canonical_names(["A-B", "A B"]), vec!["A_B", "A_B_2"]);
    }
}
