use tabload::error::LoadError;
use tabload::inference::infer_schema;
use tabload::ingestion::csv::read_csv_from_path;
use tabload::normalize::{apply_schema, normalize_nulls};
use tabload::schema::{ColumnSchema, StorageType, TableSchema};
use tabload::types::{DataSet, Value};

fn ventas() -> DataSet {
    let mut ds = read_csv_from_path("tests/fixtures/ventas.csv", None).unwrap();
    normalize_nulls(&mut ds);
    ds
}

fn with_type(schema: &TableSchema, original: &str, ty: StorageType) -> TableSchema {
    let mut out = schema.clone();
    for col in &mut out.columns {
        if col.original_name == original {
            col.storage_type = ty;
        }
    }
    out
}

#[test]
fn text_amounts_corrected_to_real_are_parsed_in_either_locale() {
    let ds = ventas();
    let inferred = infer_schema(&ds);
    let corrected = with_type(&inferred, "Importe", StorageType::Real)
        .validated_for(&ds)
        .unwrap();

    let out = apply_schema(ds, &corrected);
    let idx = out.dataset.schema.index_of("Importe").unwrap();
    let amounts: Vec<&Value> = out.dataset.column(idx).collect();
    assert_eq!(
        amounts,
        vec![
            &Value::Float64(1234.56),
            &Value::Float64(-42.37),
            &Value::Float64(12_345_678.90),
            &Value::Float64(0.99),
        ]
    );
    assert_eq!(out.coerced_cells, 0);
}

#[test]
fn boolean_correction_maps_tokens_to_one_and_zero() {
    let ds = ventas();
    let corrected = with_type(&infer_schema(&ds), "Activo", StorageType::Boolean);

    let out = apply_schema(ds, &corrected);
    let idx = out.dataset.schema.index_of("Activo").unwrap();
    let flags: Vec<&Value> = out.dataset.column(idx).collect();
    assert_eq!(
        flags,
        vec![&Value::Int64(1), &Value::Int64(0), &Value::Int64(1), &Value::Int64(0)]
    );
}

#[test]
fn bad_cells_become_null_without_failing_the_column() {
    let ds = DataSet::from_columns(vec![(
        "monto",
        vec![Value::text("12,5"), Value::text("doce"), Value::Null],
    )]);
    let schema = TableSchema::from_columns(vec![ColumnSchema::new("monto", StorageType::Numeric)]);

    let out = apply_schema(ds, &schema);
    assert_eq!(out.dataset.rows[0][0], Value::Float64(12.5));
    assert_eq!(out.dataset.rows[1][0], Value::Null);
    assert_eq!(out.dataset.rows[2][0], Value::Null);
    assert_eq!(out.coerced_cells, 1);
}

#[test]
fn date_correction_applies_even_when_detection_declined() {
    // "pendiente" stops auto-detection; a corrected DATE type still parses the rest.
    let ds = DataSet::from_columns(vec![(
        "vencimiento",
        vec![Value::text("2023-03-01"), Value::text("pendiente"), Value::text("31/12/2023")],
    )]);
    let inferred = infer_schema(&ds);
    assert!(!inferred.columns[0].is_date);

    let corrected = with_type(&inferred, "vencimiento", StorageType::Date)
        .validated_for(&ds)
        .unwrap();
    assert!(corrected.columns[0].is_date);

    let out = apply_schema(ds, &corrected);
    assert_eq!(out.dataset.rows[0][0], Value::text("2023-03-01"));
    assert_eq!(out.dataset.rows[1][0], Value::Null);
    assert_eq!(out.dataset.rows[2][0], Value::text("2023-12-31"));
    assert_eq!(out.date_columns, vec!["vencimiento".to_string()]);
}

#[test]
fn date_correction_reads_the_column_in_one_layout() {
    let ds = DataSet::from_columns(vec![(
        "vencimiento",
        vec![Value::text("15/01/2023"), Value::text("05/03/2023")],
    )]);
    let schema = TableSchema::from_columns(vec![ColumnSchema::new("vencimiento", StorageType::Date)]);

    let out = apply_schema(ds, &schema);
    let col: Vec<&Value> = out.dataset.column(0).collect();
    assert_eq!(col, vec![&Value::text("2023-01-15"), &Value::text("2023-03-05")]);
    assert_eq!(out.coerced_cells, 0);
}

#[test]
fn integer_correction_never_reads_dates() {
    let ds = DataSet::from_columns(vec![(
        "codigo",
        vec![Value::text("0"), Value::text("2023-01-15"), Value::Float64(7.9)],
    )]);
    let schema = TableSchema::from_columns(vec![ColumnSchema::new("codigo", StorageType::Integer)]);

    let out = apply_schema(ds, &schema);
    let col: Vec<&Value> = out.dataset.column(0).collect();
    assert_eq!(col, vec![&Value::Int64(0), &Value::Null, &Value::Int64(7)]);
}

#[test]
fn corrected_schema_must_name_source_columns() {
    let ds = ventas();
    let schema = TableSchema::from_columns(vec![ColumnSchema::new("Missing", StorageType::Text)]);
    let err = schema.validated_for(&ds).unwrap_err();
    assert!(matches!(err, LoadError::InvalidSchema { .. }));
}

#[test]
fn corrected_schema_rejects_duplicate_names() {
    let ds = ventas();
    let mut schema = infer_schema(&ds);
    schema.columns[1].canonical_name = "ID_VENTA".to_string();
    let err = schema.validated_for(&ds).unwrap_err();
    assert!(err.to_string().contains("duplicate canonical name"));
}

#[test]
fn corrected_schema_round_trips_through_json() {
    let ds = ventas();
    let schema = with_type(&infer_schema(&ds), "Importe", StorageType::Real);
    let json = serde_json::to_string(&schema).unwrap();
    assert!(json.contains("\"REAL\""));

    let back: TableSchema = serde_json::from_str(&json).unwrap();
    assert_eq!(back, schema);
}
