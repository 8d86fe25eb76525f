use std::io::Write;

use tabload::error::ReadError;
use tabload::ingestion::csv::{read_csv_from_path, read_csv_from_reader};
use tabload::ingestion::{read_from_path, ReadOptions, SourceFormat};
use tabload::types::{DataType, Value};

fn reader(input: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input.as_bytes())
}

#[test]
fn read_csv_from_path_keeps_column_order_and_types() {
    let ds = read_csv_from_path("tests/fixtures/cuotas.csv", None).unwrap();

    assert_eq!(ds.row_count(), 5);
    assert_eq!(
        ds.schema.field_names().collect::<Vec<_>>(),
        vec!["Contrato", "Fecha_Inicio_Cuota", "Codigo_Numerico"]
    );
    assert_eq!(
        ds.rows[2],
        vec![Value::Int64(2_000_000), Value::Null, Value::Int64(200)]
    );
    assert_eq!(ds.schema.fields[0].data_type, DataType::Int64);
    assert_eq!(ds.schema.fields[1].data_type, DataType::Utf8);
}

#[test]
fn locale_numbers_stay_text() {
    let ds = read_csv_from_path("tests/fixtures/ventas.csv", None).unwrap();
    let importe = ds.schema.index_of("Importe").unwrap();
    assert_eq!(ds.rows[0][importe], Value::text("1.234,56"));
    assert_eq!(ds.rows[1][importe], Value::text("-42,37"));
}

#[test]
fn short_rows_are_padded_and_long_rows_truncated() {
    let mut rdr = reader("a,b,c\n1,2\n1,2,3,4\n");
    let ds = read_csv_from_reader(&mut rdr, None).unwrap();
    assert_eq!(ds.rows[0], vec![Value::Int64(1), Value::Int64(2), Value::Null]);
    assert_eq!(ds.rows[1], vec![Value::Int64(1), Value::Int64(2), Value::Int64(3)]);
}

#[test]
fn duplicate_and_blank_headers_get_unique_names() {
    let mut rdr = reader("id,,id\n1,2,3\n");
    let ds = read_csv_from_reader(&mut rdr, None).unwrap();
    assert_eq!(
        ds.schema.field_names().collect::<Vec<_>>(),
        vec!["id", "Unnamed: 1", "id.1"]
    );
}

#[test]
fn max_rows_limits_the_read() {
    let ds = read_csv_from_path("tests/fixtures/cuotas.csv", Some(2)).unwrap();
    assert_eq!(ds.row_count(), 2);
}

#[test]
fn read_from_path_detects_csv_by_extension() {
    let mut file = tempfile::Builder::new().suffix(".CSV").tempfile().unwrap();
    writeln!(file, "x,y\n1.5,hello").unwrap();

    let ds = read_from_path(file.path(), &ReadOptions::default()).unwrap();
    assert_eq!(ds.rows[0], vec![Value::Float64(1.5), Value::text("hello")]);
}

#[test]
fn forced_format_overrides_extension() {
    let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    writeln!(file, "x\n7").unwrap();

    let options = ReadOptions {
        format: Some(SourceFormat::Csv),
        ..ReadOptions::default()
    };
    let ds = read_from_path(file.path(), &options).unwrap();
    assert_eq!(ds.rows[0], vec![Value::Int64(7)]);
}

#[test]
fn unknown_extension_is_unsupported() {
    let err = read_from_path("data.parquet", &ReadOptions::default()).unwrap_err();
    assert!(matches!(err, ReadError::UnsupportedFormat { .. }));
}

#[test]
fn missing_file_is_a_read_error() {
    let err = read_from_path("tests/fixtures/does-not-exist.csv", &ReadOptions::default()).unwrap_err();
    assert!(matches!(err, ReadError::Csv(_) | ReadError::Io(_)));
}
