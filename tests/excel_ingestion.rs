#![cfg(feature = "excel_test_writer")]

use std::path::Path;

use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use tempfile::TempDir;

use tabload::error::ReadError;
use tabload::inference::infer_schema;
use tabload::ingestion::excel::read_excel_from_path;
use tabload::ingestion::{read_from_path, ReadOptions, SheetSelection};
use tabload::load::{BulkLoader, Destination, LoadContext, LoadOptions, LoadRequest, Source};
use tabload::normalize::normalize;
use tabload::schema::StorageType;
use tabload::types::{DataType, Value};

/// Two sheets: `Cuotas` (with a native date column) and `Second`, a one-row sheet whose header
/// sits below two blank rows.
fn write_workbook(path: &Path) {
    let mut wb = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    let ws = wb.add_worksheet();
    ws.set_name("Cuotas").unwrap();
    for (col, header) in ["Contrato", "Cliente", "Cuota", "Fecha Inicio"].iter().enumerate() {
        ws.write_string(0, col as u16, *header).unwrap();
    }
    let rows = [(1_592_237, "Ada", 98.5, (2023, 1, 15)), (0, "Grace", 87.25, (2023, 2, 20))];
    for (i, (contrato, cliente, cuota, (y, m, d))) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_number(row, 0, *contrato).unwrap();
        ws.write_string(row, 1, *cliente).unwrap();
        ws.write_number(row, 2, *cuota).unwrap();
        let date = ExcelDateTime::from_ymd(*y, *m, *d).unwrap();
        ws.write_datetime_with_format(row, 3, &date, &date_format).unwrap();
    }

    let ws2 = wb.add_worksheet();
    ws2.set_name("Second").unwrap();
    ws2.write_string(2, 0, "id").unwrap();
    ws2.write_string(2, 1, "activo").unwrap();
    ws2.write_number(3, 0, 3).unwrap();
    ws2.write_boolean(3, 1, true).unwrap();

    wb.save(path).unwrap();
}

fn workbook() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cuotas.xlsx");
    write_workbook(&path);
    (dir, path)
}

#[test]
fn first_sheet_is_read_with_typed_cells() {
    let (_dir, path) = workbook();
    let ds = read_excel_from_path(&path, None, None).unwrap();

    assert_eq!(ds.row_count(), 2);
    assert_eq!(
        ds.schema.field_names().collect::<Vec<_>>(),
        vec!["Contrato", "Cliente", "Cuota", "Fecha Inicio"]
    );
    assert_eq!(ds.rows[0][0], Value::Int64(1_592_237));
    assert_eq!(ds.rows[1][0], Value::Int64(0));
    assert_eq!(ds.rows[0][1], Value::text("Ada"));
    assert_eq!(ds.rows[0][2], Value::Float64(98.5));
    assert_eq!(ds.schema.fields[3].data_type, DataType::DateTime);
}

#[test]
fn native_dates_become_a_date_column() {
    let (_dir, path) = workbook();
    let ds = read_excel_from_path(&path, None, None).unwrap();
    let schema = infer_schema(&ds);

    assert!(schema.by_original("Fecha Inicio").unwrap().is_date);
    assert_eq!(schema.by_original("Contrato").unwrap().storage_type, StorageType::Integer);
    assert!(!schema.by_original("Contrato").unwrap().is_date);

    let out = normalize(ds, &schema);
    assert_eq!(out.dataset.rows[0][3], Value::text("2023-01-15"));
    assert_eq!(out.dataset.rows[1][3], Value::text("2023-02-20"));
    assert_eq!(out.dataset.rows[1][0], Value::Int64(0));
}

#[test]
fn named_sheet_and_header_below_blank_rows() {
    let (_dir, path) = workbook();
    let options = ReadOptions {
        sheet: SheetSelection::Named("Second".to_string()),
        ..ReadOptions::default()
    };
    let ds = read_from_path(&path, &options).unwrap();

    assert_eq!(ds.schema.field_names().collect::<Vec<_>>(), vec!["id", "activo"]);
    assert_eq!(ds.rows, vec![vec![Value::Int64(3), Value::text("true")]]);
}

#[test]
fn missing_sheet_is_an_error() {
    let (_dir, path) = workbook();
    let err = read_excel_from_path(&path, Some("Nope"), None).unwrap_err();
    assert!(matches!(err, ReadError::Excel(_)), "{err:?}");
}

#[test]
fn max_rows_limits_sheet_rows() {
    let (_dir, path) = workbook();
    let ds = read_excel_from_path(&path, None, Some(1)).unwrap();
    assert_eq!(ds.row_count(), 1);
}

#[test]
fn workbook_loads_into_sqlite() {
    let (dir, path) = workbook();
    let db = dir.path().join("cuotas.db");
    let request = LoadRequest::new(
        Source::path(&path, ReadOptions::default()),
        Destination::new(&db, "cuotas"),
    );
    let outcome = BulkLoader::new(LoadOptions::default()).run(request, &LoadContext::default());
    assert_eq!(outcome.row_count(), 2, "{outcome}");

    let conn = rusqlite::Connection::open(&db).unwrap();
    let dates: Vec<String> = conn
        .prepare(r#"SELECT "Fecha_Inicio" FROM "cuotas" ORDER BY "Contrato" DESC"#)
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(dates, vec!["2023-01-15".to_string(), "2023-02-20".to_string()]);
}
