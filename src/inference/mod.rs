//! Schema inference.
//!
//! - [`dates`]: date-column detection and ISO normalization
//! - [`decimal`]: US/EU decimal token parsing
//! - [`column`]: per-column storage type inference and [`infer_schema`]
//! - [`problems`]: advisory misclassification reports for a reviewer
//!
//! ## Example
//!
//! ```rust
//! use tabload::inference::{detect_problems, infer_schema};
//! use tabload::schema::StorageType;
//! use tabload::types::{DataSet, Value};
//!
//! let ds = DataSet::from_columns(vec![
//!     ("Contrato", vec![Value::Int64(0), Value::Int64(1_592_237)]),
//!     ("Fecha Alta", vec![Value::text("2023-01-15"), Value::text("2023-02-20")]),
//!     ("Activo", vec![Value::text("si"), Value::text("no")]),
//! ]);
//!
//! let schema = infer_schema(&ds);
//! assert_eq!(schema.columns[0].storage_type, StorageType::Integer);
//! assert!(schema.columns[1].is_date);
//! assert_eq!(schema.columns[1].canonical_name, "Fecha_Alta");
//!
//! let problems = detect_problems(&ds, &schema);
//! assert!(problems.iter().any(|p| p.suggested_type == StorageType::Boolean));
//! ```

pub mod column;
pub mod dates;
pub mod decimal;
pub mod problems;

pub use column::{canonical_names, infer_column_type, infer_schema};
pub use dates::{
    is_date_column, name_suggests_date, normalize_date_value, parse_date_value, ColumnDates,
    DateLayout,
};
pub use decimal::{parse_decimal, parse_decimal_value};
pub use problems::{detect_problems, parse_boolean_token, ProblemCategory, ProblemReport};
