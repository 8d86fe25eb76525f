//! `tabload` loads CSV and spreadsheet files into a relational store (SQLite) with an inferred
//! schema that a reviewer can correct before anything is written.
//!
//! The pipeline:
//!
//! 1. [`ingestion::read_from_path`] reads a file into a [`types::DataSet`] (column order kept,
//!    cells typed as null/int/float/text).
//! 2. [`inference::infer_schema`] decides a storage type per column and detects date columns;
//!    [`inference::detect_problems`] reports columns that look misclassified.
//! 3. [`normalize::normalize`] (inferred schema) or [`normalize::apply_schema`] (corrected
//!    schema) unify nulls, rewrite dates as `YYYY-MM-DD` and parse US/EU decimals.
//! 4. [`load::BulkLoader`] replaces the destination table and inserts rows in batches sized
//!    by column count, with progress, cancellation and an optional review pause.
//!
//! ## What you can read
//!
//! - **CSV**: `.csv`
//! - **Spreadsheets** (Cargo feature `excel`, on by default): `.xlsx`, `.xls`, `.xlsm`,
//!   `.xlsb`, `.ods`
//!
//! Blank cells and the tokens `nan`, `nat`, `null` (any case) become [`types::Value::Null`].
//!
//! ## Quick example: load a file
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tabload::ingestion::ReadOptions;
//! use tabload::load::{BulkLoader, Destination, LoadContext, LoadOptions, LoadRequest, Source, StdErrObserver};
//!
//! let loader = BulkLoader::new(LoadOptions::default());
//! let outcome = loader.run(
//!     LoadRequest::new(
//!         Source::path("clientes.xlsx", ReadOptions::default()),
//!         Destination::new("clientes.db", "clientes"),
//!     ),
//!     &LoadContext::new(Arc::new(StdErrObserver)),
//! );
//! println!("{} ({} rows)", outcome.message(), outcome.row_count());
//! ```
//!
//! ## Reviewing the schema first
//!
//! ```no_run
//! use tabload::ingestion::ReadOptions;
//! use tabload::load::{BulkLoader, Destination, LoadContext, LoadOptions, LoadRequest, ReviewDecision, Source};
//!
//! let loader = BulkLoader::new(LoadOptions::default());
//! let request = LoadRequest::new(
//!     Source::path("cuotas.csv", ReadOptions::default()),
//!     Destination::new("cuotas.db", "cuotas"),
//! );
//! if let Ok(pending) = loader.prepare(request, &LoadContext::default()) {
//!     for problem in pending.problems() {
//!         println!("{}: {}", problem.original_column_name, problem.message);
//!     }
//!     // May be resumed on any thread; the store connection is reopened there.
//!     let schema = pending.suggested_schema();
//!     let outcome = pending.resume(ReviewDecision::Corrected(schema));
//!     println!("{outcome}");
//! }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: CSV and spreadsheet readers
//! - [`types`]: source layout, cell values and the in-memory dataset
//! - [`schema`]: destination storage types and table schemas
//! - [`inference`]: date detection, decimal parsing, type inference, problem detection
//! - [`normalize`]: value normalization and schema correction
//! - [`load`]: the bulk loader, stores, observers and cancellation
//! - [`logging`]: `tracing-subscriber` setup for binaries
//! - [`error`]: error types

pub mod error;
pub mod inference;
pub mod ingestion;
pub mod load;
pub mod logging;
pub mod normalize;
pub mod schema;
pub mod types;

pub use error::{CellParseError, LoadError, LoadResult, ReadError, ReadResult, StoreError, StoreResult};
pub use load::{BulkLoader, LoadOutcome, PendingLoad, ReviewDecision};
pub use schema::{ColumnSchema, StorageType, TableSchema};
