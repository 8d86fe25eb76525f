//! Bulk loading into a relational store.
//!
//! A load runs through `Reading → Normalizing → PreparingStore → CreatingSchema → Inserting`
//! and ends `Completed`, `Cancelled` or `Failed`. Interactive loads additionally stop in
//! `AwaitingCorrection` after `PreparingStore` (see [`pending`]).
//!
//! Every load reports its outcome exactly once through [`LoadObserver::on_complete`]; errors
//! never escape the loader as `Err` or panics, they become [`LoadOutcome::Failed`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tabload::ingestion::ReadOptions;
//! use tabload::load::{BulkLoader, Destination, LoadContext, LoadOptions, LoadRequest, Source, StdErrObserver};
//!
//! let loader = BulkLoader::new(LoadOptions::default());
//! let request = LoadRequest::new(
//!     Source::path("ventas.csv", ReadOptions::default()),
//!     Destination::new("ventas.db", "ventas"),
//! );
//! let ctx = LoadContext::new(Arc::new(StdErrObserver));
//! let outcome = loader.run(request, &ctx);
//! println!("{outcome}");
//! ```

pub mod batch;
pub mod cancel;
pub mod observer;
pub mod pending;
pub mod store;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span, warn};

use crate::error::{LoadError, ReadError, ReadResult, StoreError};
use crate::inference::{detect_problems, infer_schema};
use crate::ingestion::{self, ReadOptions};
use crate::normalize::{normalize, normalize_nulls, Normalized};
use crate::schema::TableSchema;
use crate::types::{DataSet, Value};

pub use batch::BatchPolicy;
pub use cancel::CancellationToken;
pub use observer::{
    ChannelObserver, CompositeObserver, FileObserver, LoadEvent, LoadMetrics, LoadMetricsSnapshot,
    LoadObserver, LoadOutcome, LoadPhase, LoadProgress, LoadSummary, NoopObserver, StdErrObserver,
};
pub use pending::{AcceptInferred, ApplySuggestions, PendingLoad, ReviewDecision, SchemaReviewer};
pub use store::{
    create_table_sql, list_tables, Destination, InsertStatement, SqliteConnector, SqliteOptions,
    SqliteStore, Store, StoreConnector,
};

use batch::{chunk_ranges, insert_with_fallback};
use observer::Reporter;
use pending::Suspended;

/// Where the rows of a load come from.
#[derive(Debug, Clone)]
pub enum Source {
    /// A CSV or spreadsheet file, read in the `Reading` phase.
    Path { path: PathBuf, options: ReadOptions },
    /// Rows already in memory.
    DataSet(DataSet),
}

impl Source {
    pub fn path(path: impl Into<PathBuf>, options: ReadOptions) -> Self {
        Self::Path {
            path: path.into(),
            options,
        }
    }

    fn read(self) -> ReadResult<DataSet> {
        match self {
            Self::Path { path, options } => ingestion::read_from_path(&path, &options),
            Self::DataSet(dataset) => {
                dataset.check_shape()?;
                Ok(dataset)
            }
        }
    }
}

impl From<DataSet> for Source {
    fn from(dataset: DataSet) -> Self {
        Self::DataSet(dataset)
    }
}

/// One load: a source and the table it replaces.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub source: Source,
    pub destination: Destination,
}

impl LoadRequest {
    pub fn new(source: impl Into<Source>, destination: Destination) -> Self {
        Self {
            source: source.into(),
            destination,
        }
    }
}

/// Loader configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub batch: BatchPolicy,
    pub sqlite: SqliteOptions,
}

/// Per-load collaborators shared between the caller and the worker.
#[derive(Clone)]
pub struct LoadContext {
    pub observer: Arc<dyn LoadObserver>,
    pub cancel: CancellationToken,
    pub metrics: Arc<LoadMetrics>,
}

impl LoadContext {
    pub fn new(observer: Arc<dyn LoadObserver>) -> Self {
        Self {
            observer,
            cancel: CancellationToken::new(),
            metrics: Arc::new(LoadMetrics::new()),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl Default for LoadContext {
    fn default() -> Self {
        Self::new(Arc::new(NoopObserver))
    }
}

impl std::fmt::Debug for LoadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

/// Handle to a load running on a background worker thread.
#[derive(Debug)]
pub struct LoadHandle {
    cancel: CancellationToken,
    metrics: Arc<LoadMetrics>,
    thread: JoinHandle<()>,
}

impl LoadHandle {
    /// Request cooperative cancellation; the worker stops at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn metrics(&self) -> LoadMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the worker to exit. For interactive loads the outcome may arrive later, from
    /// whichever thread resumes the pending load.
    pub fn join(self) -> thread::Result<()> {
        self.thread.join()
    }
}

/// A stop requested by cancellation, or a fatal error.
#[derive(Debug)]
pub(crate) enum Interrupt {
    Cancelled,
    Failed(LoadError),
}

impl From<LoadError> for Interrupt {
    fn from(err: LoadError) -> Self {
        Self::Failed(err)
    }
}

impl From<ReadError> for Interrupt {
    fn from(err: ReadError) -> Self {
        Self::Failed(err.into())
    }
}

impl From<StoreError> for Interrupt {
    fn from(err: StoreError) -> Self {
        Self::Failed(err.into())
    }
}

pub(crate) fn checkpoint(ctx: &LoadContext) -> Result<(), Interrupt> {
    if ctx.cancel.is_cancelled() {
        Err(Interrupt::Cancelled)
    } else {
        Ok(())
    }
}

/// Turn the run result into the single outcome and deliver it.
pub(crate) fn finish(
    reporter: Reporter,
    ctx: &LoadContext,
    result: Result<LoadSummary, Interrupt>,
) -> LoadOutcome {
    ctx.metrics.end();
    let outcome = match result {
        Ok(summary) => LoadOutcome::Completed(summary),
        Err(Interrupt::Cancelled) => {
            info!("load cancelled");
            LoadOutcome::Cancelled
        }
        Err(Interrupt::Failed(err)) => {
            error!(%err, "load failed");
            LoadOutcome::Failed {
                message: err.to_string(),
            }
        }
    };
    reporter.finish(&outcome);
    outcome
}

/// Writes tabular files into a store, one load at a time per call.
#[derive(Clone)]
pub struct BulkLoader {
    connector: Arc<dyn StoreConnector>,
    options: LoadOptions,
}

impl std::fmt::Debug for BulkLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkLoader")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl BulkLoader {
    /// Loader writing to SQLite files with `options.sqlite`.
    pub fn new(options: LoadOptions) -> Self {
        let connector = Arc::new(SqliteConnector::new(options.sqlite.clone()));
        Self { connector, options }
    }

    /// Loader writing through a custom store.
    pub fn with_connector(connector: Arc<dyn StoreConnector>, options: LoadOptions) -> Self {
        Self { connector, options }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Run an automatic load (inferred schema, no review) on the calling thread.
    pub fn run(&self, request: LoadRequest, ctx: &LoadContext) -> LoadOutcome {
        let span = info_span!("load", table = %request.destination.table);
        let _entered = span.enter();
        ctx.metrics.begin();
        let mut reporter = Reporter::new(ctx.observer.clone());
        let result = self.run_automatic(request, ctx, &mut reporter);
        finish(reporter, ctx, result)
    }

    /// Run the phases up to `AwaitingCorrection` and suspend.
    ///
    /// On success the returned [`PendingLoad`] carries the inferred schema and problem
    /// reports; its outcome is delivered when it is resumed or dropped. If reading fails or
    /// the load is cancelled first, the outcome has already been delivered and is returned as
    /// `Err`.
    pub fn prepare(&self, request: LoadRequest, ctx: &LoadContext) -> Result<PendingLoad, LoadOutcome> {
        let span = info_span!("load", table = %request.destination.table);
        let _entered = span.enter();
        ctx.metrics.begin();
        let mut reporter = Reporter::new(ctx.observer.clone());
        match self.run_until_review(request, ctx, &mut reporter) {
            Ok((destination, dataset, inferred)) => {
                let problems = detect_problems(&dataset, &inferred);
                info!(columns = inferred.len(), problems = problems.len(), "awaiting schema review");
                reporter.progress(LoadPhase::AwaitingCorrection, 0.3, "Awaiting schema review");
                Ok(PendingLoad::new(Suspended {
                    loader: self.clone(),
                    ctx: ctx.clone(),
                    reporter,
                    destination,
                    dataset,
                    inferred,
                    problems,
                }))
            }
            Err(interrupt) => Err(finish(reporter, ctx, Err(interrupt))),
        }
    }

    /// Run an automatic load on a new worker thread.
    pub fn spawn(&self, request: LoadRequest, ctx: LoadContext) -> io::Result<LoadHandle> {
        let loader = self.clone();
        let (cancel, metrics) = (ctx.cancel.clone(), ctx.metrics.clone());
        let thread = thread::Builder::new()
            .name("tabload-worker".to_string())
            .spawn(move || {
                loader.run(request, &ctx);
            })?;
        Ok(LoadHandle {
            cancel,
            metrics,
            thread,
        })
    }

    /// Run an interactive load on a new worker thread; the suspended load is handed to
    /// `reviewer` from that thread.
    pub fn spawn_interactive(
        &self,
        request: LoadRequest,
        ctx: LoadContext,
        reviewer: Arc<dyn SchemaReviewer>,
    ) -> io::Result<LoadHandle> {
        let loader = self.clone();
        let (cancel, metrics) = (ctx.cancel.clone(), ctx.metrics.clone());
        let thread = thread::Builder::new()
            .name("tabload-worker".to_string())
            .spawn(move || {
                if let Ok(pending) = loader.prepare(request, &ctx) {
                    reviewer.review(pending);
                }
            })?;
        Ok(LoadHandle {
            cancel,
            metrics,
            thread,
        })
    }

    fn run_automatic(
        &self,
        request: LoadRequest,
        ctx: &LoadContext,
        reporter: &mut Reporter,
    ) -> Result<LoadSummary, Interrupt> {
        let LoadRequest { source, destination } = request;
        check_destination(&destination)?;
        let dataset = read(source, ctx, reporter)?;

        reporter.progress(LoadPhase::Normalizing, 0.2, "Normalizing dates and null values");
        let (dataset, schema) = infer(dataset)?;
        let normalized = normalize(dataset, &schema);
        checkpoint(ctx)?;

        let store = self.open_store(&destination, ctx, reporter, "Opening destination")?;
        self.write(store, &destination, &schema, normalized, ctx, reporter)
    }

    fn run_until_review(
        &self,
        request: LoadRequest,
        ctx: &LoadContext,
        reporter: &mut Reporter,
    ) -> Result<(Destination, DataSet, TableSchema), Interrupt> {
        let LoadRequest { source, destination } = request;
        check_destination(&destination)?;
        let dataset = read(source, ctx, reporter)?;

        reporter.progress(LoadPhase::Normalizing, 0.2, "Normalizing null values");
        let (dataset, schema) = infer(dataset)?;
        checkpoint(ctx)?;

        // The destination must be reachable before asking for review; the connection itself
        // does not survive the suspension.
        let store = self.open_store(&destination, ctx, reporter, "Checking destination")?;
        store.close()?;
        Ok((destination, dataset, schema))
    }

    pub(crate) fn open_store(
        &self,
        destination: &Destination,
        ctx: &LoadContext,
        reporter: &mut Reporter,
        message: &str,
    ) -> Result<Box<dyn Store>, Interrupt> {
        reporter.progress(LoadPhase::PreparingStore, 0.3, message);
        let store = self.connector.connect(destination)?;
        if ctx.cancel.is_cancelled() {
            close_quietly(store);
            return Err(Interrupt::Cancelled);
        }
        Ok(store)
    }

    /// `CreatingSchema` and `Inserting`; the store is closed whatever happens.
    pub(crate) fn write(
        &self,
        mut store: Box<dyn Store>,
        destination: &Destination,
        schema: &TableSchema,
        normalized: Normalized,
        ctx: &LoadContext,
        reporter: &mut Reporter,
    ) -> Result<LoadSummary, Interrupt> {
        match self.write_rows(store.as_mut(), destination, schema, normalized, ctx, reporter) {
            Ok(summary) => {
                store.close()?;
                reporter.progress(LoadPhase::Completed, 1.0, summary.message());
                Ok(summary)
            }
            Err(interrupt) => {
                close_quietly(store);
                Err(interrupt)
            }
        }
    }

    fn write_rows(
        &self,
        store: &mut dyn Store,
        destination: &Destination,
        schema: &TableSchema,
        normalized: Normalized,
        ctx: &LoadContext,
        reporter: &mut Reporter,
    ) -> Result<LoadSummary, Interrupt> {
        checkpoint(ctx)?;
        reporter.progress(
            LoadPhase::CreatingSchema,
            0.4,
            format!("Creating table '{}'", destination.table),
        );
        for sql in create_table_sql(&destination.table, schema) {
            store.execute(&sql)?;
        }
        store.commit()?;

        let Normalized {
            dataset,
            date_columns,
            coerced_cells,
        } = normalized;
        let rows = project_rows(dataset, schema);
        let insert = InsertStatement::for_schema(destination.table.clone(), schema);
        let batch_size = self.options.batch.batch_size(schema.len());
        let ranges = chunk_ranges(rows.len(), batch_size);
        info!(rows = rows.len(), columns = schema.len(), batch_size, batches = ranges.len(), "inserting");
        reporter.progress(
            LoadPhase::Inserting,
            0.5,
            format!("Inserting {} rows in batches of {batch_size}", rows.len()),
        );

        let mut fallback_batches = 0usize;
        for (done, range) in ranges.iter().enumerate() {
            checkpoint(ctx)?;
            let batch = &rows[range.clone()];
            let fell_back =
                insert_with_fallback(store, &insert, batch, self.options.batch.fallback_batch)?;
            store.commit()?;
            fallback_batches += usize::from(fell_back);
            ctx.metrics.on_batch_committed(batch.len(), fell_back);
            debug!(batch = done + 1, rows = batch.len(), fell_back, "batch committed");

            let fraction = 0.5 + 0.4 * (done + 1) as f64 / ranges.len() as f64;
            reporter.progress(
                LoadPhase::Inserting,
                fraction,
                format!("Inserted {} of {} rows", range.end, rows.len()),
            );
        }

        Ok(LoadSummary {
            table: destination.table.clone(),
            rows: rows.len(),
            date_columns,
            batches: ranges.len(),
            fallback_batches,
            coerced_cells,
        })
    }
}

fn check_destination(destination: &Destination) -> Result<(), Interrupt> {
    if destination.table.trim().is_empty() {
        return Err(LoadError::InvalidSchema {
            message: "destination table name is empty".to_string(),
        }
        .into());
    }
    Ok(())
}

fn read(source: Source, ctx: &LoadContext, reporter: &mut Reporter) -> Result<DataSet, Interrupt> {
    checkpoint(ctx)?;
    reporter.progress(LoadPhase::Reading, 0.1, "Reading source file");
    let dataset = source.read()?;
    ctx.metrics.on_rows_read(dataset.row_count());
    info!(rows = dataset.row_count(), columns = dataset.column_count(), "source read");
    checkpoint(ctx)?;
    Ok(dataset)
}

/// Unify nulls and infer the schema; a source without columns cannot become a table.
fn infer(mut dataset: DataSet) -> Result<(DataSet, TableSchema), Interrupt> {
    normalize_nulls(&mut dataset);
    let schema = infer_schema(&dataset);
    if schema.is_empty() {
        return Err(LoadError::InvalidSchema {
            message: "source has no columns".to_string(),
        }
        .into());
    }
    Ok((dataset, schema))
}

/// Rows in schema column order; columns the schema does not name are dropped.
fn project_rows(dataset: DataSet, schema: &TableSchema) -> Vec<Vec<Value>> {
    let indices: Vec<Option<usize>> = schema
        .columns
        .iter()
        .map(|c| dataset.schema.index_of(&c.original_name))
        .collect();
    dataset
        .rows
        .into_iter()
        .map(|mut row| {
            indices
                .iter()
                .map(|idx| {
                    idx.and_then(|i| row.get_mut(i))
                        .map(std::mem::take)
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect()
}

fn close_quietly(store: Box<dyn Store>) {
    if let Err(err) = store.close() {
        warn!(%err, "closing store failed");
    }
}
