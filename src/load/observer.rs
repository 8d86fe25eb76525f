//! Progress reporting, completion outcomes and load metrics.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::info;

/// Stage of a load, in the order a load goes through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    Reading,
    Normalizing,
    PreparingStore,
    /// Interactive loads only: suspended until a reviewer resumes or abandons the load.
    AwaitingCorrection,
    CreatingSchema,
    Inserting,
    Completed,
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Reading => "reading",
            Self::Normalizing => "normalizing",
            Self::PreparingStore => "preparing_store",
            Self::AwaitingCorrection => "awaiting_correction",
            Self::CreatingSchema => "creating_schema",
            Self::Inserting => "inserting",
            Self::Completed => "completed",
        })
    }
}

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadProgress {
    pub phase: LoadPhase,
    /// Fraction in `[0, 1]`, non-decreasing within one load.
    pub fraction: f64,
    pub message: String,
}

/// What a successful load did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub table: String,
    pub rows: usize,
    /// Source names of the columns written as ISO dates.
    pub date_columns: Vec<String>,
    /// Batches committed.
    pub batches: usize,
    /// Batches that hit the parameter limit and were re-sent as sub-batches.
    pub fallback_batches: usize,
    /// Cells that failed to coerce and were stored as null.
    pub coerced_cells: usize,
}

impl LoadSummary {
    /// Human-readable completion message, naming the normalized date columns.
    pub fn message(&self) -> String {
        let mut msg = format!(
            "Loaded {} rows into table '{}'. Null values standardized",
            self.rows, self.table
        );
        if !self.date_columns.is_empty() {
            msg.push_str(&format!(
                "; {} date column(s) written as YYYY-MM-DD: {}",
                self.date_columns.len(),
                self.date_columns.join(", ")
            ));
        }
        msg
    }
}

/// Final result of a load, delivered exactly once per load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadOutcome {
    Completed(LoadSummary),
    Cancelled,
    Failed { message: String },
}

impl LoadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Rows inserted; zero unless completed.
    pub fn row_count(&self) -> usize {
        match self {
            Self::Completed(summary) => summary.rows,
            _ => 0,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Completed(summary) => summary.message(),
            Self::Cancelled => "Load cancelled".to_string(),
            Self::Failed { message } => format!("Load failed: {message}"),
        }
    }
}

impl fmt::Display for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Observer interface for load progress and completion.
///
/// Callbacks run on the load worker's thread; implementors must not block for long.
pub trait LoadObserver: Send + Sync {
    fn on_progress(&self, _progress: &LoadProgress) {}

    /// Called exactly once per load, whatever the outcome.
    fn on_complete(&self, _outcome: &LoadOutcome) {}
}

/// Fans callbacks out to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn LoadObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn LoadObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl LoadObserver for CompositeObserver {
    fn on_progress(&self, progress: &LoadProgress) {
        for o in &self.observers {
            o.on_progress(progress);
        }
    }

    fn on_complete(&self, outcome: &LoadOutcome) {
        for o in &self.observers {
            o.on_complete(outcome);
        }
    }
}

/// Observer that does nothing.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl LoadObserver for NoopObserver {}

/// Prints progress and completion to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl LoadObserver for StdErrObserver {
    fn on_progress(&self, progress: &LoadProgress) {
        eprintln!(
            "[load][{:>3.0}%] {}: {}",
            progress.fraction * 100.0,
            progress.phase,
            progress.message
        );
    }

    fn on_complete(&self, outcome: &LoadOutcome) {
        eprintln!("[load][done] {outcome}");
    }
}

/// Appends progress and completion lines to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Writes are best-effort; failures to open or write the file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl LoadObserver for FileObserver {
    fn on_progress(&self, progress: &LoadProgress) {
        self.append_line(&format!(
            "{} progress phase={} fraction={:.2} message={}",
            unix_ts(),
            progress.phase,
            progress.fraction,
            progress.message
        ));
    }

    fn on_complete(&self, outcome: &LoadOutcome) {
        let status = match outcome {
            LoadOutcome::Completed(_) => "ok",
            LoadOutcome::Cancelled => "cancelled",
            LoadOutcome::Failed { .. } => "fail",
        };
        self.append_line(&format!(
            "{} {status} rows={} message={}",
            unix_ts(),
            outcome.row_count(),
            outcome.message()
        ));
    }
}

/// Event forwarded by [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoadEvent {
    Progress(LoadProgress),
    Complete(LoadOutcome),
}

/// Forwards every callback over an mpsc channel, so a UI thread can consume events at its own
/// pace. Sends to a dropped receiver are ignored.
#[derive(Debug)]
pub struct ChannelObserver {
    tx: Sender<LoadEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, Receiver<LoadEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl LoadObserver for ChannelObserver {
    fn on_progress(&self, progress: &LoadProgress) {
        let _ = self.tx.send(LoadEvent::Progress(progress.clone()));
    }

    fn on_complete(&self, outcome: &LoadOutcome) {
        let _ = self.tx.send(LoadEvent::Complete(outcome.clone()));
    }
}

/// Live counters for a load; readable from any thread while the load runs.
#[derive(Debug)]
pub struct LoadMetrics {
    started_at: Mutex<Option<Instant>>,
    elapsed_ns: AtomicU64,
    rows_read: AtomicU64,
    rows_inserted: AtomicU64,
    batches_committed: AtomicU64,
    fallback_batches: AtomicU64,
}

impl LoadMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Mutex::new(None),
            elapsed_ns: AtomicU64::new(0),
            rows_read: AtomicU64::new(0),
            rows_inserted: AtomicU64::new(0),
            batches_committed: AtomicU64::new(0),
            fallback_batches: AtomicU64::new(0),
        }
    }

    pub(crate) fn begin(&self) {
        if let Ok(mut started) = self.started_at.lock() {
            *started = Some(Instant::now());
        }
        self.elapsed_ns.store(0, Ordering::SeqCst);
        self.rows_read.store(0, Ordering::SeqCst);
        self.rows_inserted.store(0, Ordering::SeqCst);
        self.batches_committed.store(0, Ordering::SeqCst);
        self.fallback_batches.store(0, Ordering::SeqCst);
    }

    pub(crate) fn end(&self) {
        let started = self.started_at.lock().ok().and_then(|s| *s);
        if let Some(started) = started {
            let elapsed = started.elapsed().as_nanos().min(u64::MAX as u128) as u64;
            self.elapsed_ns.store(elapsed.max(1), Ordering::SeqCst);
        }
    }

    pub(crate) fn on_rows_read(&self, rows: usize) {
        self.rows_read.store(rows as u64, Ordering::SeqCst);
    }

    pub(crate) fn on_batch_committed(&self, rows: usize, fell_back: bool) {
        let _ = self.rows_inserted.fetch_add(rows as u64, Ordering::SeqCst);
        let _ = self.batches_committed.fetch_add(1, Ordering::SeqCst);
        if fell_back {
            let _ = self.fallback_batches.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn snapshot(&self) -> LoadMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        LoadMetricsSnapshot {
            elapsed: (elapsed_ns > 0).then(|| Duration::from_nanos(elapsed_ns)),
            rows_read: self.rows_read.load(Ordering::SeqCst),
            rows_inserted: self.rows_inserted.load(Ordering::SeqCst),
            batches_committed: self.batches_committed.load(Ordering::SeqCst),
            fallback_batches: self.fallback_batches.load(Ordering::SeqCst),
        }
    }
}

impl Default for LoadMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable snapshot of [`LoadMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadMetricsSnapshot {
    /// Set once the load has finished.
    pub elapsed: Option<Duration>,
    pub rows_read: u64,
    pub rows_inserted: u64,
    pub batches_committed: u64,
    pub fallback_batches: u64,
}

impl fmt::Display for LoadMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows_read={}, rows_inserted={}, batches={}, fallback_batches={}, elapsed={:?}",
            self.rows_read,
            self.rows_inserted,
            self.batches_committed,
            self.fallback_batches,
            self.elapsed
        )
    }
}

/// Sends progress to the observer with a non-decreasing fraction and delivers the single
/// completion callback. Consumed by [`Reporter::finish`].
pub(crate) struct Reporter {
    observer: Arc<dyn LoadObserver>,
    last: f64,
}

impl Reporter {
    pub(crate) fn new(observer: Arc<dyn LoadObserver>) -> Self {
        Self { observer, last: 0.0 }
    }

    pub(crate) fn progress(&mut self, phase: LoadPhase, fraction: f64, message: impl Into<String>) {
        let fraction = fraction.clamp(0.0, 1.0).max(self.last);
        self.last = fraction;
        self.observer.on_progress(&LoadProgress {
            phase,
            fraction,
            message: message.into(),
        });
    }

    pub(crate) fn finish(self, outcome: &LoadOutcome) {
        info!(rows = outcome.row_count(), "{}", outcome.message());
        self.observer.on_complete(outcome);
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
