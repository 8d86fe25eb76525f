use thiserror::Error;

/// Convenience result type for reading source files.
pub type ReadResult<T> = Result<T, ReadError>;

/// Convenience result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Convenience result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Error returned when a source file cannot be read.
///
/// Always fatal for the load attempt; never retried.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "excel")]
    /// Spreadsheet decoding error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// The file format is unknown or not compiled in.
    #[error("unsupported format: {message}")]
    UnsupportedFormat { message: String },

    /// The file decoded but has no usable tabular layout (no header row, no sheets).
    #[error("invalid layout: {message}")]
    Layout { message: String },
}

/// A single cell failed to coerce to the requested type.
///
/// Recovered locally as a null by every caller; it never aborts a load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse '{raw}' as {expected}: {message}")]
pub struct CellParseError {
    /// The offending token.
    pub raw: String,
    /// Name of the type that was requested.
    pub expected: &'static str,
    /// Detail from the parser.
    pub message: String,
}

impl CellParseError {
    pub(crate) fn new(raw: impl Into<String>, expected: &'static str, message: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            expected,
            message: message.into(),
        }
    }
}

/// Error reported by a destination store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The statement binds more parameters than the engine allows.
    #[error("too many bound parameters: {message}")]
    TooManyParameters { message: String },

    /// Any other storage failure, carrying the engine's raw message.
    #[error("{message}")]
    Backend { message: String },
}

impl StoreError {
    /// Create a backend error from any displayable error.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend {
            message: err.to_string(),
        }
    }

    /// Whether this is the recoverable parameter-limit signal.
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::TooManyParameters { .. })
    }
}

/// Fatal error of a load attempt.
///
/// The loader never lets one of these escape its worker; it is reported through the
/// completion callback as a failed outcome.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Source file could not be read.
    #[error(transparent)]
    Read(#[from] ReadError),

    /// A supplied table schema is unusable (unknown source column, duplicate names).
    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },

    /// Even the smallest sub-batch exceeds the store's bound-parameter limit.
    #[error("batch of {rows} row(s) still exceeds the store parameter limit: {message}")]
    StoreCapacity { rows: usize, message: String },

    /// Any other storage failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
