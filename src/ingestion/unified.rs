//! Unified reading entrypoint.
//!
//! Most callers should use [`read_from_path`], which reads a file into an in-memory
//! [`crate::types::DataSet`].
//!
//! - If [`ReadOptions::format`] is `None`, the format is inferred from the file extension.
//! - [`ReadOptions::max_rows`] bounds the rows read, for previews.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ReadError, ReadResult};
use crate::types::DataSet;

use super::csv;

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Comma-separated values.
    Csv,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Excel,
}

impl SourceFormat {
    /// Parse a source format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }

    /// Infer the format of `path` from its extension.
    pub fn from_path(path: &Path) -> ReadResult<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ReadError::UnsupportedFormat {
                message: format!("cannot infer format: path has no extension ({})", path.display()),
            })?;

        Self::from_extension(ext).ok_or_else(|| ReadError::UnsupportedFormat {
            message: format!(
                "cannot infer format from extension '{ext}' for path ({})",
                path.display()
            ),
        })
    }
}

/// Which sheet to read from a workbook.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetSelection {
    /// The first sheet (default).
    #[default]
    First,
    /// A single named sheet.
    Named(String),
}

/// Options controlling how a source file is read.
///
/// Use [`Default`] for common cases.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// If `None`, auto-detect format from file extension.
    pub format: Option<SourceFormat>,
    /// Spreadsheet sheet selection; ignored for CSV.
    pub sheet: SheetSelection,
    /// Read at most this many data rows.
    pub max_rows: Option<usize>,
}

/// Read a source file with column order preserved.
///
/// # Examples
///
/// ```no_run
/// use tabload::ingestion::{read_from_path, ReadOptions};
///
/// # fn main() -> Result<(), tabload::error::ReadError> {
/// let ds = read_from_path("contracts.csv", &ReadOptions::default())?;
/// println!("rows={} columns={}", ds.row_count(), ds.column_count());
/// # Ok(())
/// # }
/// ```
pub fn read_from_path(path: impl AsRef<Path>, options: &ReadOptions) -> ReadResult<DataSet> {
    let path = path.as_ref();
    let fmt = match options.format {
        Some(f) => f,
        None => SourceFormat::from_path(path)?,
    };

    let ds = match fmt {
        SourceFormat::Csv => csv::read_csv_from_path(path, options.max_rows)?,
        SourceFormat::Excel => read_excel_dispatch(path, options)?,
    };
    debug!(
        path = %path.display(),
        format = ?fmt,
        rows = ds.row_count(),
        columns = ds.column_count(),
        "source read"
    );
    Ok(ds)
}

fn read_excel_dispatch(path: &Path, options: &ReadOptions) -> ReadResult<DataSet> {
    // Avoid unused warnings when the feature is off.
    let _ = (path, options);

    #[cfg(feature = "excel")]
    {
        use super::excel;

        let sheet = match &options.sheet {
            SheetSelection::First => None,
            SheetSelection::Named(name) => Some(name.as_str()),
        };
        excel::read_excel_from_path(path, sheet, options.max_rows)
    }

    #[cfg(not(feature = "excel"))]
    {
        Err(ReadError::UnsupportedFormat {
            message: "excel reading not enabled (enable cargo feature 'excel')".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension_is_case_insensitive() {
        assert_eq!(SourceFormat::from_extension("CSV"), Some(SourceFormat::Csv));
        assert_eq!(SourceFormat::from_extension("Xlsx"), Some(SourceFormat::Excel));
        assert_eq!(SourceFormat::from_extension("json"), None);
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = read_from_path("data.parquet", &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, ReadError::UnsupportedFormat { .. }));
    }
}
