//! Destination table schema.
//!
//! A [`TableSchema`] is an ordered list of [`ColumnSchema`]s, one per source column, in source
//! column order. It is produced by [`crate::inference::infer_schema`] or supplied wholesale by a
//! reviewer, and is serializable to JSON so a reviewer can edit it out of process.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LoadError, LoadResult};
use crate::inference::ProblemReport;
use crate::types::{DataSet, Value};

/// Storage types a destination column can take. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StorageType {
    Integer,
    Real,
    Text,
    Blob,
    Numeric,
    Boolean,
    Date,
    Datetime,
}

impl StorageType {
    /// SQL type keyword used in `CREATE TABLE`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
            Self::Numeric => "NUMERIC",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Datetime => "DATETIME",
        }
    }

    /// All storage types, in the order a reviewer would list them.
    pub fn variants() -> &'static [StorageType] {
        &[
            Self::Integer,
            Self::Real,
            Self::Text,
            Self::Blob,
            Self::Numeric,
            Self::Boolean,
            Self::Date,
            Self::Datetime,
        ]
    }

    /// DATE and DATETIME columns are rewritten through the date path.
    pub fn is_temporal(self) -> bool {
        matches!(self, Self::Date | Self::Datetime)
    }

    /// REAL and NUMERIC columns are rewritten through the decimal parser.
    pub fn is_decimal(self) -> bool {
        matches!(self, Self::Real | Self::Numeric)
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let upper = value.trim().to_ascii_uppercase();
        Self::variants()
            .iter()
            .copied()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| {
                format!(
                    "unknown storage type '{value}'; expected one of {}",
                    Self::variants().iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
                )
            })
    }
}

/// One destination column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Storage-safe column name used in the destination table.
    pub canonical_name: String,
    /// Column name as it appears in the source.
    pub original_name: String,
    /// Destination storage type.
    pub storage_type: StorageType,
    /// Whether values are rewritten as `YYYY-MM-DD` dates.
    #[serde(default)]
    pub is_date: bool,
    /// First non-null value of the column, for display.
    #[serde(default)]
    pub sample_value: Option<Value>,
}

impl ColumnSchema {
    /// Create a column whose canonical name is derived from `original_name`.
    pub fn new(original_name: impl Into<String>, storage_type: StorageType) -> Self {
        let original_name = original_name.into();
        Self {
            canonical_name: canonical_name(&original_name),
            original_name,
            storage_type,
            is_date: storage_type.is_temporal(),
            sample_value: None,
        }
    }

    /// Whether the column takes the date normalization path.
    pub fn takes_date_path(&self) -> bool {
        self.is_date || self.storage_type.is_temporal()
    }
}

/// Non-fatal findings recorded while building a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaWarning {
    /// Two source names sanitize to the same canonical name; the later one was suffixed.
    NameCollision {
        original: String,
        canonical: String,
        resolved: String,
    },
}

impl fmt::Display for SchemaWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameCollision {
                original,
                canonical,
                resolved,
            } => write!(
                f,
                "column '{original}' sanitizes to '{canonical}', which is already taken; stored as '{resolved}'"
            ),
        }
    }
}

/// Ordered mapping canonical name -> [`ColumnSchema`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableSchema {
    /// Columns in source order.
    pub columns: Vec<ColumnSchema>,
    /// Warnings raised while the schema was built.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<SchemaWarning>,
}

impl TableSchema {
    /// Build a schema, resolving canonical-name collisions by suffixing (`_2`, `_3`, ...).
    ///
    /// Names are compared case-insensitively, as SQL identifiers are.
    pub fn from_columns(columns: Vec<ColumnSchema>) -> Self {
        let mut warnings = Vec::new();
        let mut taken: Vec<String> = Vec::with_capacity(columns.len());
        let mut out = Vec::with_capacity(columns.len());
        for mut col in columns {
            let base = col.canonical_name.clone();
            let mut candidate = base.clone();
            let mut n = 2;
            while taken.contains(&candidate.to_lowercase()) {
                candidate = format!("{base}_{n}");
                n += 1;
            }
            if candidate != base {
                let warning = SchemaWarning::NameCollision {
                    original: col.original_name.clone(),
                    canonical: base,
                    resolved: candidate.clone(),
                };
                tracing::warn!(%warning, "canonical name collision");
                warnings.push(warning);
                col.canonical_name = candidate.clone();
            }
            taken.push(candidate.to_lowercase());
            out.push(col);
        }
        Self {
            columns: out,
            warnings,
        }
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Look up a column by canonical name.
    pub fn get(&self, canonical_name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.canonical_name == canonical_name)
    }

    /// Look up a column by source name.
    pub fn by_original(&self, original_name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.original_name == original_name)
    }

    /// Iterate canonical names in order.
    pub fn canonical_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.canonical_name.as_str())
    }

    /// A copy of this schema with every problem's suggested type applied.
    ///
    /// Columns flagged more than once take the last suggestion; `is_date` follows the new type.
    pub fn with_suggestions(&self, problems: &[ProblemReport]) -> Self {
        let mut out = self.clone();
        for problem in problems {
            if let Some(col) = out
                .columns
                .iter_mut()
                .find(|c| c.original_name == problem.original_column_name)
            {
                col.storage_type = problem.suggested_type;
                col.is_date = problem.suggested_type.is_temporal();
            }
        }
        out
    }

    /// Check a supplied schema against the dataset it will load.
    ///
    /// Every column must name an existing source column and canonical names must be non-empty
    /// and unique (case-insensitively). `is_date` is reset so that only DATE/DATETIME columns,
    /// or TEXT columns already flagged as dates, take the date path.
    pub fn validated_for(mut self, dataset: &DataSet) -> LoadResult<Self> {
        if self.columns.is_empty() {
            return Err(LoadError::InvalidSchema {
                message: "schema has no columns".to_string(),
            });
        }
        let mut seen: Vec<String> = Vec::with_capacity(self.columns.len());
        for col in &mut self.columns {
            if dataset.schema.index_of(&col.original_name).is_none() {
                return Err(LoadError::InvalidSchema {
                    message: format!(
                        "column '{}' does not exist in the source. columns={:?}",
                        col.original_name,
                        dataset.schema.field_names().collect::<Vec<_>>()
                    ),
                });
            }
            if col.canonical_name.trim().is_empty() {
                return Err(LoadError::InvalidSchema {
                    message: format!("column '{}' has an empty canonical name", col.original_name),
                });
            }
            let key = col.canonical_name.to_lowercase();
            if seen.contains(&key) {
                return Err(LoadError::InvalidSchema {
                    message: format!("duplicate canonical name '{}'", col.canonical_name),
                });
            }
            seen.push(key);
            col.is_date = col.storage_type.is_temporal()
                || (col.is_date && col.storage_type == StorageType::Text);
        }
        Ok(self)
    }
}

/// Derive a storage-safe column name: whitespace and hyphens become underscores and any other
/// non-word character is dropped. Unicode letters and digits are kept.
///
/// Returns an empty string when nothing survives; [`crate::inference::infer_schema`] replaces
/// that with a positional name.
pub fn canonical_name(original: &str) -> String {
    original
        .trim()
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() || c == '-' {
                Some('_')
            } else if c.is_alphanumeric() || c == '_' {
                Some(c)
            } else {
                None
            }
        })
        .collect()
}

/// Quote an identifier for SQL (`"name"`, embedded quotes doubled).
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
