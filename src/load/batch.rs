//! Adaptive batch sizing and the parameter-limit fallback.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{LoadError, LoadResult, StoreError};
use crate::types::Value;

use super::store::{InsertStatement, Store};

/// How many rows go into one insert statement.
///
/// Wider tables bind more parameters per row, so they get smaller batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchPolicy {
    /// Tables with more columns than this use `wide_batch`.
    pub wide_columns: usize,
    pub wide_batch: usize,
    /// Tables with more columns than this (and at most `wide_columns`) use `medium_batch`.
    pub medium_columns: usize,
    pub medium_batch: usize,
    pub default_batch: usize,
    /// Sub-batch size used after a batch hits the store's parameter limit.
    pub fallback_batch: usize,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            wide_columns: 50,
            wide_batch: 100,
            medium_columns: 20,
            medium_batch: 250,
            default_batch: 500,
            fallback_batch: 50,
        }
    }
}

impl BatchPolicy {
    /// Batch size for a table with `columns` columns; never zero.
    pub fn batch_size(&self, columns: usize) -> usize {
        let size = if columns > self.wide_columns {
            self.wide_batch
        } else if columns > self.medium_columns {
            self.medium_batch
        } else {
            self.default_batch
        };
        size.max(1)
    }
}

/// Contiguous row ranges of at most `chunk_size` rows covering `0..row_count`.
pub(crate) fn chunk_ranges(row_count: usize, chunk_size: usize) -> Vec<Range<usize>> {
    let chunk_size = chunk_size.max(1);
    let mut out = Vec::with_capacity(row_count.div_ceil(chunk_size));
    let mut start = 0usize;
    while start < row_count {
        let end = (start + chunk_size).min(row_count);
        out.push(start..end);
        start = end;
    }
    out
}

/// Insert one batch; on a parameter-limit error re-send it as `fallback`-row sub-batches.
///
/// Returns whether the fallback was used. A sub-batch that still exceeds the limit fails the
/// load with [`LoadError::StoreCapacity`]; there is no further splitting.
pub(crate) fn insert_with_fallback(
    store: &mut dyn Store,
    insert: &InsertStatement,
    rows: &[Vec<Value>],
    fallback: usize,
) -> LoadResult<bool> {
    match store.execute_many(insert, rows) {
        Ok(()) => Ok(false),
        Err(err) if err.is_capacity() => {
            warn!(rows = rows.len(), fallback, %err, "batch exceeds parameter limit, retrying in sub-batches");
            for sub in rows.chunks(fallback.max(1)) {
                store.execute_many(insert, sub).map_err(|e| match e {
                    StoreError::TooManyParameters { message } => LoadError::StoreCapacity {
                        rows: sub.len(),
                        message,
                    },
                    other => LoadError::Store(other),
                })?;
            }
            Ok(true)
        }
        Err(err) => Err(err.into()),
    }
}
