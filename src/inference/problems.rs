//! Heuristic detection of likely misclassified columns.
//!
//! Reports are advisory: nothing here mutates a schema. Each column is judged on at most
//! [`PROBLEM_SAMPLE_SIZE`] non-null values so cost stays bounded on wide or tall tables.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::schema::{StorageType, TableSchema};
use crate::types::{DataSet, Value};

/// Non-null values inspected per column.
pub const PROBLEM_SAMPLE_SIZE: usize = 20;

/// Share of numeric-looking values above which a TEXT column is reported.
pub const NUMERIC_TEXT_RATIO: f64 = 0.7;

/// Distinct values considered for the boolean check.
pub const BOOLEAN_DISTINCT_CAP: usize = 10;

/// Name fragments that suggest a date for a TEXT column that was not detected as one.
pub const DATE_HINT_FRAGMENTS: &[&str] = &["fecha", "date", "time", "created", "updated"];

/// Lowercase tokens read as `true`.
pub const BOOLEAN_TRUE_TOKENS: &[&str] = &["1", "true", "yes", "t", "si", "sí"];

/// Lowercase tokens read as `false`.
pub const BOOLEAN_FALSE_TOKENS: &[&str] = &["0", "false", "no", "f"];

static NUMERIC_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+\.?\d*$").expect("static numeric pattern is valid"));

/// Kind of suspected misclassification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemCategory {
    /// TEXT column whose values are mostly plain numbers.
    NumbersAsText,
    /// TEXT column with a date-like name that was not detected as dates.
    UndetectedDate,
    /// REAL column whose values are all whole.
    RealShouldBeInteger,
    /// TEXT or INTEGER column holding only binary tokens.
    PossibleBoolean,
}

impl fmt::Display for ProblemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NumbersAsText => "numbers_as_text",
            Self::UndetectedDate => "undetected_date",
            Self::RealShouldBeInteger => "real_should_be_integer",
            Self::PossibleBoolean => "possible_boolean",
        })
    }
}

/// One advisory finding for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemReport {
    /// Source name of the flagged column.
    pub original_column_name: String,
    pub category: ProblemCategory,
    /// Human-readable explanation.
    pub message: String,
    /// Storage type the column probably should have.
    pub suggested_type: StorageType,
}

/// Map a binary token (any case, surrounding whitespace ignored) to a boolean.
pub fn parse_boolean_token(token: &str) -> Option<bool> {
    let lowered = token.trim().to_lowercase();
    if BOOLEAN_TRUE_TOKENS.contains(&lowered.as_str()) {
        Some(true)
    } else if BOOLEAN_FALSE_TOKENS.contains(&lowered.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Run every heuristic over every column of `schema` that exists in `dataset`.
///
/// A column may receive several reports.
pub fn detect_problems(dataset: &DataSet, schema: &TableSchema) -> Vec<ProblemReport> {
    let mut reports = Vec::new();
    for col in &schema.columns {
        let Some(idx) = dataset.schema.index_of(&col.original_name) else {
            continue;
        };
        let sample: Vec<&Value> = dataset.sample(idx, PROBLEM_SAMPLE_SIZE);
        let mut report = |category, message: String, suggested_type| {
            reports.push(ProblemReport {
                original_column_name: col.original_name.clone(),
                category,
                message,
                suggested_type,
            });
        };

        if col.storage_type == StorageType::Text && !sample.is_empty() {
            let numeric = sample
                .iter()
                .filter(|v| v.to_text().is_some_and(|s| NUMERIC_TEXT_RE.is_match(s.trim())))
                .count();
            let ratio = numeric as f64 / sample.len() as f64;
            if ratio >= NUMERIC_TEXT_RATIO {
                report(
                    ProblemCategory::NumbersAsText,
                    format!(
                        "{numeric} of {} sampled values are plain numbers stored as text",
                        sample.len()
                    ),
                    StorageType::Integer,
                );
            }
        }

        if col.storage_type == StorageType::Text
            && !col.is_date
            && DATE_HINT_FRAGMENTS
                .iter()
                .any(|frag| col.original_name.to_lowercase().contains(frag))
        {
            report(
                ProblemCategory::UndetectedDate,
                "name suggests a date but values were not detected as dates".to_string(),
                StorageType::Date,
            );
        }

        if col.storage_type == StorageType::Real
            && !sample.is_empty()
            && sample.iter().all(|v| is_whole(v))
        {
            report(
                ProblemCategory::RealShouldBeInteger,
                "every sampled value is a whole number".to_string(),
                StorageType::Integer,
            );
        }

        if matches!(col.storage_type, StorageType::Text | StorageType::Integer) && !sample.is_empty() {
            let mut distinct: BTreeSet<String> = BTreeSet::new();
            for text in sample.iter().filter_map(|v| v.to_text()) {
                if distinct.len() >= BOOLEAN_DISTINCT_CAP {
                    break;
                }
                distinct.insert(text.trim().to_lowercase());
            }
            if distinct.iter().all(|t| parse_boolean_token(t).is_some()) {
                report(
                    ProblemCategory::PossibleBoolean,
                    format!("only binary values observed: {distinct:?}"),
                    StorageType::Boolean,
                );
            }
        }
    }
    reports
}

fn is_whole(value: &Value) -> bool {
    match value {
        Value::Int64(_) => true,
        Value::Float64(f) => f.is_finite() && f.fract() == 0.0,
        Value::Utf8(s) => super::decimal::parse_decimal(s)
            .ok()
            .flatten()
            .is_some_and(|f| f.fract() == 0.0),
        Value::Null => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_tokens() {
        assert_eq!(parse_boolean_token(" Yes "), Some(true));
        assert_eq!(parse_boolean_token("SÍ"), Some(true));
        assert_eq!(parse_boolean_token("no"), Some(false));
        assert_eq!(parse_boolean_token("maybe"), None);
    }

    #[test]
    fn numeric_text_pattern() {
        assert!(NUMERIC_TEXT_RE.is_match("-12.5"));
        assert!(NUMERIC_TEXT_RE.is_match("007"));
        assert!(!NUMERIC_TEXT_RE.is_match("1.2.3"));
        assert!(!NUMERIC_TEXT_RE.is_match("1,5"));
    }
}
