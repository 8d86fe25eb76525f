//! Date column detection and normalization.
//!
//! A column is a date *candidate* when its name matches one of [`DATE_NAME_PATTERNS`] or its
//! declared source type is free-form text/datetime. A candidate is confirmed only when every
//! value of a small sample parses as a date. Only text cells with explicit separators ever parse:
//! numbers and digit-only strings are never dates, so a `0` can't turn into `1970-01-01`.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::types::{DataType, Value};

/// Name fragments (Spanish and English) that mark a column as a likely date.
pub const DATE_NAME_PATTERNS: &[&str] = &[
    "fecha",
    "date",
    "datetime",
    "timestamp",
    "creado",
    "actualizado",
    "modificado",
    "registro",
    "ingreso",
    "alta",
    "baja",
];

/// How many non-null values are checked before a column is confirmed as dates.
pub const DATE_SAMPLE_SIZE: usize = 10;

/// ISO output format for normalized dates.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

static DATE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = DATE_NAME_PATTERNS.join("|");
    Regex::new(&format!("(?i){alternation}")).expect("static date-name pattern is valid")
});

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M",
];

// Slash forms try month-first, then day-first (so 25/12/2023 still parses). A column settles
// on one layout through `ColumnDates`.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
];

/// Whether the column name contains a date-ish fragment (case-insensitive).
pub fn name_suggests_date(name: &str) -> bool {
    DATE_NAME_RE.is_match(name)
}

/// Decide whether a column holds dates.
///
/// `sample` should be the first non-null values of the column (at most
/// [`DATE_SAMPLE_SIZE`] are inspected). An empty sample is never a date column.
pub fn is_date_column(name: &str, declared: DataType, sample: &[&Value]) -> bool {
    let candidate = name_suggests_date(name) || declared.is_textual();
    if !candidate || sample.is_empty() {
        return false;
    }
    sample
        .iter()
        .take(DATE_SAMPLE_SIZE)
        .all(|v| parse_date_value(v).is_some())
}

/// Parse a cell as a date/time. Only text cells parse.
pub fn parse_date_value(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Utf8(s) => parse_date_str(s),
        _ => None,
    }
}

/// Parse a date or date-time string in the first accepted layout that fits it.
pub fn parse_date_str(raw: &str) -> Option<NaiveDateTime> {
    let s = date_text(raw)?;
    DateLayout::all().find_map(|layout| layout.parse(s))
}

/// Rewrite one cell of a date column: parseable values become `YYYY-MM-DD` text, everything
/// else (including numbers) becomes null. Never fails.
///
/// The layout is chosen for this value alone; use [`ColumnDates`] to rewrite a whole column.
pub fn normalize_date_value(value: &Value) -> Value {
    ColumnDates::default().normalize(value)
}

/// One accepted date or date-time layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLayout {
    Rfc3339,
    DateTime(&'static str),
    Date(&'static str),
}

impl DateLayout {
    /// Every layout, in the order they are tried.
    pub fn all() -> impl Iterator<Item = DateLayout> {
        std::iter::once(Self::Rfc3339)
            .chain(DATETIME_FORMATS.iter().map(|&f| Self::DateTime(f)))
            .chain(DATE_FORMATS.iter().map(|&f| Self::Date(f)))
    }

    /// Parse an already trimmed string.
    pub fn parse(self, s: &str) -> Option<NaiveDateTime> {
        match self {
            Self::Rfc3339 => DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local()),
            Self::DateTime(fmt) => NaiveDateTime::parse_from_str(s, fmt).ok(),
            Self::Date(fmt) => NaiveDate::parse_from_str(s, fmt)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
        }
    }

    fn format(self) -> &'static str {
        match self {
            Self::Rfc3339 => "",
            Self::DateTime(fmt) | Self::Date(fmt) => fmt,
        }
    }

    fn is_month_first(self) -> bool {
        let fmt = self.format();
        fmt.starts_with("%m/") || fmt.starts_with("%m-")
    }

    fn is_day_first(self) -> bool {
        let fmt = self.format();
        fmt.starts_with("%d/") || fmt.starts_with("%d-")
    }
}

/// Date reading settled once for a whole column.
///
/// When a single [`DateLayout`] parses every text value of the column, every value is read
/// with it, so `05/03/2023` next to `15/01/2023` is 5 March. Columns mixing layouts fall
/// back to per-value parsing, preferring day-first slash forms when some value can only be
/// day-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnDates {
    layout: Option<DateLayout>,
    day_first: bool,
}

impl ColumnDates {
    /// Settle the layout from the column's values; non-text cells are ignored.
    pub fn settle<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let texts: Vec<&str> = values
            .into_iter()
            .filter_map(Value::as_str)
            .filter_map(date_text)
            .collect();
        if texts.is_empty() {
            return Self::default();
        }
        if let Some(layout) =
            DateLayout::all().find(|layout| texts.iter().all(|t| layout.parse(t).is_some()))
        {
            return Self {
                layout: Some(layout),
                day_first: false,
            };
        }
        let day_first = texts.iter().any(|t| {
            DateLayout::all()
                .filter(|l| l.is_month_first())
                .all(|l| l.parse(t).is_none())
                && DateLayout::all()
                    .filter(|l| l.is_day_first())
                    .any(|l| l.parse(t).is_some())
        });
        Self {
            layout: None,
            day_first,
        }
    }

    /// The layout shared by every value, if there is one.
    pub fn layout(&self) -> Option<DateLayout> {
        self.layout
    }

    /// Parse one cell of the column. Only text cells parse.
    pub fn parse(&self, value: &Value) -> Option<NaiveDateTime> {
        let s = value.as_str().and_then(date_text)?;
        if let Some(dt) = self.layout.and_then(|layout| layout.parse(s)) {
            return Some(dt);
        }
        if self.day_first {
            if let Some(dt) = DateLayout::all()
                .filter(|l| !l.is_month_first())
                .find_map(|l| l.parse(s))
            {
                return Some(dt);
            }
        }
        DateLayout::all().find_map(|layout| layout.parse(s))
    }

    /// `YYYY-MM-DD` text for parseable cells, null for everything else.
    pub fn normalize(&self, value: &Value) -> Value {
        match self.parse(value) {
            Some(dt) => Value::Utf8(dt.format(ISO_DATE_FORMAT).to_string()),
            None => Value::Null,
        }
    }
}

// Trimmed text that may hold a date; digit-only tokens are numbers, not dates.
fn date_text(raw: &str) -> Option<&str> {
    let s = raw.trim();
    if s.is_empty() || s.bytes().all(|b| b.is_ascii_digit()) {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(values: &[&str]) -> Vec<Value> {
        values.iter().map(|s| Value::text(*s)).collect()
    }

    #[test]
    fn names_match_case_insensitively() {
        assert!(name_suggests_date("Fecha_Inicio_Cuota"));
        assert!(name_suggests_date("UpdateDATE"));
        assert!(name_suggests_date("FechaAlta"));
        assert!(!name_suggests_date("Contrato"));
    }

    #[test]
    fn confirms_only_when_every_sampled_value_parses() {
        let good = text(&["2023-01-15", "2023-02-20", "15/03/2023"]);
        let refs: Vec<&Value> = good.iter().collect();
        assert!(is_date_column("Desde", DataType::Utf8, &refs));

        let mixed = text(&["2023-01-15", "pending"]);
        let refs: Vec<&Value> = mixed.iter().collect();
        assert!(!is_date_column("fecha", DataType::Utf8, &refs));
    }

    #[test]
    fn empty_sample_is_not_a_date_column() {
        assert!(!is_date_column("fecha", DataType::Utf8, &[]));
    }

    #[test]
    fn numbers_are_never_dates() {
        let zeros = [Value::Int64(0), Value::Int64(1_592_237)];
        let refs: Vec<&Value> = zeros.iter().collect();
        assert!(!is_date_column("fecha_alta", DataType::Int64, &refs));

        let digits = text(&["0", "20230115"]);
        let refs: Vec<&Value> = digits.iter().collect();
        assert!(!is_date_column("registro", DataType::Utf8, &refs));
    }

    #[test]
    fn non_candidates_are_skipped_even_if_parseable() {
        let v = [Value::text("2023-01-15")];
        let refs: Vec<&Value> = v.iter().collect();
        assert!(!is_date_column("amount", DataType::Int64, &refs));
    }

    #[test]
    fn normalization_discards_time_and_nulls_failures() {
        assert_eq!(
            normalize_date_value(&Value::text("2023-04-10 13:45:00")),
            Value::text("2023-04-10")
        );
        assert_eq!(
            normalize_date_value(&Value::text("2023-04-10T13:45:00Z")),
            Value::text("2023-04-10")
        );
        assert_eq!(normalize_date_value(&Value::text("12/25/2023")), Value::text("2023-12-25"));
        assert_eq!(normalize_date_value(&Value::text("not a date")), Value::Null);
        assert_eq!(normalize_date_value(&Value::Int64(0)), Value::Null);
    }

    #[test]
    fn column_settles_on_one_layout() {
        let values = text(&["15/01/2023", "05/03/2023", "28/04/2023"]);
        let dates = ColumnDates::settle(&values);
        assert_eq!(dates.layout(), Some(DateLayout::Date("%d/%m/%Y")));

        let out: Vec<Value> = values.iter().map(|v| dates.normalize(v)).collect();
        assert_eq!(out, text(&["2023-01-15", "2023-03-05", "2023-04-28"]));
    }

    #[test]
    fn ambiguous_column_reads_month_first() {
        let values = text(&["05/03/2023", "12/25/2023"]);
        let dates = ColumnDates::settle(&values);
        assert_eq!(dates.normalize(&values[0]), Value::text("2023-05-03"));
    }

    #[test]
    fn mixed_layouts_prefer_day_first_when_evident() {
        let values = text(&["2023-01-15 08:30:00", "05/03/2023", "25/03/2023"]);
        let dates = ColumnDates::settle(&values);
        assert_eq!(dates.layout(), None);
        assert_eq!(dates.normalize(&values[0]), Value::text("2023-01-15"));
        assert_eq!(dates.normalize(&values[1]), Value::text("2023-03-05"));
        assert_eq!(dates.normalize(&Value::Int64(0)), Value::Null);
    }
}
