//! Source readers.
//!
//! Most callers should use [`read_from_path`] (from [`unified`]) which auto-detects the format
//! by file extension (or you can force it via [`ReadOptions`]) and reads the whole file into an
//! in-memory [`crate::types::DataSet`] with column order preserved.
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - [`excel`] (feature `excel`)

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod unified;

pub use unified::{read_from_path, ReadOptions, SheetSelection, SourceFormat};

use crate::types::Value;

/// Turn raw header cells into unique column names.
///
/// Blank headers become `Unnamed: {index}`; repeated names get `.1`, `.2`, ... suffixes.
pub(crate) fn unique_headers<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for (idx, h) in raw.into_iter().enumerate() {
        let h = h.as_ref().trim();
        let base = if h.is_empty() {
            format!("Unnamed: {idx}")
        } else {
            h.to_owned()
        };
        let mut name = base.clone();
        let mut n = 1;
        while out.contains(&name) {
            name = format!("{base}.{n}");
            n += 1;
        }
        out.push(name);
    }
    out
}

/// Type a raw text cell: blank -> null, integer -> `Int64`, finite float -> `Float64`,
/// anything else stays text (including locale-formatted numbers like `1.234,56`).
pub(crate) fn typed_text_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Int64(i);
    }
    if looks_like_plain_float(trimmed) {
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return Value::Float64(f);
            }
        }
    }
    Value::Utf8(raw.to_owned())
}

// `str::parse::<f64>` also accepts "inf"/"nan"/"infinity"; only digits, sign, '.', and an
// exponent are numeric here.
fn looks_like_plain_float(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_digit())
        && s
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_are_deduplicated_and_filled() {
        let names = unique_headers(["id", "", "id", "id"]);
        assert_eq!(names, vec!["id", "Unnamed: 1", "id.1", "id.2"]);
    }

    #[test]
    fn text_cells_are_typed() {
        assert_eq!(typed_text_cell(" 42 "), Value::Int64(42));
        assert_eq!(typed_text_cell("0.5"), Value::Float64(0.5));
        assert_eq!(typed_text_cell(""), Value::Null);
        assert_eq!(typed_text_cell("inf"), Value::text("inf"));
        assert_eq!(typed_text_cell("1.234,56"), Value::text("1.234,56"));
        assert_eq!(typed_text_cell("2023-01-15"), Value::text("2023-01-15"));
    }
}
