//! Locale-ambiguous decimal parsing.
//!
//! Spreadsheet exports mix US (`1,234.56`) and EU (`1.234,56`) number formats. Instead of a
//! locale flag, the position of the separators decides:
//!
//! - no separator: parse as-is (`"42"` -> `42.0`)
//! - one kind, once: it is the decimal point (`"-42,37"` -> `-42.37`, `"1,234"` -> `1.234`)
//! - one kind, repeated: all are thousands groupers (`"1.234.567"` -> `1234567.0`)
//! - both kinds: the rightmost separator is the decimal point, every earlier one is grouping
//!
//! Empty input and `nan`/`null`/`none` (any case) parse to `None`.

use crate::error::CellParseError;
use crate::types::Value;

/// Lowercase tokens the decimal parser reads as null (blank input is null as well).
pub const DECIMAL_NULL_TOKENS: &[&str] = &["nan", "null", "none"];

/// Parse one numeric token written in US or EU convention.
///
/// Returns `Ok(None)` for null-like input and an error for malformed tokens; callers recover
/// errors as nulls.
///
/// ```
/// use tabload::inference::parse_decimal;
///
/// assert_eq!(parse_decimal("1,234.56"), Ok(Some(1234.56)));
/// assert_eq!(parse_decimal("1.234,56"), Ok(Some(1234.56)));
/// assert_eq!(parse_decimal("nan"), Ok(None));
/// assert!(parse_decimal("12a").is_err());
/// ```
pub fn parse_decimal(token: &str) -> Result<Option<f64>, CellParseError> {
    let trimmed = token.trim();
    if trimmed.is_empty()
        || DECIMAL_NULL_TOKENS
            .iter()
            .any(|t| trimmed.eq_ignore_ascii_case(t))
    {
        return Ok(None);
    }

    let (negative, body) = match trimmed.as_bytes()[0] {
        b'-' => (true, &trimmed[1..]),
        b'+' => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let dots = body.matches('.').count();
    let commas = body.matches(',').count();
    let canonical = match (dots, commas) {
        (0, 0) => body.to_owned(),
        (1, 0) => body.to_owned(),
        (0, 1) => body.replace(',', "."),
        (_, 0) => body.replace('.', ""),
        (0, _) => body.replace(',', ""),
        _ => {
            // Both present: the rightmost separator is the decimal point.
            let decimal_at = body.rfind(['.', ',']).unwrap_or(0);
            body.char_indices()
                .filter_map(|(i, c)| match c {
                    '.' | ',' if i == decimal_at => Some('.'),
                    '.' | ',' => None,
                    other => Some(other),
                })
                .collect()
        }
    };

    if !is_plain_number(&canonical) {
        return Err(CellParseError::new(token, "decimal", "not a number after separator rewrite"));
    }
    let value: f64 = canonical
        .parse()
        .map_err(|e: std::num::ParseFloatError| CellParseError::new(token, "decimal", e.to_string()))?;
    if !value.is_finite() {
        return Err(CellParseError::new(token, "decimal", "value out of range"));
    }
    Ok(Some(if negative { -value } else { value }))
}

/// Parse a cell of a REAL/NUMERIC column: numbers pass through as floats, text goes through
/// [`parse_decimal`]. Malformed text is returned as an error for the caller to null out.
pub fn parse_decimal_value(value: &Value) -> Result<Option<f64>, CellParseError> {
    match value {
        Value::Null => Ok(None),
        Value::Int64(i) => Ok(Some(*i as f64)),
        Value::Float64(f) if f.is_nan() => Ok(None),
        Value::Float64(f) => Ok(Some(*f)),
        Value::Utf8(s) => parse_decimal(s),
    }
}

// Digits with at most one '.', optionally followed by an exponent; no sign (already stripped).
fn is_plain_number(s: &str) -> bool {
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(at) => (&s[..at], Some(&s[at + 1..])),
        None => (s, None),
    };
    let mantissa_ok = mantissa.bytes().any(|b| b.is_ascii_digit())
        && mantissa.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        && mantissa.matches('.').count() <= 1;
    let exponent_ok = exponent.is_none_or(|e| {
        let digits = e.strip_prefix(['-', '+']).unwrap_or(e);
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
    });
    mantissa_ok && exponent_ok
}
