//! Conversions from the human-readable strings shown on analytics pages
//! ("2.5M", "36.03%", "00:04:08") into exact numeric values.

use chrono::{NaiveTime, Timelike};
use regex::Regex;
use std::sync::LazyLock;

use crate::error::FormatError;

static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)$").expect("valid decimal regex"));

const DURATION_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"];

fn parse_decimal(text: &str, original: &str) -> Result<f64, FormatError> {
    if !DECIMAL.is_match(text) {
        return Err(FormatError::NotANumber(original.to_string()));
    }
    text.parse::<f64>()
        .map_err(|_| FormatError::NotANumber(original.to_string()))
}

/// Parses a plain number that may carry thousands separators, e.g. an axis
/// tick label such as `"10,000"`.
pub fn parse_number(text: &str) -> Result<f64, FormatError> {
    let cleaned = text.trim().replace(',', "");
    if cleaned.is_empty() {
        return Err(FormatError::Empty);
    }
    parse_decimal(&cleaned, text)
}

/// Normalizes a magnitude or percentage string.
///
/// `K`, `M` and `B` suffixes scale by a thousand, a million and a billion.
/// A `%` suffix yields a fraction rounded to 4 decimal places. Values such as
/// `"< 5K"` are under the reporting threshold and are rejected rather than
/// read as zero.
pub fn as_float(number_repr: &str) -> Result<f64, FormatError> {
    let cleaned = number_repr.trim().replace(',', "");
    if cleaned.is_empty() {
        return Err(FormatError::Empty);
    }
    if cleaned.starts_with('<') {
        return Err(FormatError::UnderThreshold(number_repr.to_string()));
    }

    if let Some(prefix) = cleaned.strip_suffix('K') {
        return Ok(parse_decimal(prefix, number_repr)? * 1_000.0);
    }
    if let Some(prefix) = cleaned.strip_suffix('M') {
        return Ok(parse_decimal(prefix, number_repr)? * 1_000_000.0);
    }
    if let Some(prefix) = cleaned.strip_suffix('B') {
        return Ok(parse_decimal(prefix, number_repr)? * 1_000_000_000.0);
    }
    if let Some(prefix) = cleaned.strip_suffix('%') {
        let fraction = parse_decimal(prefix, number_repr)? / 100.0;
        return Ok(round_to(fraction, 4));
    }
    parse_decimal(&cleaned, number_repr)
}

/// Same as [`as_float`], truncated toward zero.
pub fn as_int(number_repr: &str) -> Result<i64, FormatError> {
    as_float(number_repr).map(|value| value.trunc() as i64)
}

/// Converts a time-of-day string (`HH:MM:SS`, `HH:MM`) into whole seconds
/// since midnight.
pub fn as_seconds(time_repr: &str) -> Result<i64, FormatError> {
    let trimmed = time_repr.trim();
    if trimmed.is_empty() {
        return Err(FormatError::Empty);
    }
    let time = DURATION_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| FormatError::NotADuration(time_repr.to_string()))?;
    Ok(3600 * i64::from(time.hour()) + 60 * i64::from(time.minute()) + i64::from(time.second()))
}

/// Applies `parse` unless the raw value is blank, in which case the field is
/// absent.
pub fn optional<T>(
    raw: &str,
    parse: impl FnOnce(&str) -> Result<T, FormatError>,
) -> Result<Option<T>, FormatError> {
    if raw.trim().is_empty() {
        Ok(None)
    } else {
        parse(raw).map(Some)
    }
}

/// Rounds to `digits` decimals from the exact stored value, so `0.00125`
/// (held just above the tie) becomes `0.0013`.
fn round_to(value: f64, digits: usize) -> f64 {
    format!("{value:.digits$}").parse().unwrap_or(value)
}
