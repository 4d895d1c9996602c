//! Parsing and formatting of surveyed heights and span lengths.

use std::sync::LazyLock;

use regex::Regex;

use crate::pole::mapper::model::CellValue;

static DASHED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(\d+)'-(\d+)""#).expect("valid regex"));

static PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)[^\d]+(\d+)").expect("valid regex"));

static FEET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)").expect("valid regex"));

static LENGTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^(\d+(?:\.\d+)?)\s*(?:'|ft|feet)?\s*(?:-?\s*(\d+(?:\.\d+)?)\s*(?:"|in|inches)?)?$"#)
        .expect("valid regex")
});

/// Splits height text such as `5'-10"`, `4' 6"` or `6'` into feet and inches.
pub fn feet_inches(text: &str) -> Option<(u32, u32)> {
    let text = text.trim();
    if let Some(caps) = DASHED_RE.captures(text).or_else(|| PAIR_RE.captures(text)) {
        return Some((caps[1].parse().ok()?, caps[2].parse().ok()?));
    }
    let caps = FEET_RE.captures(text)?;
    Some((caps[1].parse().ok()?, 0))
}

/// Formats height text as `F' I"`.
pub fn format_height(text: &str) -> Option<String> {
    feet_inches(text).map(|(feet, inches)| format!("{feet}' {inches}\""))
}

/// Converts height text to decimal feet rounded to two places.
pub fn height_decimal(text: &str) -> Option<f64> {
    feet_inches(text).map(|(feet, inches)| {
        let value = f64::from(feet) + f64::from(inches) / 12.0;
        (value * 100.0).round() / 100.0
    })
}

/// Formats a measurement in inches as `F' I"`. Negative input has no
/// meaningful height.
pub fn inches_to_feet(inches: f64) -> Option<String> {
    if !inches.is_finite() || inches < 0.0 {
        return None;
    }
    let total = inches.trunc() as u64;
    Some(format!("{}' {}\"", total / 12, total % 12))
}

/// Height of an attachment cell in decimal feet. Numeric cells are
/// measured in inches, text cells are read as feet and inches.
pub fn height_feet(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(inches) if inches.is_finite() && *inches >= 0.0 => Some(inches / 12.0),
        CellValue::Number(_) => None,
        _ => height_decimal(&value.as_text()),
    }
}

/// Formats an attachment height as `F' I"`, or as decimal feet with two
/// places when `decimal` is set. `None` when the cell holds no height.
pub fn format_measurement(value: &CellValue, decimal: bool) -> Option<String> {
    if decimal {
        return height_feet(value).map(|feet| format!("{:.2}", (feet * 100.0).round() / 100.0));
    }
    match value {
        CellValue::Number(inches) => inches_to_feet(*inches),
        _ => format_height(&value.as_text()),
    }
}

/// Parses a span length in feet from a cell: plain numbers, `52'`, `52 ft`
/// and `52' 6"` are accepted.
pub fn parse_feet(value: &CellValue) -> Option<f64> {
    if let Some(number) = value.as_f64() {
        return number.is_finite().then_some(number);
    }
    let text = value.as_text();
    let caps = LENGTH_RE.captures(&text)?;
    let feet: f64 = caps[1].parse().ok()?;
    let inches: f64 = match caps.get(2) {
        Some(inches) => inches.as_str().parse().ok()?,
        None => 0.0,
    };
    Some(feet + inches / 12.0)
}

/// Formats a span length as whole feet, e.g. `52'`.
pub fn format_span_length(feet: f64) -> String {
    format!("{}'", feet.round() as i64)
}
