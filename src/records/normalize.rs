use once_cell::sync::Lazy;
use regex::Regex;

use super::FieldValue;

/// Sentinel written for empty or missing cells.
pub const MISSING_PLACEHOLDER: &str = "N/A";

/// Plain decimal: optional sign, digits with an optional fraction, or a
/// bare fraction. No exponent, no separators, so `NaN`/`Infinity` never match.
static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)$").expect("decimal regex"));

/// Classify one raw cell as a number, the missing placeholder, or text.
pub fn normalize(raw: &str) -> FieldValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == MISSING_PLACEHOLDER {
        return FieldValue::Missing;
    }
    if DECIMAL.is_match(trimmed) {
        if let Ok(n) = trimmed.parse::<f64>() {
            // very long digit runs overflow to inf
            if n.is_finite() {
                return FieldValue::Number(n);
            }
        }
    }
    FieldValue::Text(trimmed.to_string())
}
