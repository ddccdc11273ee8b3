//! Count parsing and formatting.
//!
//! Trending pages render counts like "1,047", "12.4k" or "1.2m". The parser
//! is deliberately forgiving: malformed or missing text becomes 0 so a single
//! garbled cell never aborts a whole page extraction.

/// Parse a human-readable count into an integer.
///
/// Handles thousands separators and a case-insensitive `k`/`m` magnitude
/// suffix, rounding to the nearest integer. Returns 0 for anything that
/// does not parse, including negative values.
pub fn parse_count(text: &str) -> i64 {
    let cleaned = text.trim().to_lowercase().replace(',', "");
    if cleaned.is_empty() {
        return 0;
    }

    let (digits, multiplier) = if let Some(stripped) = cleaned.strip_suffix('k') {
        (stripped, 1_000.0)
    } else if let Some(stripped) = cleaned.strip_suffix('m') {
        (stripped, 1_000_000.0)
    } else {
        (cleaned.as_str(), 1.0)
    };

    match digits.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => (value * multiplier).round() as i64,
        _ => 0,
    }
}

/// Format a count back into the compact display form used in reports.
pub fn format_count(n: i64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}
