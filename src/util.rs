// Numeric coercion and formatting helpers.
//
// Cell values stay strings until aggregation; everything that turns them
// into numbers or turns numbers back into display strings lives here so the
// aggregators never see NaN or Infinity.
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in spreadsheet exports.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters (so `"NaN"` and
///   `"inf"` never parse).
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be parsed to a finite number.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Lazy numeric coercion used at aggregation time: missing or
/// non-numeric values count as zero.
pub fn coerce_number(s: &str) -> f64 {
    parse_f64_safe(Some(s)).unwrap_or(0.0)
}

pub fn average(sum: f64, count: usize) -> f64 {
    // `count` of zero yields 0 rather than NaN.
    if count == 0 {
        return 0.0;
    }
    sum / count as f64
}

/// Round half up, matching how the dashboards have always rounded
/// headcounts (`-2.5` becomes `-2`, `2.5` becomes `3`).
pub fn round_half_up(v: f64) -> f64 {
    clean_zero((v + 0.5).floor())
}

/// Round to one decimal place.
pub fn round1(v: f64) -> f64 {
    clean_zero((v * 10.0).round() / 10.0)
}

/// `part / whole * 100` rounded to one decimal; zero when the
/// denominator is not positive.
pub fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        round1(part / whole * 100.0)
    } else {
        0.0
    }
}

/// One-decimal display, never `-0.0`.
pub fn fixed1(v: f64) -> String {
    format!("{:.1}", clean_zero(round1(v)))
}

/// Zero-decimal display, never `-0`.
pub fn fixed0(v: f64) -> String {
    format!("{:.0}", clean_zero(v.round()))
}

/// One-decimal display with an explicit `+` for non-negative values.
pub fn signed1(v: f64) -> String {
    let r = clean_zero(round1(v));
    if r >= 0.0 {
        format!("+{:.1}", r)
    } else {
        format!("{:.1}", r)
    }
}

/// Plain number display (`12`, `12.5`), never `-0`.
pub fn plain(v: f64) -> String {
    format!("{}", clean_zero(v))
}

fn clean_zero(v: f64) -> f64 {
    // -0.0 + 0.0 == +0.0
    v + 0.0
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for counts in console messages
    // (e.g. `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}
