// Statistics and formatting helpers.
//
// The derivation code stays arithmetic-only by leaning on these helpers for
// the degenerate cases (empty slices, zero spread).
use num_format::{Locale, ToFormattedString};

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Standard deviation dividing by N, not N - 1.
pub fn population_std_dev(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let mean = average(v);
    let var = v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / v.len() as f64;
    var.sqrt()
}

/// Smallest and largest value, or `None` for an empty slice.
pub fn min_max(v: &[f64]) -> Option<(f64, f64)> {
    v.iter().copied().fold(None, |acc, x| match acc {
        None => Some((x, x)),
        Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
    })
}

/// Min-max scale every value into [0, 1]. A constant column maps to 0.0.
pub fn min_max_normalise(v: &[f64]) -> Vec<f64> {
    let Some((lo, hi)) = min_max(v) else {
        return Vec::new();
    };
    let range = hi - lo;
    if range == 0.0 {
        tracing::debug!(value = lo, "zero range column, normalising to 0.0");
        return vec![0.0; v.len()];
    }
    v.iter().map(|x| ((x - lo) / range).clamp(0.0, 1.0)).collect()
}

pub fn round_to(n: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (n * factor).round() / factor
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Format a floating-point value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    // A negative value that rounds to zero prints without its sign.
    if neg && res.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
