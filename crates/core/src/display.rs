//! Display formatting for timestamps and durations shown in run and
//! catalog tables.

use chrono::DateTime;

use crate::types::UnixSeconds;

/// Shown wherever a value is absent.
pub const PLACEHOLDER: &str = "-";

/// Render unix seconds as `YYYY-MM-DD HH:MM:SS` (UTC).
///
/// Zero, negative, non-finite and out-of-range values render as
/// [`PLACEHOLDER`].
pub fn format_unix_seconds(secs: Option<UnixSeconds>) -> String {
    let Some(secs) = secs.filter(|s| s.is_finite() && *s > 0.0) else {
        return PLACEHOLDER.to_string();
    };
    let whole = secs.trunc() as i64;
    let nanos = ((secs - secs.trunc()) * 1e9) as u32;
    match DateTime::from_timestamp(whole, nanos) {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => PLACEHOLDER.to_string(),
    }
}

/// Render an elapsed duration as `"{secs}s"`, or [`PLACEHOLDER`].
pub fn format_elapsed(secs: Option<f64>) -> String {
    match secs {
        Some(s) if s.is_finite() => format!("{s}s"),
        _ => PLACEHOLDER.to_string(),
    }
}
