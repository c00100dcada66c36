//! ISO-8601 durations as the catalog reports them (`PT4M13S`, `P1DT2H`).

use iso8601_duration::Duration;

/// Whole seconds in an ISO-8601 duration, or `None` if it doesn't parse.
///
/// Years and months have no fixed length and are rejected. Fractional
/// seconds are truncated.
pub fn parse_iso8601_secs(raw: &str) -> Option<u64> {
    let d = Duration::parse(raw.trim()).ok()?;
    if d.year != 0.0 || d.month != 0.0 {
        return None;
    }

    let secs = d.day as f64 * 86_400.0 + d.hour as f64 * 3_600.0 + d.minute as f64 * 60.0 + d.second as f64;
    (secs.is_finite() && secs >= 0.0).then(|| secs as u64)
}
