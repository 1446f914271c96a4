//! Lenient calendar-date parsing for persisted rows.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Parses the date formats found across both schema eras.
///
/// Accepted: `YYYY-MM-DD`, RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS[.f]`,
/// anything whose first ten characters are `YYYY-MM-DD`, and legacy
/// `DD/MM/YYYY`.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.date_naive());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts.date());
    }
    if let Some(prefix) = trimmed.get(..10)
        && let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
    {
        return Some(date);
    }
    NaiveDate::parse_from_str(trimmed, "%d/%m/%Y").ok()
}
