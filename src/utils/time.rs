//! Lenient timestamp handling for persisted documents
//!
//! Older documents were written with naive ISO-8601 timestamps (no offset) or
//! with a space separator. Anything that cannot be parsed is treated as absent
//! instead of failing the whole document.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a timestamp in any of the accepted layouts.
///
/// Naive values are interpreted as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Extract the calendar date from a session stamp such as
/// `2024-01-15 10:30:00` or `2024-01-15T10:30:00Z`.
pub fn parse_session_date(raw: &str) -> Option<NaiveDate> {
    if let Some(ts) = parse_timestamp(raw) {
        return Some(ts.date_naive());
    }
    let head = raw.split_whitespace().next()?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Serde helper: optional timestamp that degrades to `None` on garbage.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => parse_timestamp(&s),
        _ => None,
    })
}
