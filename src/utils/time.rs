use crate::audit::types::CanonicalRecord;
use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse an audit `CreationTime` value.
///
/// Unified audit log payloads carry naive UTC timestamps
/// (`2024-01-01T00:00:00`); RFC 3339 values with an offset are accepted too.
pub fn parse_creation_time(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if ts.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Stable sort by the timestamp in `field`; records without one go last.
pub fn sort_chronologically(records: &mut [CanonicalRecord], field: &str) {
    records.sort_by_cached_key(|record| {
        match record.get(field).and_then(parse_creation_time) {
            Some(ts) => (false, Some(ts)),
            None => (true, None),
        }
    });
}
