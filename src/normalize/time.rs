// ABOUTME: Parses the runtime's timestamp forms into UTC instants.
// ABOUTME: Unix seconds, RFC 3339, and the CLI's "2024-01-02 03:04:05 +0000 UTC" form.

use chrono::{DateTime, NaiveDate, Utc};

/// Unix seconds. Zero and negative values mean "unknown" to the runtime.
pub fn from_epoch(seconds: i64) -> Option<DateTime<Utc>> {
    if seconds <= 0 {
        return None;
    }
    DateTime::from_timestamp(seconds, 0)
}

/// Parse any timestamp form the runtimes print.
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let text = input.trim();
    if text.is_empty() {
        return None;
    }

    if text.chars().all(|c| c.is_ascii_digit()) {
        return text.parse().ok().and_then(from_epoch);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return known(parsed.with_timezone(&Utc));
    }

    // The CLI appends a zone abbreviation after the numeric offset.
    let without_zone = match text.rsplit_once(' ') {
        Some((head, zone)) if zone.chars().all(|c| c.is_ascii_alphabetic()) => head,
        _ => text,
    };
    DateTime::parse_from_str(without_zone, "%Y-%m-%d %H:%M:%S%.f %z")
        .ok()
        .and_then(|parsed| known(parsed.with_timezone(&Utc)))
}

/// Go's zero time stands in for "never".
pub(crate) fn known(instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 2)?.and_hms_opt(0, 0, 0)?.and_utc();
    (instant >= epoch).then_some(instant)
}
