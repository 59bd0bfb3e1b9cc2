//! Calendar date normalization. Every date in the ledger is a timezone-naive local calendar day.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%m/%d/%Y"];
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"];

/// Parses the shapes of date we see from forms, the AI service and the remote store. Instants
/// with an offset (the remote store serializes its date cells that way) are converted to the
/// local calendar day. Returns `None` when nothing matches.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
        return Some(instant.with_timezone(&Local).date_naive());
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(date_time) = NaiveDateTime::parse_from_str(s, format) {
            return Some(date_time.date());
        }
    }
    None
}

/// Today's local calendar day.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
