/// Timestamp parsing and display
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Shown when a timestamp cannot be parsed
pub const UNKNOWN_CLOCK: &str = "--:--";

/// Parse an ISO-8601 timestamp.
///
/// Offset-less date-times are read as local time, bare dates as UTC midnight.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// `HH:MM` (24-hour, zero-padded) in the local timezone
pub fn format_clock(s: &str) -> String {
    format_clock_in(s, &Local)
}

/// `HH:MM` in an explicit timezone
pub fn format_clock_in<Tz: TimeZone>(s: &str, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match parse_timestamp(s) {
        Some(dt) => dt.with_timezone(tz).format("%H:%M").to_string(),
        None => UNKNOWN_CLOCK.to_string(),
    }
}

/// Client-side "now", RFC 3339 UTC with milliseconds
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
