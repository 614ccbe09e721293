use chrono::{Local, NaiveDateTime, Timelike};

/// Layouts the logger has been seen to write, tried in order.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a logger timestamp into a naive local date-time at second resolution.
///
/// Surrounding whitespace and quotes are ignored and sub-second digits are
/// truncated. Returns `None` for empty or unrecognised input.
///
/// # Examples
///
/// ```
/// use loadtest_core::time_utils::parse_instrument_timestamp;
///
/// let ts = parse_instrument_timestamp("\"2024-01-01 10:00:00.5\"").unwrap();
/// assert_eq!(ts.to_string(), "2024-01-01 10:00:00");
/// assert!(parse_instrument_timestamp("NAN").is_none());
/// ```
pub fn parse_instrument_timestamp(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim().trim_matches('"').trim();
    if trimmed.is_empty() {
        return None;
    }

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .and_then(|dt| dt.with_nanosecond(0))
}

/// Current wall-clock time in the system's local timezone, without offset.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}
