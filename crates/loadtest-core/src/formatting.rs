use chrono::NaiveDateTime;

/// Timestamp layout used wherever readings are shown on screen.
pub const DISPLAY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Timestamp layout used in exported tables (`DD-MM-YY HH:MM`).
pub const EXPORT_TIMESTAMP_FORMAT: &str = "%d-%m-%y %H:%M";

/// Layout of the wall-clock line refreshed every fine tick.
pub const CLOCK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Text shown in place of a missing measurement in human-readable output.
pub const MISSING_DISPLAY: &str = "NAN";

/// Format a reading timestamp for display.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use loadtest_core::formatting::format_display_timestamp;
///
/// let ts = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(10, 0, 59).unwrap();
/// assert_eq!(format_display_timestamp(&ts), "2024-01-01 10:00");
/// ```
pub fn format_display_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(DISPLAY_TIMESTAMP_FORMAT).to_string()
}

/// Format a reading timestamp for an exported table.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use loadtest_core::formatting::format_export_timestamp;
///
/// let ts = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap().and_hms_opt(8, 5, 0).unwrap();
/// assert_eq!(format_export_timestamp(&ts), "07-03-24 08:05");
/// ```
pub fn format_export_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(EXPORT_TIMESTAMP_FORMAT).to_string()
}

/// Format a wall-clock time for the clock line.
pub fn format_clock(ts: &NaiveDateTime) -> String {
    ts.format(CLOCK_FORMAT).to_string()
}

/// Format an optional measurement with a fixed number of decimals.
///
/// Missing values render as [`MISSING_DISPLAY`]; a result that rounds to
/// zero never carries a minus sign.
///
/// # Examples
///
/// ```
/// use loadtest_core::formatting::format_fixed;
///
/// assert_eq!(format_fixed(Some(1234.0), 0), "1234");
/// assert_eq!(format_fixed(Some(12.345), 2), "12.35");
/// assert_eq!(format_fixed(Some(-0.2), 0), "0");
/// assert_eq!(format_fixed(None, 2), "NAN");
/// ```
pub fn format_fixed(value: Option<f64>, decimals: usize) -> String {
    let Some(v) = value else {
        return MISSING_DISPLAY.to_string();
    };

    let formatted = format!("{:.prec$}", v, prec = decimals);
    match formatted.strip_prefix('-') {
        Some(rest) if rest.chars().all(|c| c == '0' || c == '.') => rest.to_string(),
        _ => formatted,
    }
}

/// Format an optional measurement as a table cell.
///
/// Missing values become an empty cell. Whole numbers keep a single
/// decimal so that a column of loads reads uniformly as floats.
///
/// # Examples
///
/// ```
/// use loadtest_core::formatting::format_cell;
///
/// assert_eq!(format_cell(Some(1234.0)), "1234.0");
/// assert_eq!(format_cell(Some(12.345)), "12.345");
/// assert_eq!(format_cell(Some(-3.5)), "-3.5");
/// assert_eq!(format_cell(None), "");
/// ```
pub fn format_cell(value: Option<f64>) -> String {
    match value {
        None => String::new(),
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{:.1}", v),
        Some(v) => v.to_string(),
    }
}
