//! Logger dump parsing for the load-test monitor.
//!
//! A dump starts with four lines of logger metadata (station, field names,
//! units, processing) which are discarded unread. Every following line is a
//! comma-delimited record whose fields map positionally onto [`Column::ALL`].

use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, Trim};
use loadtest_core::error::{FormatError, Result};
use loadtest_core::models::{Column, Dataset, Reading};
use loadtest_core::time_utils::parse_instrument_timestamp;
use tracing::{debug, warn};

use crate::source::read_growing_file;

/// Number of metadata lines at the top of every dump.
pub const METADATA_LINES: usize = 4;

// ── Public types ──────────────────────────────────────────────────────────────

/// How malformed data lines are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Skip malformed lines and record a diagnostic. The logger occasionally
    /// leaves a truncated last line while it is still writing.
    #[default]
    Tolerant,
    /// Fail the whole parse on the first malformed line.
    Strict,
}

/// A data line dropped during a tolerant parse.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedLine {
    /// 1-based line number in the source text.
    pub line: u64,
    pub reason: FormatError,
}

/// Output of a successful parse.
#[derive(Debug, Clone)]
pub struct ParsedLog {
    pub dataset: Dataset,
    /// Lines dropped in tolerant mode; always empty in strict mode.
    pub skipped: Vec<SkippedLine>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Canonical column names of a data line, in positional order.
pub fn canonical_header() -> StringRecord {
    StringRecord::from(Column::ALL.iter().map(|c| c.name()).collect::<Vec<_>>())
}

/// Parse raw dump text into a [`Dataset`].
///
/// Fails with [`FormatError::TooFewLines`] when the metadata block is
/// incomplete. Malformed data lines (wrong field count, unparseable timestamp
/// or record id, out-of-order timestamp, repeated record id) are skipped in
/// [`ParseMode::Tolerant`] and fail the parse in [`ParseMode::Strict`]. Any
/// other unparseable value becomes a missing measurement.
pub fn parse(raw_text: &str, mode: ParseMode) -> std::result::Result<ParsedLog, FormatError> {
    let body_offset = metadata_end(raw_text)?;
    let body = &raw_text[body_offset..];

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(body.as_bytes());

    let mut readings: Vec<Reading> = Vec::new();
    let mut skipped: Vec<SkippedLine> = Vec::new();
    let mut seen_ids: HashSet<i64> = HashSet::new();
    let mut last_ts: Option<NaiveDateTime> = None;
    let mut last_line = METADATA_LINES as u64;

    for result in rdr.records() {
        let outcome = match result {
            Ok(record) => {
                let line = record
                    .position()
                    .map(|p| p.line() + METADATA_LINES as u64)
                    .unwrap_or(last_line + 1);
                last_line = line;

                if is_blank(&record) {
                    continue;
                }

                parse_record(&record, line).and_then(|reading| {
                    check_sequence(&reading, line, last_ts, &seen_ids).map(|()| reading)
                })
            }
            Err(e) => {
                let line = e
                    .position()
                    .map(|p| p.line() + METADATA_LINES as u64)
                    .unwrap_or(last_line + 1);
                last_line = line;
                Err(FormatError::Malformed {
                    line,
                    message: e.to_string(),
                })
            }
        };

        match outcome {
            Ok(reading) => {
                seen_ids.insert(reading.record_id);
                last_ts = Some(reading.timestamp);
                readings.push(reading);
            }
            Err(reason) if mode == ParseMode::Strict => return Err(reason),
            Err(reason) => {
                warn!("Skipping malformed logger line: {}", reason);
                skipped.push(SkippedLine {
                    line: reason.line().unwrap_or(last_line),
                    reason,
                });
            }
        }
    }

    debug!(
        "Parsed {} readings, skipped {} lines",
        readings.len(),
        skipped.len()
    );

    Ok(ParsedLog {
        dataset: Dataset::new(readings)?,
        skipped,
    })
}

/// Read `path` and parse it.
///
/// This is the only blocking I/O in the pipeline. The file may be growing
/// while it is read; see [`read_growing_file`].
pub fn parse_file(path: &Path, mode: ParseMode) -> Result<ParsedLog> {
    let text = read_growing_file(path)?;
    Ok(parse(&text, mode)?)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Byte offset just past the metadata block.
fn metadata_end(raw_text: &str) -> std::result::Result<usize, FormatError> {
    let mut offset = 0usize;
    let mut found = 0usize;
    for line in raw_text.split_inclusive('\n').take(METADATA_LINES) {
        offset += line.len();
        found += 1;
    }
    if found < METADATA_LINES {
        return Err(FormatError::TooFewLines {
            expected: METADATA_LINES,
            found,
        });
    }
    Ok(offset)
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|f| f.is_empty())
}

/// Map one record onto a [`Reading`].
fn parse_record(record: &StringRecord, line: u64) -> std::result::Result<Reading, FormatError> {
    if record.len() != Column::COUNT {
        return Err(FormatError::FieldCount {
            line,
            expected: Column::COUNT,
            found: record.len(),
        });
    }

    let field = |c: Column| record.get(c.index()).unwrap_or_default();

    let raw_ts = field(Column::TimeStamp);
    let timestamp =
        parse_instrument_timestamp(raw_ts).ok_or_else(|| FormatError::InvalidTimestamp {
            line,
            value: raw_ts.to_string(),
        })?;

    let raw_id = field(Column::Record);
    let record_id = parse_record_id(raw_id).ok_or_else(|| FormatError::InvalidRecordId {
        line,
        value: raw_id.to_string(),
    })?;

    let value = |c: Column| parse_measurement(field(c));

    Ok(Reading {
        timestamp,
        record_id,
        battery: value(Column::Batt),
        temperature: value(Column::Temp),
        load_kn: value(Column::LoadKn),
        load_pct: value(Column::LoadPct),
        s1: value(Column::S1),
        s2: value(Column::S2),
        s3: value(Column::S3),
        s4: value(Column::S4),
        s_avg: value(Column::SAvg),
        rb_mov: value(Column::RbMov),
        s_cor: value(Column::SCor),
    })
}

/// Reject a reading that would break the dataset's ordering invariants.
fn check_sequence(
    reading: &Reading,
    line: u64,
    last_ts: Option<NaiveDateTime>,
    seen_ids: &HashSet<i64>,
) -> std::result::Result<(), FormatError> {
    if last_ts.is_some_and(|prev| reading.timestamp < prev) {
        return Err(FormatError::OutOfOrder {
            line,
            timestamp: reading.timestamp.to_string(),
        });
    }
    if seen_ids.contains(&reading.record_id) {
        return Err(FormatError::DuplicateRecord {
            line,
            record_id: reading.record_id,
        });
    }
    Ok(())
}

fn parse_record_id(s: &str) -> Option<i64> {
    s.trim_matches('"').parse::<i64>().ok()
}

/// Parse a measurement; anything that is not a finite number is missing.
fn parse_measurement(s: &str) -> Option<f64> {
    s.trim_matches('"')
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
