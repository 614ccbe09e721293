use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::FormatError;

/// One column of the instrument's fixed 13-field record layout.
///
/// Declaration order is the positional order of fields in a dump line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    TimeStamp,
    Record,
    Batt,
    Temp,
    LoadKn,
    LoadPct,
    S1,
    S2,
    S3,
    S4,
    SAvg,
    RbMov,
    SCor,
}

impl Column {
    /// Every column in positional order; doubles as the canonical header.
    pub const ALL: [Column; 13] = [
        Column::TimeStamp,
        Column::Record,
        Column::Batt,
        Column::Temp,
        Column::LoadKn,
        Column::LoadPct,
        Column::S1,
        Column::S2,
        Column::S3,
        Column::S4,
        Column::SAvg,
        Column::RbMov,
        Column::SCor,
    ];

    /// Number of fields on every data line.
    pub const COUNT: usize = Column::ALL.len();

    /// Canonical header name.
    pub fn name(self) -> &'static str {
        match self {
            Column::TimeStamp => "TimeStamp",
            Column::Record => "Record",
            Column::Batt => "Batt",
            Column::Temp => "Temp",
            Column::LoadKn => "Load_kN",
            Column::LoadPct => "Load_Pct",
            Column::S1 => "S1",
            Column::S2 => "S2",
            Column::S3 => "S3",
            Column::S4 => "S4",
            Column::SAvg => "S_avg",
            Column::RbMov => "RB_Mov",
            Column::SCor => "S_Cor",
        }
    }

    /// Zero-based position of the column in a dump line.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up a column by its canonical header name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Column> {
        Column::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single sample written by the load-settlement logger.
///
/// Every measurement is optional: `None` is the instrument's "missing"
/// marker and is never replaced by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Logger clock time, second resolution.
    pub timestamp: NaiveDateTime,
    /// Logger record number, increasing within one file.
    pub record_id: i64,
    /// Logger supply voltage.
    pub battery: Option<f64>,
    /// Logger panel temperature.
    pub temperature: Option<f64>,
    /// Applied load in kN.
    pub load_kn: Option<f64>,
    /// Applied load as a percentage of design capacity.
    pub load_pct: Option<f64>,
    pub s1: Option<f64>,
    pub s2: Option<f64>,
    pub s3: Option<f64>,
    pub s4: Option<f64>,
    /// Mean of the four settlement gauges.
    pub s_avg: Option<f64>,
    /// Reference-beam movement.
    pub rb_mov: Option<f64>,
    /// Corrected settlement in mm.
    pub s_cor: Option<f64>,
}

/// A reading field value, as stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Timestamp(NaiveDateTime),
    Integer(i64),
    Float(Option<f64>),
}

impl Reading {
    /// Value of `column` on this reading.
    pub fn field(&self, column: Column) -> FieldValue {
        match column {
            Column::TimeStamp => FieldValue::Timestamp(self.timestamp),
            Column::Record => FieldValue::Integer(self.record_id),
            Column::Batt => FieldValue::Float(self.battery),
            Column::Temp => FieldValue::Float(self.temperature),
            Column::LoadKn => FieldValue::Float(self.load_kn),
            Column::LoadPct => FieldValue::Float(self.load_pct),
            Column::S1 => FieldValue::Float(self.s1),
            Column::S2 => FieldValue::Float(self.s2),
            Column::S3 => FieldValue::Float(self.s3),
            Column::S4 => FieldValue::Float(self.s4),
            Column::SAvg => FieldValue::Float(self.s_avg),
            Column::RbMov => FieldValue::Float(self.rb_mov),
            Column::SCor => FieldValue::Float(self.s_cor),
        }
    }
}

/// An immutable, time-ordered sequence of readings from one source file.
///
/// The only constructor checks that timestamps never decrease and that
/// record ids are unique, so every `Dataset` in circulation upholds both.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    readings: Vec<Reading>,
}

impl Dataset {
    /// Build a dataset, rejecting input that is out of time order or that
    /// repeats a record id. Line numbers in the error are 1-based row
    /// positions within `readings`.
    pub fn new(readings: Vec<Reading>) -> Result<Self, FormatError> {
        let mut seen: HashSet<i64> = HashSet::with_capacity(readings.len());
        let mut previous: Option<NaiveDateTime> = None;

        for (idx, reading) in readings.iter().enumerate() {
            let line = idx as u64 + 1;
            if previous.is_some_and(|p| reading.timestamp < p) {
                return Err(FormatError::OutOfOrder {
                    line,
                    timestamp: reading.timestamp.to_string(),
                });
            }
            if !seen.insert(reading.record_id) {
                return Err(FormatError::DuplicateRecord {
                    line,
                    record_id: reading.record_id,
                });
            }
            previous = Some(reading.timestamp);
        }

        Ok(Self { readings })
    }

    /// An empty dataset.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn first(&self) -> Option<&Reading> {
        self.readings.first()
    }

    pub fn last(&self) -> Option<&Reading> {
        self.readings.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Reading> {
        self.readings.iter()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Reading;
    type IntoIter = std::slice::Iter<'a, Reading>;

    fn into_iter(self) -> Self::IntoIter {
        self.readings.iter()
    }
}
