//! CSV export of datasets.
//!
//! Which columns appear and what they are called is described by an
//! [`ExportSpec`]; the two tables offered for download are the
//! [`ExportSpec::summary`] and [`ExportSpec::full`] presets.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use loadtest_core::error::{MonitorError, Result};
use loadtest_core::formatting::{format_cell, EXPORT_TIMESTAMP_FORMAT};
use loadtest_core::models::{Column, Dataset, FieldValue, Reading};

use crate::transform::bucket_load_pct;

// ── ExportSpec ────────────────────────────────────────────────────────────────

/// Declarative description of an exported table.
///
/// Columns always appear in canonical schema order; an `ExportSpec` only decides
/// which are left out and what header each kept column gets.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSpec {
    dropped: BTreeSet<Column>,
    renames: BTreeMap<Column, String>,
    bucket_load_pct: bool,
    timestamp_format: String,
}

impl Default for ExportSpec {
    fn default() -> Self {
        Self {
            dropped: BTreeSet::new(),
            renames: BTreeMap::new(),
            bucket_load_pct: false,
            timestamp_format: EXPORT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl ExportSpec {
    /// All columns, canonical names, raw load percentage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Summary-log download: time, load, bucketed percentage, settlement.
    pub fn summary() -> Self {
        Self::new()
            .drop_columns([
                Column::Record,
                Column::Batt,
                Column::Temp,
                Column::S1,
                Column::S2,
                Column::S3,
                Column::S4,
                Column::SAvg,
                Column::RbMov,
            ])
            .rename(Column::TimeStamp, "Time Stamp")
            .rename(Column::LoadKn, "Load (kN)")
            .rename(Column::LoadPct, "(%)")
            .rename(Column::SCor, "Sett (mm)")
            .with_bucketed_load_pct(true)
    }

    /// Full-log download: everything except the logger diagnostics.
    pub fn full() -> Self {
        Self::new()
            .drop_indices([1, 2, 3])
            .rename(Column::TimeStamp, "Time Stamp")
            .rename(Column::LoadKn, "Load (kN)")
            .rename(Column::LoadPct, "Load (%)")
    }

    pub fn drop_columns(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.dropped.extend(columns);
        self
    }

    /// Drop columns by schema position. Positions past the schema are ignored.
    pub fn drop_indices(self, indices: impl IntoIterator<Item = usize>) -> Self {
        let columns: Vec<Column> = indices
            .into_iter()
            .filter_map(|i| Column::ALL.get(i).copied())
            .collect();
        self.drop_columns(columns)
    }

    /// Drop columns by canonical header name.
    pub fn drop_names<'a>(self, names: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let columns = names
            .into_iter()
            .map(|n| {
                Column::from_name(n)
                    .ok_or_else(|| MonitorError::Config(format!("unknown column {n:?}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self.drop_columns(columns))
    }

    pub fn rename(mut self, column: Column, header: impl Into<String>) -> Self {
        self.renames.insert(column, header.into());
        self
    }

    pub fn with_renames(mut self, renames: impl IntoIterator<Item = (Column, String)>) -> Self {
        self.renames.extend(renames);
        self
    }

    /// Bucket `Load_Pct` exactly as the cycle summary view does.
    pub fn with_bucketed_load_pct(mut self, enabled: bool) -> Self {
        self.bucket_load_pct = enabled;
        self
    }

    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    /// Kept columns, in schema order.
    pub fn columns(&self) -> Vec<Column> {
        Column::ALL
            .into_iter()
            .filter(|c| !self.dropped.contains(c))
            .collect()
    }

    /// Header row of the exported table.
    pub fn header(&self) -> Vec<String> {
        self.columns()
            .into_iter()
            .map(|c| {
                self.renames
                    .get(&c)
                    .cloned()
                    .unwrap_or_else(|| c.name().to_string())
            })
            .collect()
    }

    fn render(&self, reading: &Reading, column: Column) -> Result<String> {
        Ok(match reading.field(column) {
            FieldValue::Timestamp(ts) => {
                let mut cell = String::new();
                write!(cell, "{}", ts.format(&self.timestamp_format)).map_err(|_| {
                    MonitorError::Export(format!(
                        "invalid timestamp format {:?}",
                        self.timestamp_format
                    ))
                })?;
                cell
            }
            FieldValue::Integer(v) => v.to_string(),
            FieldValue::Float(v) if column == Column::LoadPct && self.bucket_load_pct => {
                format_cell(v.map(bucket_load_pct))
            }
            FieldValue::Float(v) => format_cell(v),
        })
    }
}

// ── Export ────────────────────────────────────────────────────────────────────

/// Render `dataset` as CSV bytes according to `spec`.
pub fn export(dataset: &Dataset, spec: &ExportSpec) -> Result<Vec<u8>> {
    let columns = spec.columns();
    let mut wtr = csv::Writer::from_writer(Vec::new());

    wtr.write_record(spec.header())
        .map_err(|e| MonitorError::Export(e.to_string()))?;

    for reading in dataset {
        let row = columns
            .iter()
            .map(|c| spec.render(reading, *c))
            .collect::<Result<Vec<_>>>()?;
        wtr.write_record(&row)
            .map_err(|e| MonitorError::Export(e.to_string()))?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| MonitorError::Export(e.to_string()))?;

    tracing::debug!(
        rows = dataset.len(),
        columns = columns.len(),
        bytes = bytes.len(),
        "rendered export table"
    );
    Ok(bytes)
}

/// Download file name for the summary table.
pub fn summary_file_name(test_id: &str) -> String {
    format!("{test_id}_Summary.csv")
}

/// Download file name for the full table.
pub fn full_file_name(test_id: &str) -> String {
    format!("{test_id}_All_Data.csv")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
