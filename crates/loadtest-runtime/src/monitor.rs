//! Pull interface between the pipeline and a presentation layer.
//!
//! [`LoadTestMonitor`] owns the two dataset stores of a load test (the
//! full-resolution log and the coarse summary log) and exposes every view,
//! the latest-reading line and both export tables as plain method calls.
//! Views are recomputed from the current snapshots on every call.

use std::path::PathBuf;
use std::sync::Arc;

use loadtest_core::error::{MonitorError, Result};
use loadtest_core::models::Dataset;
use loadtest_data::export::{export, ExportSpec};
use loadtest_data::reader::ParseMode;
use loadtest_data::source::FileSource;
use loadtest_data::transform::{
    self, CycleSummaryView, LoadSettlementView, SummaryTable, TimeSeriesView,
};
use serde::Serialize;

use crate::store::DatasetStore;

// ── Public types ──────────────────────────────────────────────────────────────

/// Every derived view, computed from one pair of snapshots.
///
/// This is the payload the scheduler publishes after each refresh. The two
/// stores load independently, so the views of a store that has not loaded
/// yet are `None` while the other store's views are present.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorSnapshot {
    /// `0` until the primary store first loads.
    pub primary_version: u64,
    /// `0` until the summary store first loads.
    pub summary_version: u64,
    pub time_series: Option<TimeSeriesView>,
    pub load_settlement: Option<LoadSettlementView>,
    pub cycle_summary: Option<CycleSummaryView>,
    pub summary_table: Option<SummaryTable>,
    /// `None` until the primary log holds at least one reading.
    pub latest_summary: Option<String>,
}

// ── LoadTestMonitor ───────────────────────────────────────────────────────────

/// The two stores of one load test plus the export presets applied to them.
pub struct LoadTestMonitor {
    primary: DatasetStore,
    summary: DatasetStore,
    summary_export: ExportSpec,
    full_export: ExportSpec,
}

impl LoadTestMonitor {
    pub fn new(primary: DatasetStore, summary: DatasetStore) -> Self {
        Self {
            primary,
            summary,
            summary_export: ExportSpec::summary(),
            full_export: ExportSpec::full(),
        }
    }

    /// Monitor the two logger dump files of a test.
    pub fn from_files(
        primary_file: impl Into<PathBuf>,
        summary_file: impl Into<PathBuf>,
        mode: ParseMode,
    ) -> Self {
        Self::new(
            DatasetStore::new("primary", FileSource::new(primary_file), mode),
            DatasetStore::new("summary", FileSource::new(summary_file), mode),
        )
    }

    /// Replace the export presets.
    pub fn with_export_specs(mut self, summary: ExportSpec, full: ExportSpec) -> Self {
        self.summary_export = summary;
        self.full_export = full;
        self
    }

    pub fn primary_store(&self) -> &DatasetStore {
        &self.primary
    }

    pub fn summary_store(&self) -> &DatasetStore {
        &self.summary
    }

    // ── Refresh triggers ──────────────────────────────────────────────────

    pub fn refresh_primary(&self) -> Result<Arc<Dataset>> {
        self.primary.refresh()
    }

    pub fn refresh_summary(&self) -> Result<Arc<Dataset>> {
        self.summary.refresh()
    }

    /// Refresh both stores independently, returning the failures.
    ///
    /// A failure of one store does not prevent the other from refreshing.
    pub fn refresh_all(&self) -> Vec<MonitorError> {
        [self.refresh_primary(), self.refresh_summary()]
            .into_iter()
            .filter_map(|r| r.err())
            .collect()
    }

    // ── Views ─────────────────────────────────────────────────────────────

    pub fn get_time_series(&self) -> Result<TimeSeriesView> {
        Ok(transform::time_series(&*self.primary.current()?))
    }

    pub fn get_load_settlement(&self) -> Result<LoadSettlementView> {
        Ok(transform::load_settlement(&*self.primary.current()?))
    }

    pub fn get_cycle_summary(&self) -> Result<CycleSummaryView> {
        Ok(transform::cycle_summary(&*self.summary.current()?))
    }

    pub fn get_summary_table(&self) -> Result<SummaryTable> {
        Ok(transform::summary_table(&*self.summary.current()?))
    }

    /// Latest reading of the full-resolution log as one display line.
    pub fn get_latest_summary_string(&self) -> Result<String> {
        transform::latest_reading_summary(&*self.primary.current()?)
    }

    // ── Exports ───────────────────────────────────────────────────────────

    /// Summary log as CSV with `Time Stamp, Load (kN), (%), Sett (mm)`.
    pub fn export_summary_table(&self) -> Result<Vec<u8>> {
        export(&*self.summary.current()?, &self.summary_export)
    }

    /// Full log as CSV without the logger diagnostic columns.
    pub fn export_full_table(&self) -> Result<Vec<u8>> {
        export(&*self.primary.current()?, &self.full_export)
    }

    // ── Combined snapshot ─────────────────────────────────────────────────

    /// All views from the current snapshots.
    ///
    /// Each store is read once, so every view in the result comes from the
    /// same pair of datasets even if a refresh lands mid-call. Fails with
    /// `NotReady` only when neither store has loaded.
    pub fn snapshot(&self) -> Result<MonitorSnapshot> {
        let primary = self.primary.snapshot();
        let summary = self.summary.snapshot();
        if primary.is_none() && summary.is_none() {
            return Err(MonitorError::NotReady("load-test"));
        }

        let latest_summary = match &primary {
            Some(p) => match transform::latest_reading_summary(&p.dataset) {
                Ok(line) => Some(line),
                Err(MonitorError::EmptyDataset) => None,
                Err(e) => return Err(e),
            },
            None => None,
        };

        Ok(MonitorSnapshot {
            primary_version: primary.as_ref().map_or(0, |p| p.version),
            summary_version: summary.as_ref().map_or(0, |s| s.version),
            time_series: primary.as_ref().map(|p| transform::time_series(&p.dataset)),
            load_settlement: primary
                .as_ref()
                .map(|p| transform::load_settlement(&p.dataset)),
            cycle_summary: summary.as_ref().map(|s| transform::cycle_summary(&s.dataset)),
            summary_table: summary.as_ref().map(|s| transform::summary_table(&s.dataset)),
            latest_summary,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{dump, HEADER};
    use loadtest_data::source::TextSource;
    use tempfile::TempDir;

    // ── helpers ───────────────────────────────────────────────────────────

    fn monitor(primary_rows: usize, summary_rows: usize) -> LoadTestMonitor {
        LoadTestMonitor::new(
            DatasetStore::new(
                "primary",
                TextSource::new("primary", dump(primary_rows)),
                ParseMode::Tolerant,
            ),
            DatasetStore::new(
                "summary",
                TextSource::new("summary", dump(summary_rows)),
                ParseMode::Tolerant,
            ),
        )
    }

    fn csv_rows(bytes: &[u8]) -> Vec<Vec<String>> {
        csv_reader(bytes)
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    fn csv_reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(bytes)
    }

    // ── not ready ─────────────────────────────────────────────────────────

    #[test]
    fn test_everything_not_ready_before_refresh() {
        let m = monitor(3, 3);
        assert!(matches!(m.get_time_series(), Err(MonitorError::NotReady("primary"))));
        assert!(matches!(m.get_load_settlement(), Err(MonitorError::NotReady(_))));
        assert!(matches!(m.get_cycle_summary(), Err(MonitorError::NotReady("summary"))));
        assert!(matches!(m.get_summary_table(), Err(MonitorError::NotReady(_))));
        assert!(matches!(m.get_latest_summary_string(), Err(MonitorError::NotReady(_))));
        assert!(matches!(m.export_summary_table(), Err(MonitorError::NotReady(_))));
        assert!(matches!(m.export_full_table(), Err(MonitorError::NotReady(_))));
        assert!(matches!(m.snapshot(), Err(MonitorError::NotReady(_))));
    }

    #[test]
    fn test_stores_refresh_independently() {
        let m = monitor(3, 12);
        m.refresh_summary().unwrap();

        assert!(m.get_cycle_summary().is_ok());
        assert!(m.get_time_series().is_err());
        assert_eq!(m.summary_store().version(), 1);
        assert_eq!(m.primary_store().version(), 0);
    }

    // ── views ─────────────────────────────────────────────────────────────

    #[test]
    fn test_views_after_refresh() {
        let m = monitor(10, 12);
        assert!(m.refresh_all().is_empty());

        assert_eq!(m.get_time_series().unwrap().len(), 10);
        assert_eq!(m.get_load_settlement().unwrap().len(), 10);

        let cycles = m.get_cycle_summary().unwrap();
        assert_eq!(cycles.first_cycle.len(), 9);
        assert_eq!(cycles.second_cycle.len(), 4);
        assert_eq!(cycles.first_cycle[8], cycles.second_cycle[0]);

        assert_eq!(m.get_summary_table().unwrap().len(), 12);
        assert_eq!(
            m.get_latest_summary_string().unwrap(),
            "2024-01-01 10:09 - 1000 kN, 100 %, Sett = 4.50 mm"
        );
    }

    #[test]
    fn test_latest_summary_on_empty_primary() {
        let m = LoadTestMonitor::new(
            DatasetStore::new("primary", TextSource::new("p", HEADER), ParseMode::Tolerant),
            DatasetStore::new("summary", TextSource::new("s", dump(2)), ParseMode::Tolerant),
        );
        assert!(m.refresh_all().is_empty());
        assert!(matches!(
            m.get_latest_summary_string(),
            Err(MonitorError::EmptyDataset)
        ));
        assert!(m.snapshot().unwrap().latest_summary.is_none());
    }

    // ── exports ───────────────────────────────────────────────────────────

    #[test]
    fn test_export_full_table_round_trip() {
        let m = monitor(10, 3);
        m.refresh_all();
        let rows = csv_rows(&m.export_full_table().unwrap());

        assert_eq!(rows.len(), 11);
        assert!(rows.iter().all(|r| r.len() == 10));
        assert_eq!(&rows[0][..3], &["Time Stamp", "Load (kN)", "Load (%)"]);
        assert!(!rows[0].iter().any(|h| h == "Record" || h == "Batt" || h == "Temp"));
    }

    #[test]
    fn test_export_summary_table() {
        let m = monitor(3, 5);
        m.refresh_all();
        let rows = csv_rows(&m.export_summary_table().unwrap());

        assert_eq!(rows[0], vec!["Time Stamp", "Load (kN)", "(%)", "Sett (mm)"]);
        assert_eq!(rows.len(), 6);
        // Percentages 10, 20, 30, 40, 50 → 0, 25, 25, 50, 50.
        let pcts: Vec<&str> = rows[1..].iter().map(|r| r[2].as_str()).collect();
        assert_eq!(pcts, vec!["0.0", "25.0", "25.0", "50.0", "50.0"]);
        assert_eq!(rows[1][0], "01-01-24 10:00");
    }

    #[test]
    fn test_custom_export_specs() {
        let m = monitor(2, 2).with_export_specs(
            ExportSpec::new().drop_indices(1..13),
            ExportSpec::new().drop_indices(2..13),
        );
        m.refresh_all();
        assert_eq!(csv_rows(&m.export_summary_table().unwrap())[0].len(), 1);
        assert_eq!(csv_rows(&m.export_full_table().unwrap())[0].len(), 2);
    }

    // ── snapshot ──────────────────────────────────────────────────────────

    #[test]
    fn test_snapshot_contains_all_views() {
        let m = monitor(4, 10);
        m.refresh_all();
        let snap = m.snapshot().unwrap();

        assert_eq!(snap.primary_version, 1);
        assert_eq!(snap.summary_version, 1);
        assert_eq!(snap.time_series.as_ref().unwrap().len(), 4);
        assert_eq!(snap.load_settlement.as_ref().unwrap().len(), 4);
        assert_eq!(snap.summary_table.as_ref().unwrap().len(), 10);
        assert_eq!(snap.cycle_summary.as_ref().unwrap().second_cycle.len(), 2);
        assert!(snap.latest_summary.is_some());

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["time_series"].as_array().unwrap().len(), 4);
        assert!(json["cycle_summary"]["first_cycle"].is_array());
    }

    #[test]
    fn test_snapshot_with_only_primary_loaded() {
        let m = LoadTestMonitor::new(
            DatasetStore::new("primary", TextSource::new("p", dump(5)), ParseMode::Tolerant),
            DatasetStore::new(
                "summary",
                FileSource::new("/tmp/does-not-exist-loadtest-summary.dat"),
                ParseMode::Tolerant,
            ),
        );
        assert_eq!(m.refresh_all().len(), 1);

        let snap = m.snapshot().unwrap();
        assert_eq!(snap.primary_version, 1);
        assert_eq!(snap.summary_version, 0);
        assert_eq!(snap.time_series.unwrap().len(), 5);
        assert!(snap.load_settlement.is_some());
        assert!(snap.cycle_summary.is_none());
        assert!(snap.summary_table.is_none());
        assert_eq!(
            snap.latest_summary.as_deref(),
            Some("2024-01-01 10:04 - 500 kN, 50 %, Sett = 2.00 mm")
        );
    }

    #[test]
    fn test_snapshot_with_only_summary_loaded() {
        let m = monitor(3, 3);
        m.refresh_summary().unwrap();

        let snap = m.snapshot().unwrap();
        assert!(snap.time_series.is_none());
        assert!(snap.latest_summary.is_none());
        assert_eq!(snap.summary_table.unwrap().len(), 3);
    }

    // ── files ─────────────────────────────────────────────────────────────

    #[test]
    fn test_from_files_with_bad_refresh_keeps_previous() {
        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("LT2312_LT2312.dat");
        let summary = dir.path().join("LT2312_Sum.dat");
        std::fs::write(&primary, dump(6)).unwrap();
        std::fs::write(&summary, dump(9)).unwrap();

        let m = LoadTestMonitor::from_files(&primary, &summary, ParseMode::Tolerant);
        assert!(m.refresh_all().is_empty());

        std::fs::write(&primary, "\"TOA5\"\n").unwrap();
        std::fs::remove_file(&summary).unwrap();
        let failures = m.refresh_all();

        assert_eq!(failures.len(), 2);
        assert!(failures
            .iter()
            .all(|e| matches!(e, MonitorError::Refresh { .. })));
        assert_eq!(m.get_time_series().unwrap().len(), 6);
        assert_eq!(m.get_summary_table().unwrap().len(), 9);
    }
}
