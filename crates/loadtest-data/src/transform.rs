//! Derived views over a [`Dataset`].
//!
//! Everything here is a pure function of its input: no I/O, no caching. Views
//! are rebuilt from the current snapshot each time they are requested.

use chrono::NaiveDateTime;
use loadtest_core::error::{MonitorError, Result};
use loadtest_core::formatting::{format_display_timestamp, format_fixed};
use loadtest_core::models::{Dataset, Reading};
use serde::Serialize;

/// Width of one load-percentage bucket.
pub const BUCKET_STEP: f64 = 25.0;

/// Highest bucket; anything above is clipped to it.
pub const BUCKET_MAX: f64 = 200.0;

/// Number of summary rows in the first loading cycle.
pub const FIRST_CYCLE_LEN: usize = 9;

/// Index of the peak-load row shared by both cycles.
pub const CYCLE_PIVOT_INDEX: usize = FIRST_CYCLE_LEN - 1;

// ── View types ────────────────────────────────────────────────────────────────

/// Load and corrected settlement against time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    pub timestamp: NaiveDateTime,
    pub load_kn: Option<f64>,
    pub s_cor: Option<f64>,
}

pub type TimeSeriesView = Vec<TimeSeriesPoint>;

/// One point on the load-settlement curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadSettlementPoint {
    pub load_kn: Option<f64>,
    pub s_cor: Option<f64>,
}

pub type LoadSettlementView = Vec<LoadSettlementPoint>;

/// A summary-log row with its load percentage bucketed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub timestamp: NaiveDateTime,
    pub load_kn: Option<f64>,
    pub load_pct: Option<f64>,
    pub s_cor: Option<f64>,
}

impl From<&Reading> for SummaryRow {
    fn from(r: &Reading) -> Self {
        Self {
            timestamp: r.timestamp,
            load_kn: r.load_kn,
            load_pct: r.load_pct.map(bucket_load_pct),
            s_cor: r.s_cor,
        }
    }
}

/// Every summary-log row, bucketed, in time order.
pub type SummaryTable = Vec<SummaryRow>;

/// Summary log split into the two loading cycles of a cyclic test.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleSummaryView {
    pub first_cycle: Vec<SummaryRow>,
    /// Starts with the pivot row when present.
    pub second_cycle: Vec<SummaryRow>,
}

// ── Transformations ───────────────────────────────────────────────────────────

/// Project every reading onto `(timestamp, load, settlement)`, keeping order.
pub fn time_series(dataset: &Dataset) -> TimeSeriesView {
    dataset
        .iter()
        .map(|r| TimeSeriesPoint {
            timestamp: r.timestamp,
            load_kn: r.load_kn,
            s_cor: r.s_cor,
        })
        .collect()
}

/// Project every reading onto `(load, settlement)`.
///
/// Points stay in dataset (time) order so that loading and unloading branches
/// of the curve remain distinguishable; they are not sorted by load.
pub fn load_settlement(dataset: &Dataset) -> LoadSettlementView {
    dataset
        .iter()
        .map(|r| LoadSettlementPoint {
            load_kn: r.load_kn,
            s_cor: r.s_cor,
        })
        .collect()
}

/// Snap a load percentage to the nearest multiple of 25, within `[0, 200]`.
///
/// Ties round to even, so `12.5` goes to `0` and `37.5` to `50`. Applying the
/// function to its own output returns the same value. `NaN` is a missing value
/// and comes back unchanged.
///
/// # Examples
///
/// ```
/// use loadtest_data::transform::bucket_load_pct;
///
/// assert_eq!(bucket_load_pct(37.0), 25.0);
/// assert_eq!(bucket_load_pct(213.0), 200.0);
/// assert_eq!(bucket_load_pct(bucket_load_pct(61.0)), bucket_load_pct(61.0));
/// ```
pub fn bucket_load_pct(load_pct: f64) -> f64 {
    if load_pct.is_nan() {
        return load_pct;
    }
    let bucket = (load_pct / BUCKET_STEP).round_ties_even() * BUCKET_STEP;
    if bucket <= 0.0 {
        0.0
    } else {
        bucket.min(BUCKET_MAX)
    }
}

/// Every summary row with its load percentage bucketed.
pub fn summary_table(summary: &Dataset) -> SummaryTable {
    summary.iter().map(SummaryRow::from).collect()
}

/// Split the summary log into first and second loading cycles.
///
/// The first cycle is the first [`FIRST_CYCLE_LEN`] rows; the second starts at
/// [`CYCLE_PIVOT_INDEX`], so the peak-load row belongs to both. With fewer
/// rows than a full first cycle, everything is first cycle.
pub fn cycle_summary(summary: &Dataset) -> CycleSummaryView {
    let rows = summary_table(summary);
    if rows.len() < FIRST_CYCLE_LEN {
        return CycleSummaryView {
            first_cycle: rows,
            second_cycle: Vec::new(),
        };
    }

    CycleSummaryView {
        first_cycle: rows[..FIRST_CYCLE_LEN].to_vec(),
        second_cycle: rows[CYCLE_PIVOT_INDEX..].to_vec(),
    }
}

/// One-line description of the most recent reading.
///
/// `"2024-01-01 10:00 - 1234 kN, 56 %, Sett = 12.35 mm"`
pub fn latest_reading_summary(dataset: &Dataset) -> Result<String> {
    let last = dataset.last().ok_or(MonitorError::EmptyDataset)?;
    Ok(format!(
        "{} - {} kN, {} %, Sett = {} mm",
        format_display_timestamp(&last.timestamp),
        format_fixed(last.load_kn, 0),
        format_fixed(last.load_pct, 0),
        format_fixed(last.s_cor, 2),
    ))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn ts(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, minute, 0)
            .unwrap()
    }

    fn reading(record_id: i64, minute: u32, load_kn: f64, load_pct: f64, s_cor: f64) -> Reading {
        Reading {
            timestamp: ts(minute),
            record_id,
            battery: Some(12.6),
            temperature: None,
            load_kn: Some(load_kn),
            load_pct: Some(load_pct),
            s1: None,
            s2: None,
            s3: None,
            s4: None,
            s_avg: None,
            rb_mov: None,
            s_cor: Some(s_cor),
        }
    }

    /// A cyclic test: load to 100 %, unload, reload to 200 %.
    fn summary_dataset(n: usize) -> Dataset {
        let pcts = [
            0.0, 24.0, 51.0, 74.0, 99.0, 76.0, 49.0, 26.0, 101.0, 126.0, 151.0, 174.0, 199.0,
            212.0,
        ];
        let rows = (0..n)
            .map(|i| {
                let pct = pcts[i % pcts.len()];
                reading(i as i64 + 1, i as u32, pct * 40.0, pct, pct / 10.0)
            })
            .collect();
        Dataset::new(rows).unwrap()
    }

    // ── time_series / load_settlement ─────────────────────────────────────────

    #[test]
    fn test_time_series_preserves_count_and_order() {
        let ds = summary_dataset(12);
        let view = time_series(&ds);
        assert_eq!(view.len(), 12);
        assert!(view.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(view[3].load_kn, ds.readings()[3].load_kn);
        assert_eq!(view[3].s_cor, ds.readings()[3].s_cor);
    }

    #[test]
    fn test_load_settlement_not_sorted_by_load() {
        let ds = summary_dataset(8);
        let view = load_settlement(&ds);
        assert_eq!(view.len(), 8);
        let loads: Vec<f64> = view.iter().map(|p| p.load_kn.unwrap()).collect();
        let expected: Vec<f64> = ds.iter().map(|r| r.load_kn.unwrap()).collect();
        assert_eq!(loads, expected);
        // Unloading branch is still present after the peak.
        assert!(loads[5] < loads[4]);
    }

    #[test]
    fn test_views_keep_missing_values() {
        let mut r = reading(1, 0, 10.0, 1.0, 0.5);
        r.load_kn = None;
        r.s_cor = None;
        let ds = Dataset::new(vec![r]).unwrap();
        assert_eq!(time_series(&ds)[0].load_kn, None);
        assert_eq!(load_settlement(&ds)[0].s_cor, None);
    }

    #[test]
    fn test_views_of_empty_dataset() {
        let ds = Dataset::empty();
        assert!(time_series(&ds).is_empty());
        assert!(load_settlement(&ds).is_empty());
        assert_eq!(cycle_summary(&ds), CycleSummaryView::default());
    }

    // ── bucket_load_pct ───────────────────────────────────────────────────────

    #[test]
    fn test_bucket_examples() {
        assert_eq!(bucket_load_pct(37.0), 25.0);
        assert_eq!(bucket_load_pct(213.0), 200.0);
        assert_eq!(bucket_load_pct(0.0), 0.0);
        assert_eq!(bucket_load_pct(99.4), 100.0);
        assert_eq!(bucket_load_pct(187.6), 200.0);
    }

    #[test]
    fn test_bucket_ties_round_to_even() {
        assert_eq!(bucket_load_pct(12.5), 0.0);
        assert_eq!(bucket_load_pct(37.5), 50.0);
        assert_eq!(bucket_load_pct(62.5), 50.0);
        assert_eq!(bucket_load_pct(87.5), 100.0);
    }

    #[test]
    fn test_bucket_negative_clamps_to_zero() {
        assert_eq!(bucket_load_pct(-20.0), 0.0);
        assert!(bucket_load_pct(-5.0).is_sign_positive());
    }

    #[test]
    fn test_bucket_nan_stays_missing() {
        assert!(bucket_load_pct(f64::NAN).is_nan());
    }

    #[test]
    fn test_bucket_idempotent_and_in_range() {
        let allowed: Vec<f64> = (0..=8).map(|k| k as f64 * 25.0).collect();
        let mut x = -60.0;
        while x <= 400.0 {
            let b = bucket_load_pct(x);
            assert_eq!(bucket_load_pct(b), b, "not idempotent at {x}");
            assert!(allowed.contains(&b), "{b} out of range for {x}");
            x += 0.7;
        }
    }

    // ── cycle_summary ─────────────────────────────────────────────────────────

    #[test]
    fn test_cycle_split_shares_pivot() {
        let ds = summary_dataset(14);
        let view = cycle_summary(&ds);
        assert_eq!(view.first_cycle.len(), 9);
        assert_eq!(view.second_cycle.len(), 6);
        assert_eq!(view.first_cycle[8], view.second_cycle[0]);
        assert_eq!(view.first_cycle[8].load_pct, Some(100.0));
    }

    #[test]
    fn test_cycle_split_exactly_nine_rows() {
        let view = cycle_summary(&summary_dataset(9));
        assert_eq!(view.first_cycle.len(), 9);
        assert_eq!(view.second_cycle.len(), 1);
        assert_eq!(view.first_cycle[8], view.second_cycle[0]);
    }

    #[test]
    fn test_cycle_split_short_dataset() {
        let ds = summary_dataset(5);
        let view = cycle_summary(&ds);
        assert_eq!(view.first_cycle, summary_table(&ds));
        assert!(view.second_cycle.is_empty());
    }

    #[test]
    fn test_cycle_rows_are_bucketed() {
        let view = cycle_summary(&summary_dataset(14));
        let pcts: Vec<f64> = view
            .first_cycle
            .iter()
            .map(|r| r.load_pct.unwrap())
            .collect();
        assert_eq!(
            pcts,
            vec![0.0, 25.0, 50.0, 75.0, 100.0, 75.0, 50.0, 25.0, 100.0]
        );
        assert_eq!(view.second_cycle.last().unwrap().load_pct, Some(200.0));
    }

    #[test]
    fn test_summary_table_keeps_missing_pct() {
        let mut r = reading(1, 0, 10.0, 1.0, 0.5);
        r.load_pct = None;
        let table = summary_table(&Dataset::new(vec![r]).unwrap());
        assert_eq!(table[0].load_pct, None);
    }

    // ── latest_reading_summary ────────────────────────────────────────────────

    #[test]
    fn test_latest_summary_exact_format() {
        let ds = Dataset::new(vec![
            reading(1, 0, 10.0, 1.0, 0.1),
            reading(2, 0, 1234.0, 56.0, 12.345),
        ])
        .unwrap();
        assert_eq!(
            latest_reading_summary(&ds).unwrap(),
            "2024-01-01 10:00 - 1234 kN, 56 %, Sett = 12.35 mm"
        );
    }

    #[test]
    fn test_latest_summary_missing_values() {
        let mut r = reading(1, 30, 0.0, 0.0, 0.0);
        r.s_cor = None;
        let ds = Dataset::new(vec![r]).unwrap();
        assert_eq!(
            latest_reading_summary(&ds).unwrap(),
            "2024-01-01 10:30 - 0 kN, 0 %, Sett = NAN mm"
        );
    }

    #[test]
    fn test_latest_summary_empty_dataset() {
        let err = latest_reading_summary(&Dataset::empty()).unwrap_err();
        assert!(matches!(err, MonitorError::EmptyDataset));
    }
}
