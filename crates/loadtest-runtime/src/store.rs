//! Snapshot-holding dataset store.
//!
//! A [`DatasetStore`] owns one [`Source`] and the most recent dataset parsed
//! from it. [`DatasetStore::refresh`] re-parses the source and, only when that
//! succeeds, swaps the new dataset in; a failed refresh leaves the previous
//! snapshot current. Readers hold an `Arc` to whatever snapshot was current
//! when they asked, so a concurrent swap never changes data under them.

use std::sync::Arc;
use std::time::{Duration, Instant};

use loadtest_core::error::{MonitorError, Result};
use loadtest_core::models::Dataset;
use loadtest_data::reader::{self, ParseMode};
use loadtest_data::source::Source;
use parking_lot::{Mutex, RwLock};

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// One successfully parsed version of the source.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Starts at 1 and increases by one on every successful refresh.
    pub version: u64,
    pub dataset: Arc<Dataset>,
    /// When the snapshot was swapped in.
    pub refreshed_at: Instant,
    /// Data lines dropped by the tolerant parser.
    pub skipped_lines: usize,
}

// ── DatasetStore ──────────────────────────────────────────────────────────────

/// Holds the latest dataset parsed from a single source.
///
/// # Example
/// ```no_run
/// use loadtest_data::reader::ParseMode;
/// use loadtest_data::source::FileSource;
/// use loadtest_runtime::store::DatasetStore;
///
/// let store = DatasetStore::new("primary", FileSource::new("LT2312.dat"), ParseMode::Tolerant);
/// if store.refresh().is_ok() {
///     println!("{} readings", store.current().unwrap().len());
/// }
/// ```
pub struct DatasetStore {
    /// Name used in logs and `NotReady` errors.
    name: &'static str,
    source: Box<dyn Source>,
    mode: ParseMode,
    snapshot: RwLock<Option<Snapshot>>,
    /// Serializes refreshes of this store.
    refresh_lock: Mutex<()>,
    /// Human-readable description of the last refresh failure.
    last_error: Mutex<Option<String>>,
}

impl DatasetStore {
    pub fn new(name: &'static str, source: impl Source + 'static, mode: ParseMode) -> Self {
        Self {
            name,
            source: Box::new(source),
            mode,
            snapshot: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            last_error: Mutex::new(None),
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Re-read and re-parse the source, swapping in the result on success.
    ///
    /// On failure the held snapshot is untouched and the cause is returned
    /// wrapped in [`MonitorError::Refresh`]. Concurrent calls queue behind
    /// each other; two refreshes of the same store never run at once.
    pub fn refresh(&self) -> Result<Arc<Dataset>> {
        let _in_flight = self.refresh_lock.lock();
        let started = Instant::now();

        let parsed = self
            .source
            .read_text()
            .and_then(|text| reader::parse(&text, self.mode).map_err(MonitorError::from));

        match parsed {
            Ok(parsed) => {
                let dataset = Arc::new(parsed.dataset);
                let skipped_lines = parsed.skipped.len();

                let version = {
                    let mut slot = self.snapshot.write();
                    let version = slot.as_ref().map_or(1, |s| s.version + 1);
                    *slot = Some(Snapshot {
                        version,
                        dataset: Arc::clone(&dataset),
                        refreshed_at: Instant::now(),
                        skipped_lines,
                    });
                    version
                };
                *self.last_error.lock() = None;

                tracing::debug!(
                    store = self.name,
                    version,
                    readings = dataset.len(),
                    skipped_lines,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "snapshot replaced"
                );
                Ok(dataset)
            }
            Err(e) => {
                tracing::warn!(
                    store = self.name,
                    source = %self.source.label(),
                    error = %e,
                    "refresh failed; keeping previous snapshot"
                );
                *self.last_error.lock() = Some(e.to_string());
                Err(MonitorError::Refresh {
                    source_name: self.source.label(),
                    source: Box::new(e),
                })
            }
        }
    }

    /// The most recently swapped-in dataset.
    pub fn current(&self) -> Result<Arc<Dataset>> {
        self.snapshot
            .read()
            .as_ref()
            .map(|s| Arc::clone(&s.dataset))
            .ok_or(MonitorError::NotReady(self.name))
    }

    /// The current snapshot with its metadata, if any refresh succeeded.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.snapshot.read().clone()
    }

    /// Version of the current snapshot; `0` before the first success.
    pub fn version(&self) -> u64 {
        self.snapshot.read().as_ref().map_or(0, |s| s.version)
    }

    /// Time since the current snapshot was swapped in.
    pub fn last_refresh_age(&self) -> Option<Duration> {
        self.snapshot.read().as_ref().map(|s| s.refreshed_at.elapsed())
    }

    /// Lines the tolerant parser dropped from the current snapshot.
    pub fn skipped_lines(&self) -> usize {
        self.snapshot.read().as_ref().map_or(0, |s| s.skipped_lines)
    }

    /// Description of the last refresh failure, cleared by the next success.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn source_label(&self) -> String {
        self.source.label()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
