//! Periodic refresh and clock ticks.
//!
//! [`RefreshScheduler`] runs two independent tokio tasks: a coarse loop that
//! refreshes both stores and publishes a [`MonitorSnapshot`], and a fine loop
//! that only publishes the wall-clock string. Both feed one `mpsc` channel so
//! the presentation layer consumes a single stream of [`MonitorEvent`]s.

use std::sync::Arc;
use std::time::Duration;

use loadtest_core::formatting::format_clock;
use loadtest_core::time_utils::local_now;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::monitor::{LoadTestMonitor, MonitorSnapshot};

/// Default period of the refresh loop.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Default period of the clock loop.
pub const DEFAULT_CLOCK_INTERVAL: Duration = Duration::from_secs(1);

// ── Public types ──────────────────────────────────────────────────────────────

/// One update for the presentation layer.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// Views recomputed after a refresh.
    Snapshot(Box<MonitorSnapshot>),
    /// A refresh tick ended with no data to show (e.g. nothing loaded yet).
    Unavailable(String),
    /// Current local time, `YYYY-MM-DD HH:MM:SS`.
    Clock(String),
}

// ── RefreshScheduler ──────────────────────────────────────────────────────────

/// Drives a [`LoadTestMonitor`] on two fixed intervals.
///
/// The refresh loop fires immediately on start and then every
/// `refresh_interval`; ticks missed while a refresh runs are skipped rather
/// than queued, so refreshes never pile up. Clock ticks never touch the
/// stores.
pub struct RefreshScheduler {
    monitor: Arc<LoadTestMonitor>,
    refresh_interval: Duration,
    clock_interval: Duration,
}

impl RefreshScheduler {
    pub fn new(
        monitor: Arc<LoadTestMonitor>,
        refresh_interval: Duration,
        clock_interval: Duration,
    ) -> Self {
        Self {
            monitor,
            refresh_interval,
            clock_interval,
        }
    }

    /// Scheduler with the 60 s refresh and 1 s clock periods.
    pub fn with_defaults(monitor: Arc<LoadTestMonitor>) -> Self {
        Self::new(monitor, DEFAULT_REFRESH_INTERVAL, DEFAULT_CLOCK_INTERVAL)
    }

    /// Spawn both loops.
    ///
    /// The loops stop by themselves once the receiver is dropped, or
    /// immediately through [`SchedulerHandle::abort`].
    pub fn start(self) -> (mpsc::Receiver<MonitorEvent>, SchedulerHandle) {
        let (tx, rx) = mpsc::channel(16);

        let refresh = tokio::spawn(refresh_loop(
            Arc::clone(&self.monitor),
            self.refresh_interval,
            tx.clone(),
        ));
        let clock = tokio::spawn(clock_loop(self.clock_interval, tx));

        (rx, SchedulerHandle { refresh, clock })
    }
}

// ── SchedulerHandle ───────────────────────────────────────────────────────────

/// Handle to the two background loops. Dropping it aborts them.
pub struct SchedulerHandle {
    refresh: JoinHandle<()>,
    clock: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn abort(&self) {
        self.refresh.abort();
        self.clock.abort();
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

// ── Loops ─────────────────────────────────────────────────────────────────────

async fn refresh_loop(
    monitor: Arc<LoadTestMonitor>,
    period: Duration,
    tx: mpsc::Sender<MonitorEvent>,
) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        if tx.is_closed() {
            tracing::debug!("event channel closed; stopping refresh loop");
            break;
        }

        // File reads and parsing block; keep them off the async workers.
        let m = Arc::clone(&monitor);
        let outcome = tokio::task::spawn_blocking(move || {
            let failures = m.refresh_all();
            (failures, m.snapshot())
        })
        .await;

        let event = match outcome {
            Ok((failures, snapshot)) => {
                if !failures.is_empty() {
                    tracing::info!(failed = failures.len(), "refresh tick kept stale data");
                }
                match snapshot {
                    Ok(snap) => MonitorEvent::Snapshot(Box::new(snap)),
                    Err(e) => MonitorEvent::Unavailable(e.to_string()),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "refresh task panicked");
                MonitorEvent::Unavailable(e.to_string())
            }
        };

        if tx.send(event).await.is_err() {
            tracing::debug!("receiver dropped; stopping refresh loop");
            break;
        }
    }
}

async fn clock_loop(period: Duration, tx: mpsc::Sender<MonitorEvent>) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let now = format_clock(&local_now());
        if tx.send(MonitorEvent::Clock(now)).await.is_err() {
            tracing::debug!("receiver dropped; stopping clock loop");
            break;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
