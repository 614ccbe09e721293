//! Runtime layer of the load-test monitor.
//!
//! Holds the swap-on-success dataset stores, the pull interface the
//! presentation layer calls, and the interval scheduler that drives refreshes.

pub mod monitor;
pub mod scheduler;
pub mod store;

pub use loadtest_core as core;
pub use loadtest_data as data;
pub use monitor::{LoadTestMonitor, MonitorSnapshot};
pub use scheduler::{MonitorEvent, RefreshScheduler, SchedulerHandle};
pub use store::{DatasetStore, Snapshot};
