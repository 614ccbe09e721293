//! Data ingestion layer for the load-test monitor.
//!
//! Responsible for reading and parsing logger dumps into datasets, deriving
//! the time-series, load-settlement and cycle-summary views, and rendering
//! datasets as export tables.

pub mod export;
pub mod reader;
pub mod source;
pub mod transform;

pub use loadtest_core as core;
