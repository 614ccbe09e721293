//! Shared building blocks for the load-test monitor.
//!
//! Holds the instrument record schema ([`models::Column`], [`models::Reading`],
//! [`models::Dataset`]), the error taxonomy, timestamp and number formatting,
//! and the command-line settings shared by the binary.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{FormatError, MonitorError, Result};
