// src/utils/mod.rs
//! Utilities module for common functionality
//!
//! Error types, logging setup, the injectable clock used for hash-rate
//! windows, and human-readable formatting helpers.

/// Error types and handling utilities
///
/// Contains [`MinerError`] for farm-level failures and [`DeviceFault`] for
/// faults raised inside a device computation.
pub mod error;

/// Logging configuration and utilities
pub mod logging;

/// Millisecond clocks for rate windows
pub mod clock;

/// Hash-rate and uptime formatting
pub mod format;

// Re-export for easier access
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DeviceFault, MinerError};
pub use logging::{init_logging, init_verbose_logging};
