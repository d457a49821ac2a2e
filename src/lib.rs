//! Farm Miner - worker-pool core of a multi-device mining engine
//!
//! This crate drives a farm of independent compute devices, each on its own
//! worker thread, against a shared, atomically replaceable work package:
//! - Per-device work handoff with pause/resume/kill
//! - Lock-free hash-rate accounting with resettable windows
//! - Fault isolation: one failing device never stops the others
//! - Farm-wide rate, share and temperature snapshots

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Device worker pool, farm coordinator and computation interface
pub mod miner;

/// Device registry and health sensors
pub mod device;

/// Events and atomic counters
pub mod sync;

/// Statistics snapshots and reporting
pub mod stats;

/// Utility functions and error handling
pub mod utils;

/// Command-line interface definitions
pub mod cli;

/// Configuration management
pub mod config;

/// Shared type definitions
pub mod types;

// Core exports
pub use cli::Commands;
pub use config::Config;
pub use device::{DeviceDescriptor, DeviceRegistry, HealthSensor, Telemetry};
pub use miner::{Computation, DeviceWorker, Farm, FarmFace, FarmOptions, WorkPackage};
pub use stats::{SolutionStats, StatsReporter, WorkingProgress};
pub use types::{DeviceKind, RateWindow, ShareResult};
pub use utils::{MinerError, init_logging};
