//! Statistics collection and reporting module
//!
//! - [`summary`]: frozen snapshots ([`SolutionStats`], [`WorkingProgress`])
//!   and the pure rollups that format them
//! - [`reporter`]: background thread logging those snapshots periodically
//!

/// Snapshot types and rollup/formatting functions
pub mod summary;

/// Submodule containing the statistics reporter implementation
///
/// The reporter snapshots the farm on a fixed interval and logs the rate,
/// share and temperature lines until it is stopped.
pub mod reporter;

// Re-export main components
pub use reporter::StatsReporter;
pub use summary::{DeviceProgress, SolutionStats, WorkingProgress};
