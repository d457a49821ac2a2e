// src/miner/mod.rs
//! Core mining functionality
//!
//! This module contains the device worker pool:
//! - Work packages and solution candidates
//! - Windowed hash accounting
//! - Per-device worker threads
//! - The farm coordinating them

/// Device computation interface and the reference CPU kernel
pub mod compute;

/// Farm coordinator
///
/// Owns the workers, broadcasts work packages, collects solutions and builds
/// aggregate snapshots.
pub mod farm;

/// Windowed hash counter
pub mod meter;

/// Work packages and solution candidates
pub mod work;

/// Worker thread implementation
///
/// Each worker drives one device: it waits for work, runs computation steps
/// and reports hashes and candidates back to the farm.
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main components for cleaner imports
pub use self::compute::{Computation, ComputationFactory, DeviceContext, StepOutcome, StepReport};
pub use self::farm::{Farm, FarmFace, FarmOptions, FoundSolution};
pub use self::meter::HashMeter;
pub use self::work::{SolutionCandidate, WorkPackage};
pub use self::worker::{DeviceWorker, WorkerState};
