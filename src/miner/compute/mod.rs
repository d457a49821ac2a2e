// src/miner/compute/mod.rs
//! Device computation interface
//!
//! The hashing kernel and its device-specific execution are opaque to the
//! farm. A worker only knows how to initialize a [`Computation`], tell it
//! when the package changed, and run one bounded step at a time.

/// Reference double SHA-256 kernel running on a host CPU thread
pub mod sha256d;

use crate::device::DeviceDescriptor;
use crate::miner::work::{SolutionCandidate, WorkPackage};
use crate::utils::error::DeviceFault;

pub use sha256d::Sha256dKernel;

/// Where a computation sits within the farm
#[derive(Debug, Clone)]
pub struct DeviceContext {
    /// Static description of the device
    pub device: DeviceDescriptor,
    /// Position among the farm's workers, starting at 0
    pub relative_index: usize,
    /// Number of workers in the farm
    pub device_count: usize,
}

/// How a step ended, as judged by the computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Keep going
    Continue,
    /// Transient fault; the worker logs it and runs the next step
    Recoverable(DeviceFault),
    /// The device is unusable; the worker stops
    Fatal(DeviceFault),
}

/// Result of one computation step
#[derive(Debug, Clone)]
pub struct StepReport {
    /// Hashes attempted during the step
    pub hashes: u64,
    /// Candidates that may satisfy the target
    pub candidates: Vec<SolutionCandidate>,
    /// Whether the device is still healthy
    pub outcome: StepOutcome,
}

impl StepReport {
    /// A healthy step
    pub fn ok(hashes: u64, candidates: Vec<SolutionCandidate>) -> Self {
        StepReport {
            hashes,
            candidates,
            outcome: StepOutcome::Continue,
        }
    }

    /// A step that hit a transient fault
    pub fn recoverable(hashes: u64, fault: DeviceFault) -> Self {
        StepReport {
            hashes,
            candidates: Vec::new(),
            outcome: StepOutcome::Recoverable(fault),
        }
    }

    /// A step after which the device must not be used again
    pub fn fatal(fault: DeviceFault) -> Self {
        StepReport {
            hashes: 0,
            candidates: Vec::new(),
            outcome: StepOutcome::Fatal(fault),
        }
    }
}

/// Per-device hashing backend driven by a worker thread
///
/// Every call happens on the worker's own thread. `step` must return within
/// a bounded time: the worker only observes pause and kill requests between
/// steps.
pub trait Computation: Send {
    /// Acquires device resources; an error is fatal for the device
    fn init(&mut self, ctx: &DeviceContext) -> Result<(), DeviceFault> {
        let _ = ctx;
        Ok(())
    }

    /// Discards in-flight state and resynchronizes with `work`
    ///
    /// Called before the first step on a package, after every package swap,
    /// and whenever the worker was marked dirty.
    fn reset(&mut self, work: &WorkPackage);

    /// Runs one batch against `work`
    fn step(&mut self, work: &WorkPackage) -> StepReport;
}

/// Builds the computation for a device; called once per worker
pub type ComputationFactory = dyn Fn(&DeviceDescriptor) -> Box<dyn Computation> + Send + Sync;
