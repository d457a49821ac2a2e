// src/types.rs
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Global index of a device in the [`DeviceRegistry`](crate::device::DeviceRegistry)
pub type DeviceIndex = usize;

/// Kind of compute device driven by a worker
///
/// The kind decides how a device is reported: CPU devices hash like any other
/// device but carry no temperature/fan telemetry line.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Discrete or integrated GPU
    #[clap(name = "gpu")]
    Gpu,

    /// Host CPU thread
    #[clap(name = "cpu")]
    Cpu,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Gpu => write!(f, "gpu"),
            DeviceKind::Cpu => write!(f, "cpu"),
        }
    }
}

impl FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gpu" | "opencl" | "cuda" => Ok(DeviceKind::Gpu),
            "cpu" => Ok(DeviceKind::Cpu),
            _ => Err(format!("Unknown device kind: {}", s)),
        }
    }
}

/// Window policy for hash-rate queries
///
/// Decides whether reading a device's rate also closes its accounting window.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RateWindow {
    /// Every rate query schedules a fresh window (legacy behavior)
    #[default]
    #[clap(name = "reset-on-query")]
    ResetOnQuery,

    /// Queries are pure; windows restart only on explicit request or when
    /// the clock moves backwards
    #[clap(name = "continuous")]
    Continuous,
}

/// Outcome of submitting a solution, reported back by the submitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShareResult {
    /// The share was accepted as valid
    Accepted,
    /// The share was rejected (stale or invalid)
    Rejected,
    /// Submission itself failed (e.g. connection lost)
    Failed,
}
