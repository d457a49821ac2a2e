// src/stats/summary.rs
//! Frozen farm snapshots and their human-readable rollups
//!
//! Everything here works on copies taken by the farm, so no function in this
//! module touches live worker state.

use crate::types::{DeviceIndex, DeviceKind};
use crate::utils::format::{format_hashrate, format_uptime};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Sums `counts` over the `enabled` indices only
///
/// Indices missing from `counts` count as zero.
pub fn total_for(counts: &[u32], enabled: &[DeviceIndex]) -> u32 {
    enabled
        .iter()
        .map(|&i| counts.get(i).copied().unwrap_or(0))
        .sum()
}

/// Renders a total, followed by the per-device values when more than one
/// device is enabled and the total is non-zero: `5 (3 2)`
pub fn format_counts(counts: &[u32], enabled: &[DeviceIndex]) -> String {
    let total = total_for(counts, enabled);
    let mut out = total.to_string();
    if enabled.len() > 1 && total > 0 {
        let per_device: Vec<String> = enabled
            .iter()
            .map(|&i| counts.get(i).copied().unwrap_or(0).to_string())
            .collect();
        out.push_str(&format!(" ({})", per_device.join(" ")));
    }
    out
}

/// Share tallies per device, indexed by global device index
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SolutionStats {
    /// Accepted shares per device
    pub accepted: Vec<u32>,
    /// Rejected shares per device
    pub rejected: Vec<u32>,
    /// Failed submissions per device
    pub failed: Vec<u32>,
    /// Devices that count toward totals
    pub enabled: Vec<DeviceIndex>,
    /// Time since the farm started
    pub up_for: Duration,
}

impl SolutionStats {
    /// Accepted shares over enabled devices
    pub fn total_accepted(&self) -> u32 {
        total_for(&self.accepted, &self.enabled)
    }

    /// Rejected shares over enabled devices
    pub fn total_rejected(&self) -> u32 {
        total_for(&self.rejected, &self.enabled)
    }

    /// Failed submissions over enabled devices
    pub fn total_failed(&self) -> u32 {
        total_for(&self.failed, &self.enabled)
    }
}

impl fmt::Display for SolutionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Shares: Accepted {}  Rejected {}  Failed {}  Up for {}",
            format_counts(&self.accepted, &self.enabled),
            format_counts(&self.rejected, &self.enabled),
            format_counts(&self.failed, &self.enabled),
            format_uptime(self.up_for)
        )
    }
}

/// Rate and health of one active device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceProgress {
    /// Global device index
    pub global_index: DeviceIndex,
    /// Display name
    pub name: String,
    /// Device kind
    pub kind: DeviceKind,
    /// Hashes per second over the last window
    pub hash_rate: u64,
    /// Degrees Celsius, 0 when unavailable
    pub temperature: u32,
    /// Fan percentage, 0 when unavailable
    pub fan: u32,
}

/// Per-device and total hash rate, in device index order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkingProgress {
    /// Sum of the device rates
    pub total_hash_rate: u64,
    /// Active devices
    pub devices: Vec<DeviceProgress>,
}

impl WorkingProgress {
    /// Builds a snapshot, ordering devices by index and summing their rates
    pub fn new(mut devices: Vec<DeviceProgress>) -> Self {
        devices.sort_by_key(|d| d.global_index);
        WorkingProgress {
            total_hash_rate: devices.iter().map(|d| d.hash_rate).sum(),
            devices,
        }
    }

    /// `Temp: <name> <t>C <fan>%  ...` over non-CPU devices, or an empty
    /// string when there are none
    pub fn temperature_line(&self) -> String {
        let readings: Vec<String> = self
            .devices
            .iter()
            .filter(|d| d.kind != DeviceKind::Cpu)
            .map(|d| format!("{} {}C {}%", d.name, d.temperature, d.fan))
            .collect();
        if readings.is_empty() {
            String::new()
        } else {
            format!("Temp: {}", readings.join("  "))
        }
    }
}

impl fmt::Display for WorkingProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.devices.as_slice() {
            [single] => write!(
                f,
                "Total: {} {}",
                single.name,
                format_hashrate(single.hash_rate as f64)
            ),
            devices => {
                write!(f, "Total: {}", format_hashrate(self.total_hash_rate as f64))?;
                if devices.len() > 1 {
                    let per_device: Vec<String> = devices
                        .iter()
                        .map(|d| format!("{} {}", d.name, format_hashrate(d.hash_rate as f64)))
                        .collect();
                    write!(f, " ({})", per_device.join(" "))?;
                }
                Ok(())
            }
        }
    }
}
