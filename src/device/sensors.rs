// src/device/sensors.rs
//! Device health collaborators
//!
//! A missing sensor is not an error: it reads as zero temperature and zero
//! fan speed.

use crate::device::registry::DeviceDescriptor;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use sysinfo::Components;

/// One temperature/fan reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Degrees Celsius, 0 when unavailable
    pub temperature: u32,
    /// Fan speed percentage, 0 when unavailable
    pub fan: u32,
}

/// Source of per-device health readings
pub trait HealthSensor: Send + Sync {
    /// Reads the current temperature and fan speed of `device`
    fn query(&self, device: &DeviceDescriptor) -> Telemetry;
}

/// Sensor for hosts without any readable hardware monitor
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSensors;

impl HealthSensor for NoSensors {
    fn query(&self, _device: &DeviceDescriptor) -> Telemetry {
        Telemetry::default()
    }
}

/// Host hardware monitor backed by `sysinfo` components
///
/// Matches each device's `sensor_label` against component labels (for
/// example "amdgpu" or "nvidia"). Fan speed is not exposed by `sysinfo`
/// and always reads 0.
pub struct HostSensors {
    components: Mutex<Components>,
}

impl HostSensors {
    /// Enumerates host components
    pub fn new() -> Self {
        HostSensors {
            components: Mutex::new(Components::new_with_refreshed_list()),
        }
    }
}

impl Default for HostSensors {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthSensor for HostSensors {
    fn query(&self, device: &DeviceDescriptor) -> Telemetry {
        let Some(label) = device.sensor_label.as_deref() else {
            return Telemetry::default();
        };

        let mut components = self
            .components
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        components.refresh(true);

        let temperature = components
            .iter()
            .find(|c| c.label().contains(label))
            .and_then(|c| c.temperature())
            .filter(|t| t.is_finite() && *t > 0.0)
            .map(|t| t.round() as u32)
            .unwrap_or(0);

        Telemetry {
            temperature,
            fan: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeviceKind;

    #[test]
    fn test_no_sensors_reads_zero() {
        let device = DeviceDescriptor::new(0, "GPU0", DeviceKind::Gpu);
        assert_eq!(NoSensors.query(&device), Telemetry::default());
    }

    #[test]
    fn test_host_sensors_without_label_reads_zero() {
        let device = DeviceDescriptor::new(0, "GPU0", DeviceKind::Gpu);
        assert_eq!(
            HostSensors::new().query(&device),
            Telemetry::default(),
            "a device without a sensor label must degrade to zeros"
        );
    }
}
