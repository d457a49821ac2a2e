// src/device/registry.rs
//! Explicitly owned table of the devices a farm may drive

use crate::types::{DeviceIndex, DeviceKind};
use crate::utils::error::MinerError;
use serde::{Deserialize, Serialize};

/// Static description of one compute device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Stable index into the registry
    pub global_index: DeviceIndex,
    /// Display name used in reports (e.g. "GPU0")
    pub name: String,
    /// Device kind
    pub kind: DeviceKind,
    /// Disabled devices stay in the registry but get no worker
    pub enabled: bool,
    /// Global work size multiplier handed to the kernel
    pub global_work_mult: u32,
    /// Local work group size handed to the kernel
    pub local_work_size: u32,
    /// Substring matched against host sensor labels, if any
    pub sensor_label: Option<String>,
}

impl DeviceDescriptor {
    /// Creates an enabled device with default tuning
    pub fn new(global_index: DeviceIndex, name: impl Into<String>, kind: DeviceKind) -> Self {
        DeviceDescriptor {
            global_index,
            name: name.into(),
            kind,
            enabled: true,
            global_work_mult: 1,
            local_work_size: 64,
            sensor_label: None,
        }
    }

    /// Returns whether the device is a host CPU
    pub fn is_cpu(&self) -> bool {
        self.kind == DeviceKind::Cpu
    }
}

/// Ordered set of devices, indexed by [`DeviceIndex`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceRegistry {
    devices: Vec<DeviceDescriptor>,
}

impl DeviceRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a device, assigning it the next global index
    ///
    /// # Returns
    /// The index the device was registered under
    pub fn register(&mut self, mut device: DeviceDescriptor) -> DeviceIndex {
        let index = self.devices.len();
        device.global_index = index;
        self.devices.push(device);
        index
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_device(mut self, device: DeviceDescriptor) -> Self {
        self.register(device);
        self
    }

    /// Registers `count` enabled devices of `kind` named `<PREFIX><n>`
    pub fn with_devices(mut self, kind: DeviceKind, count: usize) -> Self {
        let prefix = match kind {
            DeviceKind::Gpu => "GPU",
            DeviceKind::Cpu => "CPU",
        };
        for _ in 0..count {
            let index = self.devices.len();
            self.register(DeviceDescriptor::new(index, format!("{}{}", prefix, index), kind));
        }
        self
    }

    /// Looks up a device
    pub fn get(&self, index: DeviceIndex) -> Result<&DeviceDescriptor, MinerError> {
        self.devices
            .get(index)
            .ok_or(MinerError::UnknownDevice(index))
    }

    /// Enables or disables a device
    pub fn set_enabled(&mut self, index: DeviceIndex, enabled: bool) -> Result<(), MinerError> {
        let device = self
            .devices
            .get_mut(index)
            .ok_or(MinerError::UnknownDevice(index))?;
        device.enabled = enabled;
        Ok(())
    }

    /// Indices of every enabled device, ascending
    pub fn enabled_indices(&self) -> Vec<DeviceIndex> {
        self.devices
            .iter()
            .filter(|d| d.enabled)
            .map(|d| d.global_index)
            .collect()
    }

    /// All devices in index order
    pub fn iter(&self) -> impl Iterator<Item = &DeviceDescriptor> {
        self.devices.iter()
    }

    /// Number of registered devices, enabled or not
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns whether no device is registered
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
