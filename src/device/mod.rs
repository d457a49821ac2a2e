// src/device/mod.rs
//! Device inventory and health
//!
//! The [`DeviceRegistry`] is owned by whoever builds the farm and passed to
//! it explicitly; there is no process-wide device table.

/// Device descriptors and the registry that indexes them
pub mod registry;

/// Temperature and fan collaborators
pub mod sensors;

pub use registry::{DeviceDescriptor, DeviceRegistry};
pub use sensors::{HealthSensor, HostSensors, NoSensors, Telemetry};
