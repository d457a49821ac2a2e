// src/config/mod.rs
//! Configuration management for the mining farm
//!
//! This module handles all configuration-related functionality including:
//! - Loading and parsing configuration files
//! - Generating configuration templates
//! - Building the device registry and the local work package
//!
//! The configuration uses TOML format.

/// Core configuration implementation
///
/// Contains the [`Config`] struct and related types that define
/// the farm's devices and policies.
pub mod config;

// Re-export key items for easy access
pub use config::{Config, DeviceConfig, WorkConfig};

use crate::utils::error::MinerError;
use std::path::PathBuf;

/// Loads farm configuration from a TOML file
///
/// # Arguments
/// * `path` - Path to the configuration file (anything convertible to PathBuf)
pub fn load(path: impl Into<PathBuf>) -> Result<Config, MinerError> {
    Config::load(path)
}

/// Generates a commented configuration template
///
/// # Arguments
/// * `gpus` - Number of example GPU entries to include
pub fn generate_template(gpus: usize) -> String {
    Config::generate_template(gpus)
}
