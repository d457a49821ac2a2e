// src/config/config.rs
use crate::{
    device::{DeviceDescriptor, DeviceRegistry},
    miner::WorkPackage,
    types::{DeviceKind, RateWindow},
    utils::error::MinerError,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for the mining farm
///
/// Lists the devices to drive, the accounting policy and the reporting
/// cadence. When `devices` is empty, `cpu_devices` host CPU devices are
/// registered instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Explicit device list, in global index order
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,

    /// Number of CPU devices used when no device list is given
    /// (default: number of CPU cores)
    #[serde(default = "default_cpu_devices")]
    pub cpu_devices: usize,

    /// Nonces hashed per computation step
    /// (default: 1000)
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    /// Seconds between periodic stats reports
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,

    /// Whether rate queries close the accounting window
    #[serde(default)]
    pub rate_window: RateWindow,

    /// Read device temperatures from host sensors
    #[serde(default)]
    pub host_sensors: bool,

    /// Locally generated work package
    #[serde(default)]
    pub work: WorkConfig,
}

/// One entry of the device list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Display name (e.g. "GPU0")
    pub name: String,
    /// Device kind
    pub kind: DeviceKind,
    /// Disabled devices are registered but get no worker
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Global work size multiplier
    #[serde(default = "default_global_work_mult")]
    pub global_work_mult: u32,
    /// Local work group size
    #[serde(default = "default_local_work_size")]
    pub local_work_size: u32,
    /// Substring of the host sensor label reporting this device
    #[serde(default)]
    pub sensor_label: Option<String>,
}

/// Parameters of the locally generated work package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkConfig {
    /// Job identifier
    #[serde(default = "default_job_id")]
    pub job_id: String,
    /// Header bytes, hex encoded
    #[serde(default)]
    pub header: String,
    /// Leading zero bits required of a solution
    #[serde(default = "default_difficulty_bits")]
    pub difficulty_bits: u32,
}

impl Default for WorkConfig {
    fn default() -> Self {
        WorkConfig {
            job_id: default_job_id(),
            header: String::new(),
            difficulty_bits: default_difficulty_bits(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            devices: Vec::new(),
            cpu_devices: default_cpu_devices(),
            batch_size: default_batch_size(),
            report_interval_secs: default_report_interval(),
            rate_window: RateWindow::default(),
            host_sensors: false,
            work: WorkConfig::default(),
        }
    }
}

fn default_cpu_devices() -> usize {
    num_cpus::get()
}

fn default_batch_size() -> u64 {
    1000
}

fn default_report_interval() -> u64 {
    60
}

fn default_enabled() -> bool {
    true
}

fn default_global_work_mult() -> u32 {
    1
}

fn default_local_work_size() -> u32 {
    64
}

fn default_job_id() -> String {
    "local".into()
}

fn default_difficulty_bits() -> u32 {
    16
}

impl Config {
    /// Loads configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Ok(Config)` - Successfully loaded configuration
    /// * `Err(MinerError)` - If file couldn't be read or parsed
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, MinerError> {
        let path = path.into();
        let config_str = std::fs::read_to_string(&path).map_err(|e| {
            MinerError::ConfigError(format!(
                "Failed to read config at {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml(&config_str)
    }

    /// Parses configuration from a TOML string
    pub fn from_toml(config_str: &str) -> Result<Self, MinerError> {
        toml::from_str(config_str)
            .map_err(|e| MinerError::ConfigError(format!("Invalid config format: {}", e)))
    }

    /// Builds the device registry described by this configuration
    ///
    /// # Returns
    /// * `Err(MinerError::ConfigError)` - If no device would be enabled
    pub fn registry(&self) -> Result<DeviceRegistry, MinerError> {
        let registry = if self.devices.is_empty() {
            DeviceRegistry::new().with_devices(DeviceKind::Cpu, self.cpu_devices)
        } else {
            self.devices
                .iter()
                .fold(DeviceRegistry::new(), |registry, d| {
                    let mut device = DeviceDescriptor::new(0, d.name.clone(), d.kind);
                    device.enabled = d.enabled;
                    device.global_work_mult = d.global_work_mult;
                    device.local_work_size = d.local_work_size;
                    device.sensor_label = d.sensor_label.clone();
                    registry.with_device(device)
                })
        };

        if registry.enabled_indices().is_empty() {
            return Err(MinerError::ConfigError("no enabled device configured".into()));
        }
        Ok(registry)
    }

    /// Builds the local work package
    pub fn work_package(&self) -> Result<WorkPackage, MinerError> {
        let header = hex::decode(self.work.header.trim())?;
        Ok(WorkPackage::new(
            self.work.job_id.clone(),
            header,
            WorkPackage::target_from_bits(self.work.difficulty_bits),
        ))
    }

    /// Generates a configuration template string
    ///
    /// # Arguments
    /// * `gpus` - Number of example GPU entries to include; 0 leaves the
    ///   device list out so CPU devices are used
    ///
    /// # Returns
    /// String containing a commented TOML configuration template
    pub fn generate_template(gpus: usize) -> String {
        let mut template = String::new();
        template.push_str("# Farm Miner Configuration\n\n");
        template.push_str("# CPU devices used when no [[devices]] are listed (default: core count)\n");
        template.push_str(&format!("cpu_devices = {}\n", default_cpu_devices()));
        template.push_str("# Nonces hashed per step\n");
        template.push_str("batch_size = 1000\n");
        template.push_str("# Seconds between stats reports\n");
        template.push_str("report_interval_secs = 60\n");
        template.push_str("# reset-on-query or continuous\n");
        template.push_str("rate_window = \"reset-on-query\"\n");
        template.push_str("# Read GPU temperatures from host sensors\n");
        template.push_str("host_sensors = false\n\n");

        template.push_str("[work]\n");
        template.push_str("job_id = \"local\"\n");
        template.push_str("# Hex encoded header the nonce is appended to\n");
        template.push_str("header = \"\"\n");
        template.push_str("difficulty_bits = 16\n");

        for i in 0..gpus {
            template.push_str("\n[[devices]]\n");
            template.push_str(&format!("name = \"GPU{}\"\n", i));
            template.push_str("kind = \"gpu\"\n");
            template.push_str("enabled = true\n");
            template.push_str("global_work_mult = 1\n");
            template.push_str("local_work_size = 64\n");
            template.push_str("sensor_label = \"amdgpu\"\n");
        }

        template
    }
}
