// src/utils/error.rs
use std::io;
use thiserror::Error;

/// Main error type for the mining farm
///
/// Covers configuration, I/O and farm control failures. Device-level faults
/// raised while hashing are reported separately as [`DeviceFault`] so that
/// they never escape a worker thread.
#[derive(Error, Debug)]
pub enum MinerError {
    /// Configuration file or parameter errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Standard I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A worker thread could not be spawned
    #[error("Failed to spawn worker for device {device}: {source}")]
    SpawnError {
        /// Global index of the device
        device: usize,
        /// Underlying OS error
        source: io::Error,
    },

    /// A device index that the registry does not know
    #[error("Unknown device index: {0}")]
    UnknownDevice(usize),

    /// Invalid user input or parameter errors
    #[error("Invalid input: {0}")]
    InputError(String),
}

/// Converts hex decoding errors into MinerError
impl From<hex::FromHexError> for MinerError {
    fn from(e: hex::FromHexError) -> Self {
        MinerError::InputError(format!("Hex conversion failed: {}", e))
    }
}

/// Fault raised by a device computation
///
/// Whether a fault is retried or ends the worker is decided by the
/// [`StepOutcome`](crate::miner::compute::StepOutcome) that carries it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{context}: {message}")]
pub struct DeviceFault {
    /// Where the fault happened (e.g. "enqueue", "init")
    pub context: String,
    /// Driver or kernel supplied description
    pub message: String,
}

impl DeviceFault {
    /// Creates a fault with a short context label and a message
    pub fn new(context: impl Into<String>, message: impl Into<String>) -> Self {
        DeviceFault {
            context: context.into(),
            message: message.into(),
        }
    }
}
