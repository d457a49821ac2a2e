// src/cli/mod.rs
//! Command-line interface

/// Argument definitions
pub mod commands;

pub use commands::{Action, Commands, ConfigOptions, StartOptions};
