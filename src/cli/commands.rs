// src/cli/commands.rs
use crate::types::RateWindow;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Farm Miner CLI - multi-device mining farm in Rust
#[derive(Parser, Debug)]
#[command(name = "farm-miner-rs")]
#[command(version, about, long_about = None)]
pub struct Commands {
    /// The action to perform (start the farm or generate config)
    #[command(subcommand)]
    pub action: Action,
}

/// Top-level commands for the miner application
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Start the farm with the specified options
    Start(StartOptions),

    /// Generate configuration file template
    Config(ConfigOptions),
}

/// Options for starting the farm
#[derive(Parser, Debug)]
pub struct StartOptions {
    /// Path to configuration file; built-in defaults are used when absent
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of CPU devices to drive (overrides config)
    #[arg(short, long)]
    pub devices: Option<usize>,

    /// Stop after this many seconds instead of running forever
    #[arg(long)]
    pub duration: Option<u64>,

    /// Rate window policy (overrides config)
    #[arg(long)]
    pub rate_window: Option<RateWindow>,

    /// Print the final snapshots as JSON
    #[arg(long)]
    pub json: bool,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    pub verbose: bool,
}

/// Options for generating configuration files
#[derive(Parser, Debug)]
pub struct ConfigOptions {
    /// Output file path
    #[arg(short, long, default_value = "config.toml")]
    pub output: PathBuf,

    /// Number of example GPU entries to include
    #[arg(short, long, default_value_t = 0)]
    pub gpus: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_overrides() {
        let cli = Commands::try_parse_from([
            "farm-miner-rs",
            "start",
            "--devices",
            "4",
            "--duration",
            "10",
            "--rate-window",
            "continuous",
            "--json",
        ])
        .expect("valid arguments");
        match cli.action {
            Action::Start(opts) => {
                assert_eq!(opts.devices, Some(4));
                assert_eq!(opts.duration, Some(10));
                assert_eq!(opts.rate_window, Some(RateWindow::Continuous));
                assert!(opts.json);
                assert!(opts.config.is_none());
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_defaults() {
        let cli = Commands::try_parse_from(["farm-miner-rs", "config"]).expect("valid arguments");
        match cli.action {
            Action::Config(opts) => {
                assert_eq!(opts.output, PathBuf::from("config.toml"));
                assert_eq!(opts.gpus, 0);
            }
            other => panic!("unexpected action {:?}", other),
        }
    }
}
