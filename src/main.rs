// src/main.rs
use clap::Parser;
use crossbeam_channel::RecvTimeoutError;
use farm_miner_rs::device::{DeviceDescriptor, HealthSensor, HostSensors, NoSensors};
use farm_miner_rs::miner::compute::{Computation, Sha256dKernel, sha256d::sha256d};
use farm_miner_rs::miner::{FoundSolution, WorkPackage};
use farm_miner_rs::utils::clock::SystemClock;
use farm_miner_rs::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main entry point for the farm miner
///
/// # Returns
/// - `Ok(())` on successful execution
/// - `Err(MinerError)` if any operation fails
fn main() -> Result<(), MinerError> {
    let cli = cli::Commands::parse();

    match cli.action {
        cli::Action::Start(opts) => start_farm(opts),
        cli::Action::Config(opts) => generate_config(opts),
    }
}

/// Runs the farm against a locally generated work package
///
/// # Operations
/// 1. Initializes logging
/// 2. Loads configuration and applies CLI overrides
/// 3. Starts one worker per enabled device and the stats reporter
/// 4. Validates every solution and tallies the share outcome
/// 5. Stops after `--duration`, or when every device has failed
fn start_farm(opts: cli::StartOptions) -> Result<(), MinerError> {
    if opts.verbose {
        utils::init_verbose_logging();
    } else {
        utils::init_logging();
    }

    let mut config = match &opts.config {
        Some(path) => config::load(path)?,
        None => Config::default(),
    };
    // Apply CLI overrides
    if let Some(devices) = opts.devices {
        config.devices.clear();
        config.cpu_devices = devices;
    }
    if let Some(rate_window) = opts.rate_window {
        config.rate_window = rate_window;
    }

    let sensor: Arc<dyn HealthSensor> = if config.host_sensors {
        Arc::new(HostSensors::new())
    } else {
        Arc::new(NoSensors)
    };
    let options = FarmOptions {
        clock: Arc::new(SystemClock),
        sensor,
        rate_window: config.rate_window,
    };
    let batch_size = config.batch_size;
    let factory = move |_: &DeviceDescriptor| -> Box<dyn Computation> {
        Box::new(Sha256dKernel::new(batch_size))
    };

    let farm = Arc::new(Farm::new(config.registry()?, options, &factory));
    let work = Arc::new(config.work_package()?);
    let solutions = farm.solutions();

    farm.start_all()?;
    farm.set_work(work.clone());

    let mut reporter = StatsReporter::new(
        farm.clone(),
        Duration::from_secs(config.report_interval_secs.max(1)),
    );
    reporter.start_reporting()?;

    let deadline = opts.duration.map(|secs| Instant::now() + Duration::from_secs(secs));
    loop {
        let timeout = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                remaining.min(Duration::from_secs(1))
            }
            None => Duration::from_secs(1),
        };

        match solutions.recv_timeout(timeout) {
            Ok(found) => validate_solution(&farm, &work, found)?,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if farm.healthy_count() == 0 {
            log::error!("every device has failed, stopping");
            break;
        }
    }

    reporter.stop();
    let progress = farm.working_progress();
    let shares = farm.solution_stats();
    farm.kill_all();

    if opts.json {
        let report = serde_json::json!({ "progress": progress, "shares": shares });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        log::info!("{}", progress);
        log::info!("{}", shares);
    }
    Ok(())
}

/// Re-hashes a candidate and records whether it holds up
///
/// Stands in for the pool/node submission, which lives outside this crate.
fn validate_solution(farm: &Farm, work: &WorkPackage, found: FoundSolution) -> Result<(), MinerError> {
    let candidate = &found.candidate;
    let hash = sha256d(work.header(), candidate.nonce);
    let result = if candidate.job_id == work.job_id() && hash == candidate.hash && work.is_solution(&hash) {
        ShareResult::Accepted
    } else {
        ShareResult::Rejected
    };

    log::info!(
        "device {} nonce {:#018x} hash {}: {:?}",
        found.device,
        candidate.nonce,
        hex::encode(hash),
        result
    );
    farm.record_share_result(found.device, result)
}

/// Generates configuration template file
///
/// # Operations
/// 1. Generates template content based on options
/// 2. Writes template to specified output file
fn generate_config(opts: cli::ConfigOptions) -> Result<(), MinerError> {
    let config = config::generate_template(opts.gpus);
    std::fs::write(opts.output, config)?;
    Ok(())
}
