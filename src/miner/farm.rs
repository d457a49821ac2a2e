// src/miner/farm.rs
//! Farm coordinator
//!
//! The [`Farm`] owns one [`DeviceWorker`] per enabled device, broadcasts work
//! packages to them, queues the solutions they find and builds aggregate
//! snapshots. Workers only see the narrow [`FarmFace`].
//!
//! There is no farm-wide lock: a broadcast or a snapshot visits the workers
//! one at a time, each under its own synchronization.

use crate::device::{DeviceRegistry, HealthSensor, NoSensors};
use crate::miner::compute::ComputationFactory;
use crate::miner::meter::HashMeter;
use crate::miner::work::{SolutionCandidate, WorkPackage};
use crate::miner::worker::DeviceWorker;
use crate::stats::summary::{DeviceProgress, SolutionStats, WorkingProgress};
use crate::sync::Counter32;
use crate::types::{DeviceIndex, RateWindow, ShareResult};
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::error::{DeviceFault, MinerError};
use arc_swap::ArcSwapOption;
use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// What workers may ask of the farm
pub trait FarmFace: Send + Sync {
    /// Hands over a candidate found by `device`; never blocks
    fn submit_solution(&self, device: DeviceIndex, candidate: SolutionCandidate);

    /// Reports that `device` hit a fatal fault and its worker is exiting
    fn device_failed(&self, device: DeviceIndex, fault: &DeviceFault);

    /// Number of workers in the farm
    fn device_count(&self) -> usize;
}

/// A candidate tagged with the device that found it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoundSolution {
    /// Global index of the device
    pub device: DeviceIndex,
    /// The candidate itself
    pub candidate: SolutionCandidate,
}

/// Collaborators and policies used to build a [`Farm`]
#[derive(Clone)]
pub struct FarmOptions {
    /// Time source for hash-rate windows
    pub clock: Arc<dyn Clock>,
    /// Temperature/fan collaborator
    pub sensor: Arc<dyn HealthSensor>,
    /// Whether rate queries close the accounting window
    pub rate_window: RateWindow,
}

impl Default for FarmOptions {
    fn default() -> Self {
        FarmOptions {
            clock: Arc::new(SystemClock),
            sensor: Arc::new(NoSensors),
            rate_window: RateWindow::default(),
        }
    }
}

/// State the workers share with the farm
struct FarmShared {
    solutions: Sender<FoundSolution>,
    device_count: usize,
    active: Counter32,
}

impl FarmFace for FarmShared {
    fn submit_solution(&self, device: DeviceIndex, candidate: SolutionCandidate) {
        log::debug!(
            "device {} found nonce {:#x} for job {}",
            device,
            candidate.nonce,
            candidate.job_id
        );
        if let Err(err) = self.solutions.send(FoundSolution { device, candidate }) {
            log::warn!("device {}: solution dropped, farm is shutting down: {}", device, err);
        }
    }

    fn device_failed(&self, device: DeviceIndex, fault: &DeviceFault) {
        let remaining = self.active.decrement();
        log::error!(
            "device {} marked inactive ({}), {} of {} devices still mining",
            device,
            fault,
            remaining,
            self.device_count
        );
    }

    fn device_count(&self) -> usize {
        self.device_count
    }
}

/// Coordinator of all device workers
pub struct Farm {
    registry: DeviceRegistry,
    workers: Vec<Arc<DeviceWorker>>,
    shared: Arc<FarmShared>,
    latest: ArcSwapOption<WorkPackage>,
    solutions: Receiver<FoundSolution>,
    started_at: OnceLock<Instant>,
}

impl Farm {
    /// Builds one idle worker per enabled device
    ///
    /// # Arguments
    /// * `registry` - Devices to drive; disabled ones get no worker
    /// * `options` - Clock, sensor and rate-window policy
    /// * `factory` - Builds the computation backend of each device
    pub fn new(registry: DeviceRegistry, options: FarmOptions, factory: &ComputationFactory) -> Self {
        let workers: Vec<Arc<DeviceWorker>> = registry
            .iter()
            .filter(|d| d.enabled)
            .enumerate()
            .map(|(relative_index, device)| {
                let worker = DeviceWorker::new(
                    device.clone(),
                    factory(device),
                    HashMeter::new(options.clock.clone(), options.rate_window),
                    options.sensor.clone(),
                );
                worker.init_from_farm(relative_index);
                Arc::new(worker)
            })
            .collect();

        let (sender, receiver) = crossbeam_channel::unbounded();
        let shared = Arc::new(FarmShared {
            solutions: sender,
            device_count: workers.len(),
            active: Counter32::new(workers.len() as u32),
        });

        Farm {
            registry,
            workers,
            shared,
            latest: ArcSwapOption::empty(),
            solutions: receiver,
            started_at: OnceLock::new(),
        }
    }

    /// Starts every worker thread and the uptime clock
    pub fn start_all(&self) -> Result<(), MinerError> {
        self.started_at.get_or_init(Instant::now);
        let face: Arc<dyn FarmFace> = self.shared.clone();
        for worker in &self.workers {
            worker.start(face.clone())?;
        }
        log::info!("farm started with {} devices", self.workers.len());
        Ok(())
    }

    /// Publishes `work` to every active worker
    pub fn set_work(&self, work: impl Into<Arc<WorkPackage>>) {
        let work = work.into();
        log::info!("new work: {}", work);
        self.latest.store(Some(work.clone()));
        for worker in self.workers.iter().filter(|w| w.is_active()) {
            worker.set_work(work.clone());
        }
    }

    /// Asks every worker to resynchronize with its current package
    pub fn set_workpackage_dirty(&self) {
        self.workers.iter().for_each(|w| w.set_workpackage_dirty());
    }

    /// Latest package published through [`set_work`](Self::set_work)
    pub fn current_work(&self) -> Option<Arc<WorkPackage>> {
        self.latest.load_full()
    }

    /// Pauses every worker at its next iteration boundary
    pub fn pause_all(&self) {
        self.workers.iter().for_each(|w| w.pause());
        log::info!("farm paused");
    }

    /// Resumes every paused worker
    pub fn resume_all(&self) {
        self.workers.iter().for_each(|w| w.resume());
        log::info!("farm resumed");
    }

    /// Stops and joins every worker thread
    pub fn kill_all(&self) {
        self.workers.iter().for_each(|w| w.kill());
        log::info!("farm stopped");
    }

    /// Schedules a fresh hash-rate window on every worker
    pub fn request_hash_rate_reset(&self) {
        self.workers.iter().for_each(|w| w.request_hash_rate_reset());
    }

    /// Records the outcome of a solution submitted on behalf of `device`
    pub fn record_share_result(&self, device: DeviceIndex, result: ShareResult) -> Result<(), MinerError> {
        self.worker(device)?.record_share(result);
        Ok(())
    }

    /// Queue of candidates found by the workers
    pub fn solutions(&self) -> Receiver<FoundSolution> {
        self.solutions.clone()
    }

    /// Worker driving `device`
    pub fn worker(&self, device: DeviceIndex) -> Result<&Arc<DeviceWorker>, MinerError> {
        self.workers
            .iter()
            .find(|w| w.global_index() == device)
            .ok_or(MinerError::UnknownDevice(device))
    }

    /// Global indices of the devices still mining
    pub fn active_devices(&self) -> Vec<DeviceIndex> {
        self.workers
            .iter()
            .filter(|w| w.is_active())
            .map(|w| w.global_index())
            .collect()
    }

    /// Number of workers that have not failed
    pub fn healthy_count(&self) -> u32 {
        self.shared.active.get()
    }

    /// Devices known to the farm
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Time since [`start_all`](Self::start_all), zero before it
    pub fn uptime(&self) -> Duration {
        self.started_at
            .get()
            .map(Instant::elapsed)
            .unwrap_or_default()
    }

    /// Per-device and total hash rate of the active devices
    ///
    /// Reads each device's rate once; under
    /// [`RateWindow::ResetOnQuery`] this also starts new windows.
    pub fn working_progress(&self) -> WorkingProgress {
        let devices = self
            .workers
            .iter()
            .filter(|w| w.is_active())
            .map(|w| {
                let telemetry = w.telemetry();
                DeviceProgress {
                    global_index: w.global_index(),
                    name: w.device().name.clone(),
                    kind: w.device().kind,
                    hash_rate: w.hash_rate_per_sec(),
                    temperature: telemetry.temperature,
                    fan: telemetry.fan,
                }
            })
            .collect();
        WorkingProgress::new(devices)
    }

    /// Share counts per device, indexed by global index
    ///
    /// Failed devices are left out of the enabled set, so totals only cover
    /// devices still mining.
    pub fn solution_stats(&self) -> SolutionStats {
        let len = self.registry.len();
        let mut stats = SolutionStats {
            accepted: vec![0; len],
            rejected: vec![0; len],
            failed: vec![0; len],
            enabled: Vec::with_capacity(self.workers.len()),
            up_for: self.uptime(),
        };
        for worker in &self.workers {
            let index = worker.global_index();
            let (accepted, rejected, failed) = worker.share_counts();
            stats.accepted[index] = accepted;
            stats.rejected[index] = rejected;
            stats.failed[index] = failed;
            if worker.is_active() {
                stats.enabled.push(index);
            }
        }
        stats
    }
}

impl Drop for Farm {
    fn drop(&mut self) {
        self.kill_all();
    }
}
