// src/miner/worker.rs
//! Device worker thread
//!
//! One [`DeviceWorker`] drives one device. Its thread loops over computation
//! steps against the current [`WorkPackage`], gated by a manual-reset
//! [`Event`] that is set when work is published and reset on pause.
//!
//! Faults stay inside the worker: a recoverable fault is logged and the next
//! step runs, a fatal fault or a panic ends this thread only and marks the
//! device failed.

use crate::device::{DeviceDescriptor, HealthSensor, Telemetry};
use crate::miner::compute::{Computation, DeviceContext, StepOutcome};
use crate::miner::farm::FarmFace;
use crate::miner::meter::HashMeter;
use crate::miner::work::WorkPackage;
use crate::sync::{Counter32, Event};
use crate::types::{DeviceIndex, ShareResult};
use crate::utils::error::{DeviceFault, MinerError};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// Lifecycle of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Constructed, thread not started
    Idle = 0,
    /// Thread running the computation's `init`
    Initializing = 1,
    /// Stepping, or blocked waiting for the first package
    Running = 2,
    /// Blocked at the next iteration boundary
    Paused = 3,
    /// Stopped by a fatal fault or panic
    Failed = 4,
    /// Stopped on request
    Killed = 5,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Idle,
            1 => WorkerState::Initializing,
            2 => WorkerState::Running,
            3 => WorkerState::Paused,
            4 => WorkerState::Failed,
            _ => WorkerState::Killed,
        }
    }
}

/// Accepted/rejected/failed tallies for one device
#[derive(Debug, Default)]
struct ShareCounters {
    accepted: Counter32,
    rejected: Counter32,
    failed: Counter32,
}

/// Worker owning the thread of one compute device
pub struct DeviceWorker {
    device: DeviceDescriptor,
    relative_index: AtomicUsize,
    current_work: Mutex<Option<Arc<WorkPackage>>>,
    work_ready: Event,
    dirty: AtomicBool,
    stop: AtomicBool,
    state: AtomicU8,
    initializing: AtomicBool,
    initialized: AtomicBool,
    meter: HashMeter,
    shares: ShareCounters,
    recoverable_faults: Counter32,
    sensor: Arc<dyn HealthSensor>,
    computation: Mutex<Option<Box<dyn Computation>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl DeviceWorker {
    /// Creates an idle worker
    ///
    /// # Arguments
    /// * `device` - Device this worker drives
    /// * `computation` - Backend moved onto the worker thread at start
    /// * `meter` - Hash accounting for this device
    /// * `sensor` - Health collaborator for temperature/fan queries
    pub fn new(
        device: DeviceDescriptor,
        computation: Box<dyn Computation>,
        meter: HashMeter,
        sensor: Arc<dyn HealthSensor>,
    ) -> Self {
        DeviceWorker {
            device,
            relative_index: AtomicUsize::new(0),
            current_work: Mutex::new(None),
            work_ready: Event::manual(),
            dirty: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            state: AtomicU8::new(WorkerState::Idle as u8),
            initializing: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
            meter,
            shares: ShareCounters::default(),
            recoverable_faults: Counter32::new(0),
            sensor,
            computation: Mutex::new(Some(computation)),
            thread: Mutex::new(None),
        }
    }

    /// Records this worker's position among the farm's workers
    pub fn init_from_farm(&self, relative_index: usize) {
        self.relative_index.store(relative_index, Ordering::Release);
    }

    /// Spawns the worker thread
    ///
    /// Starting twice, or starting a killed worker, does nothing.
    pub fn start(self: &Arc<Self>, farm: Arc<dyn FarmFace>) -> Result<(), MinerError> {
        // Held until the handle is stored, so a concurrent kill either sees
        // the stop flag here first or finds the handle to join.
        let mut thread_slot = lock(&self.thread);
        if self.stop.load(Ordering::Acquire) {
            log::debug!("{}: not starting a killed worker", self.device.name);
            return Ok(());
        }
        let Some(computation) = lock(&self.computation).take() else {
            log::debug!("{}: already started", self.device.name);
            return Ok(());
        };

        let worker = Arc::clone(self);
        let handle = thread::Builder::new()
            .name(self.device.name.clone())
            .spawn(move || worker.work_loop(computation, farm))
            .map_err(|source| MinerError::SpawnError {
                device: self.device.global_index,
                source,
            })?;

        *thread_slot = Some(handle);
        log::info!("{}: worker started", self.device.name);
        Ok(())
    }

    fn work_loop(&self, mut computation: Box<dyn Computation>, farm: Arc<dyn FarmFace>) {
        self.set_state(WorkerState::Initializing);
        self.initializing.store(true, Ordering::Release);

        let ctx = DeviceContext {
            device: self.device.clone(),
            relative_index: self.relative_index(),
            device_count: farm.device_count(),
        };
        let init = panic::catch_unwind(AssertUnwindSafe(|| computation.init(&ctx)));
        self.initializing.store(false, Ordering::Release);

        match init {
            Ok(Ok(())) => self.initialized.store(true, Ordering::Release),
            Ok(Err(fault)) => return self.fail(farm.as_ref(), fault),
            Err(payload) => return self.fail(farm.as_ref(), panic_fault(payload)),
        }
        // A pause or kill requested during init wins over Running.
        let _ = self.state.compare_exchange(
            WorkerState::Initializing as u8,
            WorkerState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );

        let mut active: Option<Arc<WorkPackage>> = None;
        loop {
            if self.stop.load(Ordering::Acquire) {
                break;
            }
            self.work_ready.wait_until_done();
            if self.stop.load(Ordering::Acquire) {
                break;
            }

            let Some(work) = self.current_work() else {
                // Reset under the work lock so a concurrent set_work cannot
                // have its signal swallowed.
                let guard = lock(&self.current_work);
                if guard.is_none() {
                    self.work_ready.reset();
                }
                continue;
            };
            let swapped = active.as_ref().is_none_or(|a| !Arc::ptr_eq(a, &work));
            let dirty = self.dirty.swap(false, Ordering::AcqRel);
            if swapped || dirty {
                log::debug!("{}: resync on {}", self.device.name, work);
                computation.reset(&work);
                active = Some(Arc::clone(&work));
            }

            let report = match panic::catch_unwind(AssertUnwindSafe(|| computation.step(&work))) {
                Ok(report) => report,
                Err(payload) => return self.fail(farm.as_ref(), panic_fault(payload)),
            };

            self.add_hash_count(report.hashes);
            for candidate in report.candidates {
                farm.submit_solution(self.device.global_index, candidate);
            }

            match report.outcome {
                StepOutcome::Continue => {}
                StepOutcome::Recoverable(fault) => {
                    self.recoverable_faults.increment();
                    log::warn!("{}: transient fault, retrying: {}", self.device.name, fault);
                }
                StepOutcome::Fatal(fault) => return self.fail(farm.as_ref(), fault),
            }
        }

        self.set_state(WorkerState::Killed);
        log::info!("{}: worker stopped", self.device.name);
    }

    fn fail(&self, farm: &dyn FarmFace, fault: DeviceFault) {
        self.set_state(WorkerState::Failed);
        log::error!("{}: fatal device fault, worker exits: {}", self.device.name, fault);
        farm.device_failed(self.device.global_index, &fault);
    }

    /// Publishes a new package and wakes the worker
    ///
    /// A paused worker only stores the package; it runs against it once
    /// [`resume`](Self::resume) is called.
    pub fn set_work(&self, work: Arc<WorkPackage>) {
        let mut current = lock(&self.current_work);
        *current = Some(work);
        if self.state() != WorkerState::Paused {
            self.work_ready.set_done();
        }
    }

    /// Asks the worker to resynchronize with its current package before the
    /// next step
    pub fn set_workpackage_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Returns the package the next step will run against
    pub fn current_work(&self) -> Option<Arc<WorkPackage>> {
        lock(&self.current_work).clone()
    }

    /// Blocks the worker at its next iteration boundary
    pub fn pause(&self) {
        // Same lock as set_work, so a publish cannot slip its signal in
        // between the state change and the reset.
        let _current = lock(&self.current_work);
        self.transition(&[WorkerState::Running, WorkerState::Initializing], WorkerState::Paused);
        self.work_ready.reset();
    }

    /// Undoes [`pause`](Self::pause); a worker without work keeps waiting
    pub fn resume(&self) {
        let current = lock(&self.current_work);
        self.transition(&[WorkerState::Paused], WorkerState::Running);
        if current.is_some() {
            self.work_ready.set_done();
        }
    }

    /// Stops the worker thread and waits for it
    ///
    /// Safe to call on a worker that was never started or already stopped.
    pub fn kill(&self) {
        self.stop.store(true, Ordering::Release);
        self.work_ready.set_done();

        let handle = lock(&self.thread).take();
        match handle {
            Some(handle) if handle.thread().id() != thread::current().id() => {
                if handle.join().is_err() {
                    log::error!("{}: worker thread panicked", self.device.name);
                }
            }
            Some(_) => {}
            None => {
                // Never started: drop the computation so a later start is a no-op.
                lock(&self.computation).take();
                self.transition(&[WorkerState::Idle, WorkerState::Paused], WorkerState::Killed);
            }
        }
    }

    /// Accounts `hashes` in the current window, opening a new window first
    /// if a reset is pending
    pub fn add_hash_count(&self, hashes: u64) {
        if let Some(closed) = self.meter.add(hashes) {
            log::trace!("{}: window closed with {} hashes", self.device.name, closed);
        }
    }

    /// Drains a pending reset: zeroes the count and restarts the window
    pub fn try_reset_hash_count(&self) {
        self.meter.try_reset();
    }

    /// Schedules a fresh window for the next accounting operation
    pub fn request_hash_rate_reset(&self) {
        self.meter.request_reset();
    }

    /// Hashes per second over the current window
    ///
    /// Not a pure query under [`RateWindow::ResetOnQuery`](crate::types::RateWindow):
    /// each call schedules the next window.
    pub fn hash_rate_per_sec(&self) -> u64 {
        self.meter.rate_per_sec()
    }

    /// Hashes accounted in the current window
    pub fn hash_count(&self) -> u64 {
        self.meter.hash_count()
    }

    /// Reads temperature and fan speed; zeros when no sensor is available
    pub fn telemetry(&self) -> Telemetry {
        self.sensor.query(&self.device)
    }

    /// Tallies the outcome of a submitted solution
    pub fn record_share(&self, result: ShareResult) {
        match result {
            ShareResult::Accepted => self.shares.accepted.increment(),
            ShareResult::Rejected => self.shares.rejected.increment(),
            ShareResult::Failed => self.shares.failed.increment(),
        };
    }

    /// Accepted, rejected and failed share counts
    pub fn share_counts(&self) -> (u32, u32, u32) {
        (
            self.shares.accepted.get(),
            self.shares.rejected.get(),
            self.shares.failed.get(),
        )
    }

    /// Number of transient faults survived so far
    pub fn recoverable_faults(&self) -> u32 {
        self.recoverable_faults.get()
    }

    /// Device driven by this worker
    pub fn device(&self) -> &DeviceDescriptor {
        &self.device
    }

    /// Global index of the device
    pub fn global_index(&self) -> DeviceIndex {
        self.device.global_index
    }

    /// Position among the farm's workers
    pub fn relative_index(&self) -> usize {
        self.relative_index.load(Ordering::Acquire)
    }

    /// Current lifecycle state
    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether the computation's `init` is running
    pub fn is_initializing(&self) -> bool {
        self.initializing.load(Ordering::Acquire)
    }

    /// Whether the computation's `init` has succeeded
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Whether the device still counts toward farm aggregates
    pub fn is_active(&self) -> bool {
        !matches!(self.state(), WorkerState::Failed | WorkerState::Killed)
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn transition(&self, from: &[WorkerState], to: WorkerState) {
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                from.contains(&WorkerState::from_u8(current)).then_some(to as u8)
            });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_fault(payload: Box<dyn Any + Send>) -> DeviceFault {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned());
    DeviceFault::new("panic", message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceDescriptor, NoSensors};
    use crate::miner::compute::StepReport;
    use crate::miner::testing::{RecordingFarm, ScriptedComputation, wait_for};
    use crate::types::{DeviceKind, RateWindow};
    use crate::utils::clock::ManualClock;
    use std::time::Duration;

    fn worker_with(computation: ScriptedComputation) -> (Arc<ManualClock>, Arc<DeviceWorker>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let worker = Arc::new(DeviceWorker::new(
            DeviceDescriptor::new(0, "GPU0", DeviceKind::Gpu),
            Box::new(computation),
            HashMeter::new(clock.clone(), RateWindow::Continuous),
            Arc::new(NoSensors),
        ));
        (clock, worker)
    }

    fn package(job: &str) -> Arc<WorkPackage> {
        Arc::new(WorkPackage::new(job, vec![0; 4], [0xFF; 32]))
    }

    #[test]
    fn test_pause_then_kill_on_never_started_worker() {
        let (_clock, worker) = worker_with(ScriptedComputation::new());
        worker.pause();
        worker.kill();
        worker.kill();
        assert_eq!(worker.state(), WorkerState::Killed);
        assert!(
            worker.start(Arc::new(RecordingFarm::new(1))).is_ok(),
            "starting a killed worker is a no-op"
        );
        assert_eq!(worker.state(), WorkerState::Killed);
    }

    #[test]
    fn test_worker_waits_for_first_package() {
        let computation = ScriptedComputation::new();
        let steps = computation.steps();
        let (_clock, worker) = worker_with(computation);
        worker.start(Arc::new(RecordingFarm::new(1))).expect("spawn");

        assert!(wait_for(|| worker.state() == WorkerState::Running, Duration::from_secs(2)));
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(steps.count(), 0, "no step may run before work is published");

        worker.set_work(package("a"));
        assert!(wait_for(|| steps.count() > 0, Duration::from_secs(2)));
        worker.kill();
        assert_eq!(worker.state(), WorkerState::Killed);
    }

    #[test]
    fn test_set_work_is_observed_by_next_step() {
        let computation = ScriptedComputation::new();
        let steps = computation.steps();
        let (_clock, worker) = worker_with(computation);
        worker.start(Arc::new(RecordingFarm::new(1))).expect("spawn");

        for job in ["a", "b", "c"] {
            worker.set_work(package(job));
            let seen = steps.count();
            assert!(
                wait_for(|| steps.count() > seen + 1, Duration::from_secs(2)),
                "worker stalled on {}",
                job
            );
            assert_eq!(
                steps.last_job().as_deref(),
                Some(job),
                "a step after set_work must see the new package"
            );
        }
        assert!(steps.resets() >= 3, "every swap must reset the computation");
        worker.kill();
    }

    #[test]
    fn test_dirty_flag_resets_computation_once() {
        let computation = ScriptedComputation::new();
        let steps = computation.steps();
        let (_clock, worker) = worker_with(computation);
        worker.start(Arc::new(RecordingFarm::new(1))).expect("spawn");
        worker.set_work(package("a"));
        assert!(wait_for(|| steps.resets() == 1, Duration::from_secs(2)));

        worker.set_workpackage_dirty();
        assert!(wait_for(|| steps.resets() == 2, Duration::from_secs(2)));
        let seen = steps.count();
        assert!(wait_for(|| steps.count() > seen + 3, Duration::from_secs(2)));
        assert_eq!(steps.resets(), 2, "the flag is consumed by one resync");
        worker.kill();
    }

    #[test]
    fn test_paused_worker_does_not_step_or_count() {
        let computation = ScriptedComputation::new().default_hashes(10);
        let steps = computation.steps();
        let (_clock, worker) = worker_with(computation);
        worker.start(Arc::new(RecordingFarm::new(1))).expect("spawn");
        worker.set_work(package("a"));
        assert!(wait_for(|| steps.count() > 2, Duration::from_secs(2)));

        worker.pause();
        assert_eq!(worker.state(), WorkerState::Paused);
        // Let an in-flight step finish.
        std::thread::sleep(Duration::from_millis(30));
        let (count, hashes) = (steps.count(), worker.hash_count());
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(steps.count(), count, "paused worker must not step");
        assert_eq!(worker.hash_count(), hashes, "paused worker must not count");

        worker.resume();
        assert!(wait_for(|| steps.count() > count, Duration::from_secs(2)));
        worker.kill();
    }

    #[test]
    fn test_set_work_while_paused_keeps_worker_paused() {
        let computation = ScriptedComputation::new().default_hashes(10);
        let steps = computation.steps();
        let (_clock, worker) = worker_with(computation);
        worker.start(Arc::new(RecordingFarm::new(1))).expect("spawn");
        worker.set_work(package("a"));
        assert!(wait_for(|| steps.count() > 2, Duration::from_secs(2)));

        worker.pause();
        std::thread::sleep(Duration::from_millis(30));
        let (count, hashes) = (steps.count(), worker.hash_count());

        worker.set_work(package("b"));
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(worker.state(), WorkerState::Paused);
        assert_eq!(steps.count(), count, "publishing work must not undo a pause");
        assert_eq!(worker.hash_count(), hashes, "paused worker must not count");
        assert_eq!(
            worker.current_work().map(|w| w.job_id().to_owned()).as_deref(),
            Some("b"),
            "the package is stored while paused"
        );

        worker.resume();
        assert!(wait_for(|| steps.last_job().as_deref() == Some("b"), Duration::from_secs(2)));
        assert_eq!(worker.state(), WorkerState::Running);
        worker.kill();
    }

    #[test]
    fn test_kill_racing_start_never_leaks_thread() {
        for _ in 0..50 {
            let (_clock, worker) = worker_with(ScriptedComputation::new());
            let starter = {
                let worker = worker.clone();
                std::thread::spawn(move || worker.start(Arc::new(RecordingFarm::new(1))))
            };
            worker.kill();
            starter.join().expect("starter panicked").expect("spawn");

            assert!(
                lock(&worker.thread).is_none(),
                "a handle stored after kill would never be joined"
            );
            assert!(
                wait_for(|| worker.state() == WorkerState::Killed, Duration::from_secs(2)),
                "worker ended in {:?}",
                worker.state()
            );
        }
    }

    #[test]
    fn test_kill_unblocks_paused_worker() {
        let (_clock, worker) = worker_with(ScriptedComputation::new());
        worker.start(Arc::new(RecordingFarm::new(1))).expect("spawn");
        worker.set_work(package("a"));
        worker.pause();
        worker.kill();
        assert_eq!(worker.state(), WorkerState::Killed);
    }

    #[test]
    fn test_recoverable_fault_keeps_looping() {
        let computation = ScriptedComputation::new().then(StepReport::recoverable(
            5,
            DeviceFault::new("enqueue", "queue busy"),
        ));
        let steps = computation.steps();
        let (_clock, worker) = worker_with(computation);
        worker.start(Arc::new(RecordingFarm::new(1))).expect("spawn");
        worker.set_work(package("a"));

        assert!(wait_for(|| steps.count() > 3, Duration::from_secs(2)));
        assert_eq!(worker.recoverable_faults(), 1);
        assert_eq!(worker.state(), WorkerState::Running);
        worker.kill();
    }

    #[test]
    fn test_fatal_fault_ends_worker_and_notifies_farm() {
        let computation =
            ScriptedComputation::new().then(StepReport::fatal(DeviceFault::new("enqueue", "lost")));
        let (_clock, worker) = worker_with(computation);
        let farm = Arc::new(RecordingFarm::new(1));
        worker.start(farm.clone()).expect("spawn");
        worker.set_work(package("a"));

        assert!(wait_for(|| worker.state() == WorkerState::Failed, Duration::from_secs(2)));
        assert_eq!(farm.failed_devices(), vec![0]);
        assert!(!worker.is_active());
        worker.kill();
        assert_eq!(worker.state(), WorkerState::Failed, "kill keeps the failure visible");
    }

    #[test]
    fn test_panicking_step_is_contained() {
        let computation = ScriptedComputation::new().panic_on_step(2);
        let (_clock, worker) = worker_with(computation);
        let farm = Arc::new(RecordingFarm::new(1));
        worker.start(farm.clone()).expect("spawn");
        worker.set_work(package("a"));

        assert!(wait_for(|| worker.state() == WorkerState::Failed, Duration::from_secs(2)));
        assert_eq!(farm.failed_devices(), vec![0]);
        worker.kill();
    }

    #[test]
    fn test_init_failure_is_fatal() {
        let computation = ScriptedComputation::new().fail_init();
        let (_clock, worker) = worker_with(computation);
        worker.start(Arc::new(RecordingFarm::new(1))).expect("spawn");
        assert!(wait_for(|| worker.state() == WorkerState::Failed, Duration::from_secs(2)));
        assert!(!worker.is_initialized());
        assert!(!worker.is_initializing());
        worker.kill();
    }

    #[test]
    fn test_candidates_are_forwarded_to_farm() {
        let computation = ScriptedComputation::new().with_candidate_every_step();
        let steps = computation.steps();
        let (_clock, worker) = worker_with(computation);
        let farm = Arc::new(RecordingFarm::new(1));
        worker.start(farm.clone()).expect("spawn");
        worker.set_work(package("job-7"));

        assert!(wait_for(|| farm.solutions().len() >= 2, Duration::from_secs(2)));
        worker.kill();
        assert!(farm.solutions().iter().all(|(device, c)| *device == 0 && c.job_id == "job-7"));
        assert!(steps.count() >= 2);
    }

    #[test]
    fn test_hash_rate_over_window() {
        let (clock, worker) = worker_with(ScriptedComputation::new());
        worker.add_hash_count(400);
        worker.add_hash_count(100);
        clock.advance(2_000);
        assert_eq!(worker.hash_rate_per_sec(), 250);

        worker.request_hash_rate_reset();
        worker.try_reset_hash_count();
        assert_eq!(worker.hash_count(), 0);
    }

    #[test]
    fn test_hash_rate_zero_when_clock_moves_backwards() {
        let (clock, worker) = worker_with(ScriptedComputation::new());
        worker.add_hash_count(1_000);
        clock.set(500);
        assert_eq!(worker.hash_rate_per_sec(), 0);

        clock.set(3_000);
        worker.add_hash_count(30);
        assert_eq!(worker.hash_count(), 30, "anomaly must have opened a fresh window");
    }

    #[test]
    fn test_record_share() {
        let (_clock, worker) = worker_with(ScriptedComputation::new());
        worker.record_share(ShareResult::Accepted);
        worker.record_share(ShareResult::Accepted);
        worker.record_share(ShareResult::Failed);
        assert_eq!(worker.share_counts(), (2, 0, 1));
    }
}
