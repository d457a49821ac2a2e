// src/miner/testing.rs
//! Test doubles for the worker and farm tests

use crate::miner::compute::{Computation, DeviceContext, StepReport};
use crate::miner::farm::FarmFace;
use crate::miner::work::{SolutionCandidate, WorkPackage};
use crate::types::DeviceIndex;
use crate::utils::error::DeviceFault;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Polls `condition` every millisecond until it holds or `timeout` passes
pub fn wait_for(condition: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}

/// What a [`ScriptedComputation`] has been asked to do so far
#[derive(Default)]
pub struct StepLog {
    steps: AtomicU64,
    resets: AtomicU64,
    last_job: Mutex<Option<String>>,
}

impl StepLog {
    pub fn count(&self) -> u64 {
        self.steps.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> u64 {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn last_job(&self) -> Option<String> {
        self.last_job.lock().unwrap().clone()
    }
}

/// Computation replaying a queue of reports, then a default report
pub struct ScriptedComputation {
    log: Arc<StepLog>,
    script: VecDeque<StepReport>,
    default_hashes: u64,
    panic_on_step: Option<u64>,
    fail_init: bool,
    emit_candidates: bool,
}

impl ScriptedComputation {
    pub fn new() -> Self {
        ScriptedComputation {
            log: Arc::new(StepLog::default()),
            script: VecDeque::new(),
            default_hashes: 0,
            panic_on_step: None,
            fail_init: false,
            emit_candidates: false,
        }
    }

    /// Queues `report` for the next unscripted step
    pub fn then(mut self, report: StepReport) -> Self {
        self.script.push_back(report);
        self
    }

    pub fn default_hashes(mut self, hashes: u64) -> Self {
        self.default_hashes = hashes;
        self
    }

    /// Panics on the given 1-based step
    pub fn panic_on_step(mut self, step: u64) -> Self {
        self.panic_on_step = Some(step);
        self
    }

    pub fn fail_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn with_candidate_every_step(mut self) -> Self {
        self.emit_candidates = true;
        self
    }

    pub fn steps(&self) -> Arc<StepLog> {
        self.log.clone()
    }
}

impl Computation for ScriptedComputation {
    fn init(&mut self, _ctx: &DeviceContext) -> Result<(), DeviceFault> {
        if self.fail_init {
            return Err(DeviceFault::new("init", "no such device"));
        }
        Ok(())
    }

    fn reset(&mut self, _work: &WorkPackage) {
        self.log.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn step(&mut self, work: &WorkPackage) -> StepReport {
        std::thread::sleep(Duration::from_millis(1));
        let step = self.log.count() + 1;
        if self.panic_on_step == Some(step) {
            panic!("kernel blew up on step {}", step);
        }

        *self.log.last_job.lock().unwrap() = Some(work.job_id().to_owned());
        let mut report = self
            .script
            .pop_front()
            .unwrap_or_else(|| StepReport::ok(self.default_hashes, Vec::new()));
        if self.emit_candidates {
            report.candidates.push(SolutionCandidate {
                job_id: work.job_id().to_owned(),
                nonce: step,
                hash: [0; 32],
            });
        }
        self.log.steps.fetch_add(1, Ordering::SeqCst);
        report
    }
}

/// Farm face that records what workers report
pub struct RecordingFarm {
    device_count: usize,
    solutions: Mutex<Vec<(DeviceIndex, SolutionCandidate)>>,
    failed: Mutex<Vec<DeviceIndex>>,
}

impl RecordingFarm {
    pub fn new(device_count: usize) -> Self {
        RecordingFarm {
            device_count,
            solutions: Mutex::new(Vec::new()),
            failed: Mutex::new(Vec::new()),
        }
    }

    pub fn solutions(&self) -> Vec<(DeviceIndex, SolutionCandidate)> {
        self.solutions.lock().unwrap().clone()
    }

    pub fn failed_devices(&self) -> Vec<DeviceIndex> {
        self.failed.lock().unwrap().clone()
    }
}

impl FarmFace for RecordingFarm {
    fn submit_solution(&self, device: DeviceIndex, candidate: SolutionCandidate) {
        self.solutions.lock().unwrap().push((device, candidate));
    }

    fn device_failed(&self, device: DeviceIndex, _fault: &DeviceFault) {
        self.failed.lock().unwrap().push(device);
    }

    fn device_count(&self) -> usize {
        self.device_count
    }
}
