// src/miner/compute/sha256d.rs
//! Reference CPU kernel
//!
//! Hashes `header || nonce_le` with double SHA-256. Each worker searches its
//! own slice of the nonce space, selected by its relative index, so devices
//! never duplicate work on the same package.

use super::{Computation, DeviceContext, StepReport};
use crate::miner::work::{SolutionCandidate, WorkPackage};
use crate::utils::error::DeviceFault;
use sha2::{Digest, Sha256};

/// Double SHA-256 over the header with an appended little-endian nonce
pub fn sha256d(header: &[u8], nonce: u64) -> [u8; 32] {
    let mut first = Sha256::new();
    first.update(header);
    first.update(nonce.to_le_bytes());
    Sha256::digest(first.finalize()).into()
}

/// CPU implementation of [`Computation`]
pub struct Sha256dKernel {
    batch_size: u64,
    slice_start: u64,
    slice_len: u64,
    cursor: u64,
}

impl Sha256dKernel {
    /// Creates a kernel hashing `batch_size` nonces per step
    pub fn new(batch_size: u64) -> Self {
        Sha256dKernel {
            batch_size: batch_size.max(1),
            slice_start: 0,
            slice_len: u64::MAX,
            cursor: 0,
        }
    }
}

impl Computation for Sha256dKernel {
    fn init(&mut self, ctx: &DeviceContext) -> Result<(), DeviceFault> {
        if ctx.device_count == 0 || ctx.relative_index >= ctx.device_count {
            return Err(DeviceFault::new(
                "init",
                format!(
                    "relative index {} outside farm of {}",
                    ctx.relative_index, ctx.device_count
                ),
            ));
        }
        self.slice_len = u64::MAX / ctx.device_count as u64;
        self.slice_start = self.slice_len * ctx.relative_index as u64;
        // Wider devices take proportionally larger batches.
        self.batch_size = self
            .batch_size
            .saturating_mul(u64::from(ctx.device.global_work_mult.max(1)));
        Ok(())
    }

    fn reset(&mut self, work: &WorkPackage) {
        self.cursor = 0;
        log::debug!(
            "kernel resync on {}, slice starts at {:#x}",
            work,
            work.start_nonce().wrapping_add(self.slice_start)
        );
    }

    fn step(&mut self, work: &WorkPackage) -> StepReport {
        let remaining = self.slice_len - self.cursor;
        if remaining == 0 {
            return StepReport::recoverable(
                0,
                DeviceFault::new("search", format!("nonce slice exhausted on job {}", work.job_id())),
            );
        }

        let count = self.batch_size.min(remaining);
        let base = work
            .start_nonce()
            .wrapping_add(self.slice_start)
            .wrapping_add(self.cursor);
        let candidates = (0..count)
            .filter_map(|i| {
                let nonce = base.wrapping_add(i);
                let hash = sha256d(work.header(), nonce);
                work.is_solution(&hash).then(|| SolutionCandidate {
                    job_id: work.job_id().to_owned(),
                    nonce,
                    hash,
                })
            })
            .collect();
        self.cursor += count;

        StepReport::ok(count, candidates)
    }
}
