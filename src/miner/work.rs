// src/miner/work.rs
//! Work packages and the solution candidates found against them

use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable unit of hashing work
///
/// Published as `Arc<WorkPackage>` and replaced wholesale; there is no way to
/// mutate a package once it has been built, so a worker can never observe a
/// half-updated one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkPackage {
    job_id: String,
    header: Vec<u8>,
    target: [u8; 32],
    start_nonce: u64,
}

impl WorkPackage {
    /// Creates a package
    ///
    /// # Arguments
    /// * `job_id` - Identifier echoed back with every solution
    /// * `header` - Header bytes the nonce is appended to
    /// * `target` - A hash strictly below this value is a solution
    pub fn new(job_id: impl Into<String>, header: Vec<u8>, target: [u8; 32]) -> Self {
        WorkPackage {
            job_id: job_id.into(),
            header,
            target,
            start_nonce: 0,
        }
    }

    /// Returns the package with a different starting nonce
    pub fn with_start_nonce(mut self, start_nonce: u64) -> Self {
        self.start_nonce = start_nonce;
        self
    }

    /// Builds a target with `bits` leading zero bits
    pub fn target_from_bits(bits: u32) -> [u8; 32] {
        let mut target = [0xFFu8; 32];
        let bits = bits.min(256) as usize;
        for (i, byte) in target.iter_mut().enumerate() {
            let covered = bits.saturating_sub(i * 8).min(8);
            *byte = if covered == 8 { 0 } else { 0xFF >> covered };
        }
        target
    }

    /// Job identifier
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Header bytes
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// Solution target
    pub fn target(&self) -> &[u8; 32] {
        &self.target
    }

    /// First nonce of the search space
    pub fn start_nonce(&self) -> u64 {
        self.start_nonce
    }

    /// Returns whether `hash` satisfies the target
    pub fn is_solution(&self, hash: &[u8; 32]) -> bool {
        hash < &self.target
    }
}

impl fmt::Display for WorkPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "job {} target {}",
            self.job_id,
            hex::encode(&self.target[..8])
        )
    }
}

/// Output of a computation step that may satisfy the package target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionCandidate {
    /// Job the candidate was found for
    pub job_id: String,
    /// Nonce that produced the hash
    pub nonce: u64,
    /// Resulting hash
    pub hash: [u8; 32],
}
