// src/sync/mod.rs
//! Synchronization primitives shared by the device workers
//!
//! - [`Event`]: blocking signal used for work availability, pause and kill
//! - [`Counter32`] / [`Counter64`]: lock-free counters and drainable flags

/// Blocking set/unset event with manual or auto reset
pub mod event;

/// Lock-free integer counters
pub mod atomic;

pub use atomic::{Counter32, Counter64};
pub use event::{Event, ResetMode};
