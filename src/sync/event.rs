// src/sync/event.rs
//! Two-state signal used to gate device workers
//!
//! An [`Event`] is either signaled or unsignaled. Waiters block on a condition
//! variable until the event is signaled, so an idle device thread costs no CPU.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// How a signaled event behaves once a waiter observes it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    /// Stays signaled until [`Event::reset`] is called; wakes every waiter.
    Manual,
    /// The first waiter to observe the signal consumes it; wakes one waiter.
    Auto,
}

/// Blocking set/unset signal built on a mutex and a condition variable
#[derive(Debug)]
pub struct Event {
    mode: ResetMode,
    done: Mutex<bool>,
    condition: Condvar,
}

impl Event {
    /// Creates an event in the given initial state
    ///
    /// # Arguments
    /// * `initially_set` - Whether the event starts signaled
    /// * `mode` - Manual or auto reset behavior
    pub fn new(initially_set: bool, mode: ResetMode) -> Self {
        Event {
            mode,
            done: Mutex::new(initially_set),
            condition: Condvar::new(),
        }
    }

    /// Creates an unsignaled manual-reset event
    pub fn manual() -> Self {
        Self::new(false, ResetMode::Manual)
    }

    /// Creates an unsignaled auto-reset event
    pub fn auto() -> Self {
        Self::new(false, ResetMode::Auto)
    }

    /// Returns the reset mode chosen at construction
    pub fn mode(&self) -> ResetMode {
        self.mode
    }

    /// Marks the event signaled and wakes waiters
    pub fn set_done(&self) {
        let mut done = self.lock();
        *done = true;
        match self.mode {
            ResetMode::Manual => self.condition.notify_all(),
            ResetMode::Auto => self.condition.notify_one(),
        }
    }

    /// Marks the event unsignaled; later waits block
    pub fn reset(&self) {
        *self.lock() = false;
    }

    /// Returns whether the event is currently signaled
    pub fn is_set(&self) -> bool {
        *self.lock()
    }

    /// Blocks until the event is signaled
    ///
    /// Returns immediately when already signaled. An auto-reset event is
    /// cleared again before returning.
    pub fn wait_until_done(&self) {
        let mut done = self.lock();
        while !*done {
            done = self
                .condition
                .wait(done)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if self.mode == ResetMode::Auto {
            *done = false;
        }
    }

    /// Blocks until the event is signaled or `timeout` elapses
    ///
    /// # Returns
    /// `true` if the signal was observed, `false` on timeout
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut done = self.lock();
        while !*done {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            done = self
                .condition
                .wait_timeout(done, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        if self.mode == ResetMode::Auto {
            *done = false;
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.done.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
