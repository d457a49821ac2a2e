// src/miner/meter.rs
//! Windowed hash accounting for one device
//!
//! A window is opened by draining the `reset_pending` flag with an exchange.
//! The count itself is swapped, not stored, so an `add` racing with the
//! window change lands either in the closed window or in the new one and is
//! never lost or counted twice.

use crate::sync::{Counter32, Counter64};
use crate::types::RateWindow;
use crate::utils::clock::Clock;
use std::sync::Arc;

/// Hash counter with a resettable time window
pub struct HashMeter {
    clock: Arc<dyn Clock>,
    policy: RateWindow,
    hash_count: Counter64,
    window_start: Counter64,
    /// Set once the first window has been opened
    window_open: Counter32,
    reset_pending: Counter32,
}

impl HashMeter {
    /// Creates a meter whose first accounting operation opens the first window
    pub fn new(clock: Arc<dyn Clock>, policy: RateWindow) -> Self {
        HashMeter {
            clock,
            policy,
            hash_count: Counter64::new(0),
            window_start: Counter64::new(0),
            window_open: Counter32::new(0),
            reset_pending: Counter32::new(1),
        }
    }

    /// Accounts `hashes`, opening a new window first if one was requested
    ///
    /// # Returns
    /// The total of the window that was closed, if this call closed one
    pub fn add(&self, hashes: u64) -> Option<u64> {
        if self.reset_pending.set(0) != 0 {
            let closed = self.hash_count.set(hashes);
            self.open_window();
            Some(closed)
        } else {
            self.hash_count.add(hashes);
            None
        }
    }

    /// Drains a pending reset; zeroes the count and restarts the clock
    ///
    /// # Returns
    /// The total of the closed window, or `None` when nothing was pending
    pub fn try_reset(&self) -> Option<u64> {
        if self.reset_pending.set(0) != 0 {
            let closed = self.hash_count.set(0);
            self.open_window();
            Some(closed)
        } else {
            None
        }
    }

    fn open_window(&self) {
        self.window_start.set(self.clock.now_millis());
        self.window_open.set(1);
    }

    /// Schedules a new window for the next accounting operation
    pub fn request_reset(&self) {
        self.reset_pending.set(1);
    }

    /// Returns whether a reset is scheduled and not yet drained
    pub fn reset_pending(&self) -> bool {
        self.reset_pending.get() != 0
    }

    /// Hashes accounted in the current window
    pub fn hash_count(&self) -> u64 {
        self.hash_count.get()
    }

    /// Hashes per second over the current window
    ///
    /// Returns 0 while no window is open, and 0 with a forced reset when the
    /// clock reads at or before the window start. Under
    /// [`RateWindow::ResetOnQuery`] every query also schedules a new window.
    pub fn rate_per_sec(&self) -> u64 {
        if self.window_open.get() == 0 {
            return 0;
        }
        let start = self.window_start.get();

        let elapsed_ms = self.clock.now_millis() as i64 - start as i64;
        if elapsed_ms <= 0 {
            log::debug!("clock did not advance since window start, restarting window");
            self.request_reset();
            return 0;
        }

        let rate = (self.hash_count.get() as f64 * 1000.0 / elapsed_ms as f64).round() as u64;
        if self.policy == RateWindow::ResetOnQuery {
            self.request_reset();
        }
        rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::ManualClock;
    use std::thread;

    fn meter(policy: RateWindow) -> (Arc<ManualClock>, HashMeter) {
        let clock = Arc::new(ManualClock::new(10_000));
        (clock.clone(), HashMeter::new(clock, policy))
    }

    #[test]
    fn test_first_add_opens_window() {
        let (clock, m) = meter(RateWindow::Continuous);
        assert_eq!(m.rate_per_sec(), 0, "no window yet");
        assert_eq!(m.add(500), Some(0));
        assert_eq!(m.add(500), None);
        clock.advance(2_000);
        assert_eq!(m.rate_per_sec(), 500);
    }

    #[test]
    fn test_window_opens_at_time_zero() {
        let clock = Arc::new(ManualClock::new(0));
        let m = HashMeter::new(clock.clone(), RateWindow::Continuous);
        m.add(300);
        clock.advance(1_000);
        assert_eq!(m.rate_per_sec(), 300, "a window started at 0 ms is still a window");
    }

    #[test]
    fn test_add_after_reset_starts_fresh_window() {
        let (clock, m) = meter(RateWindow::Continuous);
        m.add(1_000);
        m.request_reset();
        clock.advance(1_000);
        assert_eq!(m.add(7), Some(1_000), "reset must close the previous window");
        assert_eq!(m.hash_count(), 7, "only additions after the reset count");
    }

    #[test]
    fn test_try_reset_is_idempotent() {
        let (_clock, m) = meter(RateWindow::Continuous);
        m.add(10);
        assert_eq!(m.try_reset(), None, "nothing pending");
        assert_eq!(m.hash_count(), 10);
        m.request_reset();
        assert_eq!(m.try_reset(), Some(10));
        assert_eq!(m.try_reset(), None);
        assert_eq!(m.hash_count(), 0);
    }

    #[test]
    fn test_clock_backwards_reads_zero_and_forces_reset() {
        let (clock, m) = meter(RateWindow::Continuous);
        m.add(100);
        clock.set(9_000);
        assert_eq!(m.rate_per_sec(), 0);
        assert!(m.reset_pending(), "anomaly must schedule a clean window");
        clock.set(10_000);
        assert_eq!(m.rate_per_sec(), 0, "zero elapsed is also an anomaly");
    }

    #[test]
    fn test_reset_on_query_policy() {
        let (clock, m) = meter(RateWindow::ResetOnQuery);
        m.add(100);
        clock.advance(1_000);
        assert_eq!(m.rate_per_sec(), 100);
        assert!(m.reset_pending());

        let (clock, m) = meter(RateWindow::Continuous);
        m.add(100);
        clock.advance(1_000);
        assert_eq!(m.rate_per_sec(), 100);
        assert!(!m.reset_pending(), "continuous queries must not touch the window");
    }

    #[test]
    fn test_concurrent_add_and_reset_conserve_hashes() {
        let (_clock, m) = meter(RateWindow::Continuous);
        let m = Arc::new(m);
        const THREADS: u64 = 6;
        const ADDS: u64 = 20_000;

        let adders: Vec<_> = (0..THREADS)
            .map(|_| {
                let m = m.clone();
                thread::spawn(move || {
                    (0..ADDS).map(|_| m.add(3).unwrap_or(0)).sum::<u64>()
                })
            })
            .collect();
        let resetter = {
            let m = m.clone();
            thread::spawn(move || {
                let mut closed = 0;
                for i in 0..5_000 {
                    m.request_reset();
                    if i % 2 == 0 {
                        closed += m.try_reset().unwrap_or(0);
                    }
                }
                closed
            })
        };

        let mut closed: u64 = adders
            .into_iter()
            .map(|h| h.join().expect("adder panicked"))
            .sum();
        closed += resetter.join().expect("resetter panicked");

        assert_eq!(
            closed + m.hash_count(),
            THREADS * ADDS * 3,
            "closed windows plus the open window must account for every hash exactly once"
        );
    }
}
