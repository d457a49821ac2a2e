// src/sync/atomic.rs
//! Lock-free integer counters
//!
//! Thin wrappers over the standard atomics with one uniform convention:
//! `add`, `increment` and `decrement` return the *updated* value and wrap on
//! overflow, while `set` is an exchange that returns the *previous* value.
//! Callers draining a flag rely on that last property to observe a request
//! exactly once.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

macro_rules! counter {
    ($(#[$doc:meta])* $name:ident, $atomic:ty, $int:ty) => {
        $(#[$doc])*
        #[derive(Debug, Default)]
        pub struct $name($atomic);

        impl $name {
            /// Creates a counter holding `value`
            pub const fn new(value: $int) -> Self {
                Self(<$atomic>::new(value))
            }

            /// Adds `value` and returns the updated value
            pub fn add(&self, value: $int) -> $int {
                self.0.fetch_add(value, Ordering::AcqRel).wrapping_add(value)
            }

            /// Adds one and returns the updated value
            pub fn increment(&self) -> $int {
                self.add(1)
            }

            /// Subtracts one and returns the updated value
            pub fn decrement(&self) -> $int {
                self.0.fetch_sub(1, Ordering::AcqRel).wrapping_sub(1)
            }

            /// Stores `value` and returns the previous value
            pub fn set(&self, value: $int) -> $int {
                self.0.swap(value, Ordering::AcqRel)
            }

            /// Loads the current value
            pub fn get(&self) -> $int {
                self.0.load(Ordering::Acquire)
            }
        }
    };
}

counter!(
    /// 32-bit atomic counter, used for flags and share tallies
    Counter32,
    AtomicU32,
    u32
);

counter!(
    /// 64-bit atomic counter, used for hash counts and timestamps
    Counter64,
    AtomicU64,
    u64
);
