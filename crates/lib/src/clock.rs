//! Time provider abstraction
//!
//! Session expiry and stored-file names both depend on the current time.
//! Production code uses [`SystemClock`]; tests swap in a [`FixedClock`] and
//! move it forward by hand.
//!
//! # Example
//!
//! ```
//! use shelfs::{Clock, FixedClock};
//!
//! let clock = FixedClock::new(1_000);
//! assert_eq!(clock.now_millis(), 1_000);
//! clock.advance(500);
//! assert_eq!(clock.now_millis(), 1_500);
//! ```

use std::fmt::Debug;
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};

/// A time provider for getting current timestamps.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the current time as milliseconds since Unix epoch.
    fn now_millis(&self) -> u64 {
        self.now().timestamp_millis().max(0) as u64
    }
}

/// Production clock using real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock.
///
/// Unlike the system clock it never moves on its own; call
/// [`FixedClock::advance`] or [`FixedClock::set`] to change the time.
pub struct FixedClock {
    millis: Mutex<u64>,
}

impl FixedClock {
    /// Create a clock frozen at `millis` since the Unix epoch.
    pub fn new(millis: u64) -> Self {
        Self {
            millis: Mutex::new(millis),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, ms: u64) {
        *self.millis.lock().unwrap_or_else(|e| e.into_inner()) += ms;
    }

    /// Jump to an absolute time in milliseconds.
    pub fn set(&self, ms: u64) {
        *self.millis.lock().unwrap_or_else(|e| e.into_inner()) = ms;
    }

    fn get(&self) -> u64 {
        *self.millis.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.get();
        Utc.timestamp_millis_opt(millis as i64)
            .single()
            .unwrap_or_default()
    }

    fn now_millis(&self) -> u64 {
        self.get()
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        // 2024-01-01 00:00:00 UTC
        Self::new(1_704_067_200_000)
    }
}

impl Debug for FixedClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedClock")
            .field("millis", &self.get())
            .finish()
    }
}
