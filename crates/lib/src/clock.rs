//! Time provider abstraction
//!
//! This module provides a [`Clock`] trait that abstracts over time sources,
//! allowing production code to use real system time while tests can use
//! controllable mock time for created and last-login timestamps.
//!
//! # Example
//!
//! ```
//! use ftpacct::{Clock, SystemClock};
//!
//! let clock = SystemClock;
//! let now = clock.now();
//! assert!(now.timestamp() > 0);
//! ```

use std::fmt::Debug;

use chrono::{DateTime, Utc};

#[cfg(any(test, feature = "testing"))]
use std::sync::Mutex;

/// A time provider for account timestamps.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock using real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock with auto-advancing time.
///
/// Every call to `now()` returns the current value and then advances the
/// clock by one second, so consecutive events get strictly increasing
/// timestamps. Use `hold()` to freeze it.
///
/// ```
/// use ftpacct::{Clock, FixedClock};
///
/// let clock = FixedClock::new(1_000);
/// let t1 = clock.now();
/// let t2 = clock.now();
/// assert!(t2 > t1);
///
/// {
///     let _hold = clock.hold();
///     assert_eq!(clock.now(), clock.now());
/// }
/// ```
#[cfg(any(test, feature = "testing"))]
pub struct FixedClock {
    state: Mutex<FixedClockState>,
}

#[cfg(any(test, feature = "testing"))]
struct FixedClockState {
    secs: i64,
    held: bool,
}

/// RAII guard that freezes a [`FixedClock`] while held.
#[cfg(any(test, feature = "testing"))]
pub struct ClockHold<'a>(&'a FixedClock);

#[cfg(any(test, feature = "testing"))]
impl Drop for ClockHold<'_> {
    fn drop(&mut self) {
        self.0.lock().held = false;
    }
}

#[cfg(any(test, feature = "testing"))]
impl FixedClock {
    /// Create a new fixed clock at the given Unix time in seconds.
    pub fn new(secs: i64) -> Self {
        Self {
            state: Mutex::new(FixedClockState { secs, held: false }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FixedClockState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Hold the clock, preventing auto-advance until the guard is dropped.
    pub fn hold(&self) -> ClockHold<'_> {
        self.lock().held = true;
        ClockHold(self)
    }

    /// Move the clock by the given number of seconds (may be negative).
    pub fn advance(&self, secs: i64) {
        self.lock().secs += secs;
    }

    /// Set the clock to a specific Unix time in seconds.
    pub fn set(&self, secs: i64) {
        self.lock().secs = secs;
    }

    /// Get the current time without advancing.
    pub fn get(&self) -> i64 {
        self.lock().secs
    }
}

#[cfg(any(test, feature = "testing"))]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        let mut state = self.lock();
        let secs = state.secs;
        if !state.held {
            state.secs += 1;
        }
        DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
    }
}

#[cfg(any(test, feature = "testing"))]
impl Default for FixedClock {
    fn default() -> Self {
        // 2024-01-01 00:00:00 UTC
        Self::new(1_704_067_200)
    }
}

#[cfg(any(test, feature = "testing"))]
impl Debug for FixedClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("FixedClock")
            .field("secs", &state.secs)
            .field("held", &state.held)
            .finish()
    }
}
