//! Clock abstraction for deterministic tests.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use linkguard_common::time::{Clock, MockClock};
//!
//! let clock = MockClock::at_unix(1_700_000_000.0);
//! clock.advance(Duration::from_millis(1500));
//! assert!((clock.unix_seconds() - 1_700_000_001.5).abs() < 1e-6);
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Source of monotonic and wall-clock time.
pub trait Clock: Send + Sync {
    /// Monotonic instant, suitable for measuring durations.
    fn now(&self) -> Instant;

    /// Wall-clock time.
    fn system_time(&self) -> SystemTime;

    /// Seconds since the Unix epoch with sub-second precision.
    ///
    /// Times before the epoch collapse to `0.0`.
    fn unix_seconds(&self) -> f64 {
        self.system_time().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
    }
}

/// Real system clock. Use this in production code.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually advanced clock.
///
/// Clones share the same elapsed offset, so a clock handed to a component can
/// be advanced from the test body.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    base_system_time: SystemTime,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Clock frozen at the current real time.
    #[must_use]
    pub fn new() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Clock frozen at `seconds` past the Unix epoch.
    ///
    /// Negative or non-finite inputs start the clock at the epoch.
    #[must_use]
    pub fn at_unix(seconds: f64) -> Self {
        let offset = Duration::try_from_secs_f64(seconds).unwrap_or_default();
        Self::from_system_time(UNIX_EPOCH + offset)
    }

    fn from_system_time(base_system_time: SystemTime) -> Self {
        Self {
            start: Instant::now(),
            base_system_time,
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Moves the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    /// Moves the clock forward by fractional seconds.
    pub fn advance_secs(&self, seconds: f64) {
        self.advance(Duration::try_from_secs_f64(seconds).unwrap_or_default());
    }

    /// Total time simulated since construction.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        self.base_system_time + self.elapsed()
    }
}
