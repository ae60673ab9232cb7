//! Time management for the engine
//!
//! Every component is driven by an injected clock so the whole engine can
//! be stepped deterministically in tests:
//! - System clock (when `std` is available)
//! - External RTC or monotonic hardware timer (implement [`TimeSource`])
//! - Fixed test clock ([`FixedClock`])

/// Timestamp in milliseconds since epoch (or device boot for monotonic)
pub type Timestamp = u64;

/// Milliseconds per second
pub const MSEC_PER_SEC: u64 = 1000;

/// Milliseconds per minute
pub const MSEC_PER_MIN: u64 = 60 * MSEC_PER_SEC;

/// Milliseconds per hour - the rate limiter's window length
pub const MSEC_PER_HOUR: u64 = 60 * MSEC_PER_MIN;

/// Source of time for the engine
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Check if this source provides wall clock time (vs monotonic)
    fn is_wall_clock(&self) -> bool;
}

/// System time source (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct SystemClock;

#[cfg(feature = "std")]
impl TimeSource for SystemClock {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};

        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        true
    }
}

/// Fixed time source for testing
#[derive(Debug, Clone)]
pub struct FixedClock {
    timestamp: Timestamp,
}

impl FixedClock {
    /// Create a clock stopped at the given timestamp
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    /// Jump to an absolute timestamp
    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Advance the clock by `ms` milliseconds
    pub fn advance(&mut self, ms: u64) {
        self.timestamp += ms;
    }
}

impl TimeSource for FixedClock {
    fn now(&self) -> Timestamp {
        self.timestamp
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// Blocking delay provider backed by the OS scheduler (requires std)
///
/// Used by the dispatcher for inter-retry sleeps on hosted targets;
/// embedded targets pass their HAL's `DelayNs` instead.
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct SystemDelay;

#[cfg(feature = "std")]
impl embedded_hal::delay::DelayNs for SystemDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(ns as u64));
    }
}
