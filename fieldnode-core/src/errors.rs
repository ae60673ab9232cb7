//! Error Types for the Telemetry Engine
//!
//! ## Design Philosophy
//!
//! The error system follows the same rules as the rest of the engine:
//!
//! 1. **Small Size**: every variant is a few bytes - errors travel through
//!    hot sampling paths and queue slots.
//!
//! 2. **No Heap Allocation**: only `&'static str` payloads, no `String`.
//!
//! 3. **Copy Semantics**: errors implement `Copy` so soft failures can be
//!    logged and dropped without move gymnastics.
//!
//! ## Propagation Policy
//!
//! Low-level failures stay local and become structured "missing data":
//! a full sample buffer loses that cycle's data point, nothing more. Only
//! link-level failures ([`LinkError`]) escalate to the owning application,
//! via the dispatcher's `Failure` event.

use thiserror_no_std::Error;

/// Errors raised by sample buffers and measurement rings
///
/// Always a soft failure: the cycle that produced the overflowing entry is
/// lost, old entries are never evicted, and the subsystem keeps running.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// Fixed-capacity storage is exhausted; the new entry was dropped
    #[error("buffer full")]
    BufferFull,
}

/// Errors raised by configuration setters
///
/// Out-of-range values are rejected at the point of assignment, never
/// silently clamped.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Value outside the documented range for this parameter
    #[error("parameter '{name}' outside range [{min}, {max}]")]
    OutOfRange {
        /// Parameter name as exposed to the operator
        name: &'static str,
        /// Minimum accepted value
        min: i64,
        /// Maximum accepted value
        max: i64,
    },
}

/// Errors raised by the work scheduler
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// All work slots are taken; items are registered once at init
    #[error("work slot table full")]
    Full,
}

/// Failure reported by a work handler
///
/// Handler failures are logged by the scheduler and swallowed - a failed
/// sample or aggregation cycle never cancels the item.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("work handler failed: {0}")]
pub struct WorkError(pub &'static str);

/// Errors raised by the link dispatcher and its driver
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// Command or transfer queue is full; the request was not enqueued
    #[error("link queue full")]
    QueueFull,
    /// An operation exhausted its bounded retries
    #[error("no link")]
    NoLink,
    /// A single attempt timed out waiting for an asynchronous confirmation
    #[error("link operation timed out")]
    Timeout,
    /// The underlying modem/radio driver reported a failure
    #[error("link driver error")]
    Driver,
}

#[cfg(feature = "defmt")]
impl defmt::Format for LinkError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::QueueFull => defmt::write!(fmt, "queue full"),
            Self::NoLink => defmt::write!(fmt, "no link"),
            Self::Timeout => defmt::write!(fmt, "timeout"),
            Self::Driver => defmt::write!(fmt, "driver error"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ChannelError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::BufferFull => defmt::write!(fmt, "buffer full"),
        }
    }
}
