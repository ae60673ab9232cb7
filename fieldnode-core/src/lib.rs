//! Core engine for fieldnode telemetry firmware
//!
//! Owns the pieces every node variant shares: rolling sample aggregation,
//! append-only measurement rings, the deferred work scheduler, the
//! rate-limited event reporter and the link command dispatcher. Hardware
//! access and the radio stack stay behind traits.
//!
//! Key constraints:
//! - No heap allocation in the sampling/aggregation path
//! - Deterministic: every component is driven by an injected clock
//! - One cooperative worker per subsystem, no hidden threads
//!
//! ```no_run
//! use fieldnode_core::{Aggregate, Channel};
//!
//! let mut channel: Channel<32, 32> = Channel::new();
//!
//! channel.sample(21.4).ok();
//! channel.sample(21.9).ok();
//!
//! // Close the aggregation window at t = 300s
//! channel.aggregate(300_000).ok();
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

pub mod aggregate;
pub mod channel;
pub mod config;
pub mod data;
pub mod dispatcher;
pub mod errors;
pub mod reporter;
pub mod scheduler;
pub mod time;

// Public API
pub use aggregate::Aggregate;
pub use channel::{Channel, MeasurementRing, SampleSeries};
pub use config::Config;
pub use data::NodeData;
pub use dispatcher::{Dispatcher, LinkDriver, LinkEvent, LinkQueues, LinkState, SendOptions};
pub use errors::{ChannelError, ConfigError, LinkError, SchedulerError, WorkError};
pub use reporter::EventReporter;
pub use scheduler::{Scheduler, WorkHandler, WorkId};
pub use time::{TimeSource, Timestamp};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
