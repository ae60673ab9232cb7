//! Runtime Configuration
//!
//! Named settings loaded at startup from the persistence layer (out of
//! scope here) and validated against documented ranges. Invalid values are
//! rejected at the point of assignment with [`ConfigError::OutOfRange`] -
//! never silently clamped.
//!
//! All intervals are in seconds, matching the operator-facing shell
//! parameters (`interval-sample`, `interval-aggreg`, …).

use crate::errors::ConfigError;

macro_rules! checked_setter {
    ($(#[$meta:meta])* $setter:ident, $field:ident, $name:literal, $min:literal, $max:literal) => {
        $(#[$meta])*
        pub fn $setter(&mut self, value: u32) -> Result<(), ConfigError> {
            if !($min..=$max).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    name: $name,
                    min: $min,
                    max: $max,
                });
            }
            self.$field = value;
            Ok(())
        }
    };
}

/// Validated node configuration
///
/// Fields are read directly; mutation goes through the range-checked
/// setters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Sample interval in seconds
    pub interval_sample: u32,
    /// Aggregation interval in seconds
    pub interval_aggreg: u32,
    /// Report interval in seconds
    pub interval_report: u32,
    /// Trailing delay before an event-triggered report, in seconds
    pub event_report_delay: u32,
    /// Maximum event-triggered reports per hour
    pub event_report_rate: u32,
    /// Report line-power connect events
    pub backup_report_connected: bool,
    /// Report line-power disconnect events
    pub backup_report_disconnected: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_sample: 60,
            interval_aggreg: 300,
            interval_report: 1800,
            event_report_delay: 1,
            event_report_rate: 30,
            backup_report_connected: true,
            backup_report_disconnected: true,
        }
    }
}

impl Config {
    checked_setter!(
        /// Set the sample interval (1-86400 s)
        set_interval_sample, interval_sample, "interval-sample", 1, 86400);

    checked_setter!(
        /// Set the aggregation interval (1-86400 s)
        set_interval_aggreg, interval_aggreg, "interval-aggreg", 1, 86400);

    checked_setter!(
        /// Set the report interval (30-86400 s)
        set_interval_report, interval_report, "interval-report", 30, 86400);

    checked_setter!(
        /// Set the event report delay (1-86400 s)
        set_event_report_delay, event_report_delay, "event-report-delay", 1, 86400);

    checked_setter!(
        /// Set the event report rate (1-3600 reports/hour)
        set_event_report_rate, event_report_rate, "event-report-rate", 1, 3600);
}
