//! Event Report Rate Limiting
//!
//! ## Overview
//!
//! Sensor alarms want a report soon after the edge, but a bouncing input
//! must not drain the battery with one uplink per bounce. This module
//! implements both halves as one state object polled alongside the
//! scheduler:
//!
//! - a trailing delay: each notification (re)arms a short timer, so a
//!   burst of edges collapses into one report sent `delay_ms` after the
//!   first edge of the burst;
//! - an hourly budget: at most `max_rate` event reports per sliding
//!   window; notifications beyond the budget are counted as exceeded and
//!   produce no report until the window resets.
//!
//! The window opens at the first notification after an idle period, not
//! on a fixed wall-clock grid.

use crate::time::{Timestamp, MSEC_PER_HOUR};

/// Rate-limited trigger for event-driven reports
///
/// [`notify`](Self::notify) is called on every reportable edge;
/// [`tick`](Self::tick) is polled and returns `true` when a report should
/// be sent now.
#[derive(Debug)]
pub struct EventReporter {
    max_rate: u32,
    delay_ms: u64,
    window_start: Option<Timestamp>,
    counter: u32,
    pending: Option<Timestamp>,
}

impl EventReporter {
    /// Create a reporter sending at most `max_rate` event reports per
    /// hour, each delayed `delay_ms` after the first edge of its burst
    pub const fn new(max_rate: u32, delay_ms: u64) -> Self {
        Self {
            max_rate,
            delay_ms,
            window_start: None,
            counter: 0,
            pending: None,
        }
    }

    /// Record a reportable event edge
    pub fn notify(&mut self, now: Timestamp) {
        if self.window_start.is_none() {
            self.window_start = Some(now);
        }

        if self.counter >= self.max_rate {
            log::warn!("Hourly counter exceeded");
            return;
        }

        if self.pending.is_some() {
            log::debug!("Delay timer already running");
            return;
        }

        log::debug!("Starting delay timer");
        self.pending = Some(now.saturating_add(self.delay_ms));
    }

    /// Advance the reporter; returns `true` when a report is due now
    pub fn tick(&mut self, now: Timestamp) -> bool {
        if let Some(start) = self.window_start {
            if now.saturating_sub(start) >= MSEC_PER_HOUR {
                self.counter = 0;
                self.window_start = None;
            }
        }

        match self.pending {
            Some(due) if due <= now => {
                self.pending = None;
                self.counter += 1;
                true
            }
            _ => false,
        }
    }

    /// Earliest instant `tick` can change state, for sleep planning
    pub fn next_due(&self) -> Option<Timestamp> {
        let window_end = self
            .window_start
            .map(|start| start.saturating_add(MSEC_PER_HOUR));
        match (self.pending, window_end) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Event reports sent in the current window
    pub fn counter(&self) -> u32 {
        self.counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_collapses_into_one_report() {
        let mut reporter = EventReporter::new(30, 1000);

        reporter.notify(0);
        reporter.notify(200);
        reporter.notify(900);

        assert!(!reporter.tick(999));
        assert!(reporter.tick(1000));
        assert!(!reporter.tick(1001));
        assert_eq!(reporter.counter(), 1);
    }

    #[test]
    fn budget_exhausts_then_window_resets() {
        let mut reporter = EventReporter::new(2, 100);
        let mut fired = 0;

        let mut now = 0;
        for _ in 0..5 {
            reporter.notify(now);
            now += 100;
            if reporter.tick(now) {
                fired += 1;
            }
            now += 100;
        }
        assert_eq!(fired, 2);

        // Window expiry restores the budget
        now += MSEC_PER_HOUR;
        assert!(!reporter.tick(now));
        reporter.notify(now);
        assert!(reporter.tick(now + 100));
        assert_eq!(reporter.counter(), 1);
    }

    #[test]
    fn zero_budget_never_fires() {
        let mut reporter = EventReporter::new(0, 100);
        reporter.notify(0);
        assert!(!reporter.tick(1000));
    }

    #[test]
    fn window_opens_on_first_notification() {
        let mut reporter = EventReporter::new(1, 10);
        assert_eq!(reporter.next_due(), None);

        reporter.notify(5000);
        assert_eq!(reporter.next_due(), Some(5010));
        assert!(reporter.tick(5010));
        assert_eq!(reporter.next_due(), Some(5000 + MSEC_PER_HOUR));
    }
}
