//! Work Scheduler
//!
//! ## Overview
//!
//! Single-threaded polled scheduler replacing a dedicated work-queue
//! thread. The owner registers periodic work items once at startup, then
//! drives the engine from its main loop:
//!
//! ```text
//! loop {
//!     scheduler.poll(clock.now())?;
//!     sleep_until(scheduler.next_due());
//! }
//! ```
//!
//! ## Re-arm Discipline
//!
//! A periodic item's next deadline is computed from the moment its handler
//! is ENTERED, not from when it returns. A handler that takes longer than
//! expected delays its own next run but never shifts the period grid of
//! other items.
//!
//! ## Out-of-band Triggers
//!
//! [`Scheduler::trigger`] marks an item due immediately from any context
//! (interrupt handlers, other threads) through one atomic bitmask; the
//! next `poll` runs it and re-arms its period from that poll's `now`.

use core::sync::atomic::{AtomicU32, Ordering};

use alloc::boxed::Box;
use heapless::Vec;

use crate::errors::{SchedulerError, WorkError};
use crate::time::Timestamp;

/// Most work items one scheduler can hold
///
/// Bounded by the trigger bitmask width.
pub const MAX_WORK_ITEMS: usize = 32;

/// Handle identifying a registered work item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkId(u8);

/// Periodic work callback
pub trait WorkHandler {
    /// Run one cycle of this work item
    ///
    /// Errors are logged by the scheduler and otherwise swallowed; one
    /// failing cycle never unschedules the item or affects its peers.
    fn run(&mut self, now: Timestamp) -> Result<(), WorkError>;
}

impl<F> WorkHandler for F
where
    F: FnMut(Timestamp) -> Result<(), WorkError>,
{
    fn run(&mut self, now: Timestamp) -> Result<(), WorkError> {
        self(now)
    }
}

struct WorkItem {
    name: &'static str,
    handler: Box<dyn WorkHandler>,
    period_ms: u64,
    next_due: Timestamp,
}

/// Polled scheduler for up to `N` periodic work items
pub struct Scheduler<const N: usize> {
    items: Vec<WorkItem, N>,
    triggered: AtomicU32,
}

impl<const N: usize> Scheduler<N> {
    const CAPACITY_OK: () = assert!(N <= MAX_WORK_ITEMS);

    /// Create an empty scheduler
    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::CAPACITY_OK;
        Self {
            items: Vec::new(),
            triggered: AtomicU32::new(0),
        }
    }

    /// Register a periodic work item
    ///
    /// The first run happens at `now + initial_delay_ms`; each later run
    /// is re-armed `period_ms` after the previous run's entry. Items due
    /// at the same instant run in registration order.
    pub fn schedule(
        &mut self,
        name: &'static str,
        now: Timestamp,
        initial_delay_ms: u64,
        period_ms: u64,
        handler: Box<dyn WorkHandler>,
    ) -> Result<WorkId, SchedulerError> {
        let id = WorkId(self.items.len() as u8);
        let item = WorkItem {
            name,
            handler,
            // A zero period would make the item due again within the
            // same poll pass
            period_ms: period_ms.max(1),
            next_due: now.saturating_add(initial_delay_ms),
        };
        self.items.push(item).map_err(|_| SchedulerError::Full)?;
        log::debug!("Scheduled work item: {}", name);
        Ok(id)
    }

    /// Change a registered item's period
    ///
    /// Takes effect at the item's next re-arm; the already-armed deadline
    /// is left alone.
    pub fn set_period(&mut self, id: WorkId, period_ms: u64) {
        if let Some(item) = self.items.get_mut(id.0 as usize) {
            item.period_ms = period_ms.max(1);
        }
    }

    /// Mark an item due immediately
    ///
    /// Safe to call from any context; takes effect on the next `poll`.
    pub fn trigger(&self, id: WorkId) {
        self.triggered.fetch_or(1 << id.0, Ordering::Release);
    }

    /// Run every due item, in due order
    ///
    /// Returns the number of items run. Handler failures are logged and
    /// swallowed.
    pub fn poll(&mut self, now: Timestamp) -> usize {
        let triggered = self.triggered.swap(0, Ordering::Acquire);

        for (index, item) in self.items.iter_mut().enumerate() {
            if triggered & (1 << index) != 0 && item.next_due > now {
                item.next_due = now;
            }
        }

        let mut ran = 0;

        // An item may become due while an earlier handler runs; it waits
        // for the next poll so `now` stays consistent across one pass.
        loop {
            let due = self
                .items
                .iter()
                .enumerate()
                .filter(|(_, item)| item.next_due <= now)
                .min_by_key(|(index, item)| (item.next_due, *index))
                .map(|(index, _)| index);

            let Some(index) = due else {
                break;
            };

            let item = &mut self.items[index];
            // Re-arm at entry: a slow handler delays only itself
            item.next_due = now.saturating_add(item.period_ms);

            if let Err(err) = item.handler.run(now) {
                log::warn!("Call `run` failed ({}): {}", item.name, err);
            }
            ran += 1;
        }

        ran
    }

    /// Earliest pending deadline, if any item is registered
    pub fn next_due(&self) -> Option<Timestamp> {
        if self.triggered.load(Ordering::Acquire) != 0 {
            return Some(0);
        }
        self.items.iter().map(|item| item.next_due).min()
    }
}

impl<const N: usize> Default for Scheduler<N> {
    fn default() -> Self {
        Self::new()
    }
}
