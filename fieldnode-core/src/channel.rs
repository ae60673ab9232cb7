//! Fixed-Capacity Sample Buffers and Measurement Rings
//!
//! ## Overview
//!
//! Two storage primitives back every logical sensor channel:
//!
//! - [`SampleSeries`] accumulates raw float samples between aggregation
//!   events and is cleared after each window closes.
//! - [`MeasurementRing`] is an *append-only* array of timestamped entries
//!   (aggregates or discrete events) accumulated between report cycles.
//!
//! ## Overflow Policy
//!
//! Unlike a sliding-window history buffer, neither structure evicts old
//! data. On overflow the new entry is dropped and [`ChannelError::BufferFull`]
//! is returned - the sampling cycle that produced it is simply lost. A
//! report is a chronological record; silently replacing its oldest entries
//! would corrupt the delta-encoded timeline the backend reconstructs.
//!
//! ## Delta Timestamps
//!
//! The first entry appended after a [`MeasurementRing::clear`] records the
//! ring's base timestamp. At encode time every entry is emitted as an
//! offset from that base, which keeps the wire format compact: one
//! absolute timestamp per ring, small deltas per entry.
//!
//! ```text
//! append(…, 300_000)  append(…, 600_000)  append(…, 900_000)
//!        │                   │                   │
//!        ▼                   ▼                   ▼
//! base = 300_000      offset 300_000      offset 600_000
//! ```

use heapless::Vec;

use crate::aggregate::Aggregate;
use crate::errors::ChannelError;
use crate::time::Timestamp;

/// Raw sample buffer for one aggregation window
///
/// `M` is the per-channel sample capacity, fixed at compile time.
#[derive(Debug, Clone, Default)]
pub struct SampleSeries<const M: usize> {
    samples: Vec<f32, M>,
}

impl<const M: usize> SampleSeries<M> {
    /// Create an empty series
    pub const fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    /// Append one raw sample
    ///
    /// Returns [`ChannelError::BufferFull`] once `M` samples are held; the
    /// caller logs a warning and drops the cycle.
    pub fn push(&mut self, value: f32) -> Result<(), ChannelError> {
        self.samples
            .push(value)
            .map_err(|_| ChannelError::BufferFull)
    }

    /// Number of samples accumulated so far
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if no samples were accumulated
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Most recent sample of the open window
    pub fn last(&self) -> Option<f32> {
        self.samples.last().copied()
    }

    /// Close the window: compute the summary and clear the buffer
    pub fn aggregate(&mut self) -> Aggregate {
        let aggregate = Aggregate::compute(&mut self.samples);
        self.samples.clear();
        aggregate
    }
}

/// Append-only ring of timestamped entries for one report cycle
///
/// `T` is the entry payload (an [`Aggregate`], an event, …), `N` the
/// per-channel capacity fixed at compile time (typically 16-128).
#[derive(Debug, Clone)]
pub struct MeasurementRing<T, const N: usize> {
    entries: Vec<(Timestamp, T), N>,
    base: Option<Timestamp>,
}

impl<T, const N: usize> MeasurementRing<T, N> {
    /// Create an empty ring
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            base: None,
        }
    }

    /// Append one entry at the given absolute timestamp
    ///
    /// Entries must be appended in non-decreasing time order. The first
    /// entry since the last [`clear`](Self::clear) becomes the ring's base
    /// timestamp. On overflow returns [`ChannelError::BufferFull`] without
    /// evicting anything.
    pub fn append(&mut self, entry: T, timestamp: Timestamp) -> Result<(), ChannelError> {
        if self.entries.is_full() {
            return Err(ChannelError::BufferFull);
        }

        if self.entries.is_empty() {
            self.base = Some(timestamp);
        }

        // Cannot fail: fullness checked above
        let _ = self.entries.push((timestamp, entry));
        Ok(())
    }

    /// Drop all entries
    ///
    /// The base timestamp is kept until the next append records a new one.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the ring holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if the next append would overflow
    pub fn is_full(&self) -> bool {
        self.entries.is_full()
    }

    /// Base timestamp recorded by the first append since the last clear
    pub fn base_timestamp(&self) -> Option<Timestamp> {
        self.base
    }

    /// Iterate entries as `(offset_from_base, &entry)` pairs
    ///
    /// Offsets are ≥ 0 and non-decreasing for time-ordered appends.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &T)> {
        let base = self.base.unwrap_or(0);
        self.entries
            .iter()
            .map(move |(ts, entry)| (ts.saturating_sub(base), entry))
    }
}

impl<T, const N: usize> Default for MeasurementRing<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// One logical sensor channel: a sample buffer plus its measurement ring
///
/// Sample producers and the periodic aggregator share this struct (and
/// therefore its lock scope, when the owner wraps the node data in one).
#[derive(Debug, Clone, Default)]
pub struct Channel<const M: usize, const N: usize> {
    series: SampleSeries<M>,
    measurements: MeasurementRing<Aggregate, N>,
}

impl<const M: usize, const N: usize> Channel<M, N> {
    /// Create an empty channel
    pub const fn new() -> Self {
        Self {
            series: SampleSeries::new(),
            measurements: MeasurementRing::new(),
        }
    }

    /// Record one raw sample
    pub fn sample(&mut self, value: f32) -> Result<(), ChannelError> {
        self.series.push(value).map_err(|err| {
            log::warn!("Sample buffer full");
            err
        })
    }

    /// Close the current aggregation window
    ///
    /// Computes the summary (all-`None` for an empty or poisoned window),
    /// appends it to the measurement ring and clears the sample buffer.
    pub fn aggregate(&mut self, now: Timestamp) -> Result<(), ChannelError> {
        let aggregate = self.series.aggregate();
        self.measurements.append(aggregate, now).map_err(|err| {
            log::warn!("Measurement buffer full");
            err
        })
    }

    /// Access the accumulated measurements
    pub fn measurements(&self) -> &MeasurementRing<Aggregate, N> {
        &self.measurements
    }

    /// Number of samples in the open window
    pub fn sample_count(&self) -> usize {
        self.series.len()
    }

    /// Drop accumulated measurements after a report cycle
    pub fn clear_measurements(&mut self) {
        self.measurements.clear();
    }
}
