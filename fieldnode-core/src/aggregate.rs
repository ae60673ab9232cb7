//! Sample Aggregation
//!
//! ## Overview
//!
//! Turns a rolling buffer of raw sensor samples into a compact
//! `{min, max, avg, mdn}` summary, computed once per aggregation period.
//! The summary is what gets stored in a measurement ring and eventually
//! reported uplink - raw samples never leave the device.
//!
//! ## Poisoning Policy
//!
//! A single invalid (NaN) sample poisons the whole aggregation window:
//! the result is all-`None`, not a summary of the remaining samples. This
//! is a deliberate fail-safe - a sensor that produced one corrupt reading
//! cannot be trusted for the rest of the window either, and a partially
//! filtered summary would hide that from the backend.
//!
//! Absence is always structural (`None` fields). Sentinel numerics exist
//! only at the wire-format boundary, never here.

/// Summary of one aggregation window
///
/// All four fields are `None` together when the window was empty or
/// poisoned - there are no partial aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aggregate {
    /// Smallest sample in the window
    pub min: Option<f32>,
    /// Largest sample in the window
    pub max: Option<f32>,
    /// Arithmetic mean, accumulated in double precision
    pub avg: Option<f32>,
    /// Median sample; for even counts the upper-middle element
    pub mdn: Option<f32>,
}

impl Aggregate {
    /// All-absent aggregate
    pub const NONE: Self = Self {
        min: None,
        max: None,
        avg: None,
        mdn: None,
    };

    /// Compute the summary of one sample window
    ///
    /// The input order carries no meaning and is discarded: the slice is
    /// sorted in place. Returns [`Aggregate::NONE`] for an empty window or
    /// a window containing any NaN sample.
    ///
    /// The median of an even-length window is the upper-middle element
    /// (`sorted[count / 2]`), not the mean of the two middle elements.
    /// Backend decoders depend on this behavior.
    pub fn compute(samples: &mut [f32]) -> Self {
        if samples.is_empty() {
            return Self::NONE;
        }

        if samples.iter().any(|v| v.is_nan()) {
            return Self::NONE;
        }

        samples.sort_unstable_by(f32::total_cmp);

        let count = samples.len();

        // f32 accumulation drifts noticeably for long windows
        let sum: f64 = samples.iter().map(|v| *v as f64).sum();
        let avg = (sum / count as f64) as f32;

        Self {
            min: Some(samples[0]),
            max: Some(samples[count - 1]),
            avg: Some(avg),
            mdn: Some(samples[count / 2]),
        }
    }

    /// Check whether the whole window was absent/poisoned
    pub fn is_none(&self) -> bool {
        self.min.is_none()
    }
}
