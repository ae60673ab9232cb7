//! Wire formats for fieldnode telemetry reports
//!
//! Two uplink encodings over the same [`NodeData`] snapshot:
//!
//! - [`encode`]: the full CBOR report, integer-keyed maps with explicit
//!   nulls for missing values and flat timestamp-offset lists for
//!   measurement history; [`decode`] is its reference decoder.
//! - [`frame`]: a fixed-layout compact frame for narrowband uplinks,
//!   presence bitmap plus sentinel-coded fields, current values only.
//!
//! [`NodeData`]: fieldnode_core::data::NodeData

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

pub mod decode;
pub mod encode;
pub mod frame;
pub mod keys;

pub use decode::{decode, DecodeError, Report};
pub use encode::{EncodeError, ReportEncoder};
