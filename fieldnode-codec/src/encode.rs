//! Report Encoder
//!
//! ## Overview
//!
//! Serializes one [`NodeData`] snapshot into a CBOR map of integer keys
//! ([`keys`](crate::keys)). The encoder runs in a single pass into a
//! caller-provided buffer; when the buffer runs out the whole attempt is
//! abandoned and [`EncodeError::BufferTooSmall`] returned, partial output
//! is never sent.
//!
//! ## Missing Values
//!
//! Validity is checked before any engineering-unit transform: an invalid
//! value becomes an explicit CBOR null under its usual key, never an
//! omitted key and never a transformed garbage number. Units on the wire
//! are integers: volts become millivolts (x1000), temperatures and
//! humidity become centi-units (x100), timestamps are whole seconds.
//!
//! ## Ring Sections
//!
//! Measurement and event rings encode as one flat list: the absolute
//! base timestamp first, then for each entry its offset from the base
//! followed by the entry fields. An empty ring encodes as an empty list.

use fieldnode_core::aggregate::Aggregate;
use fieldnode_core::channel::MeasurementRing;
use fieldnode_core::data::NodeData;
use fieldnode_core::time::{Timestamp, MSEC_PER_SEC};
use minicbor::encode::write::{Cursor, EndOfSlice};
use minicbor::Encoder;
use thiserror_no_std::Error;

use crate::keys;

/// Wire schema version carried in every message header
pub const VERSION: u32 = 2;

/// Millivolt scale for voltages
const SCALE_MILLI: f32 = 1000.0;
/// Centi-unit scale for temperatures and humidity
const SCALE_CENTI: f32 = 100.0;

/// Errors raised while encoding a report
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// The output buffer cannot hold the full message
    #[error("output buffer too small")]
    BufferTooSmall,
}

impl From<minicbor::encode::Error<EndOfSlice>> for EncodeError {
    fn from(_: minicbor::encode::Error<EndOfSlice>) -> Self {
        Self::BufferTooSmall
    }
}

type Enc<'e, 'b> = &'e mut Encoder<Cursor<&'b mut [u8]>>;

/// Stateful report encoder
///
/// Owns the message sequence counter; one encoder instance per uplink
/// stream. The counter increments on every attempt, successful or not,
/// so the backend can detect dropped messages.
#[derive(Debug, Default)]
pub struct ReportEncoder {
    sequence: u32,
}

impl ReportEncoder {
    /// Create an encoder with sequence number zero
    pub const fn new() -> Self {
        Self { sequence: 0 }
    }

    /// Encode one snapshot into `buf`; returns the number of bytes written
    ///
    /// The caller must hold `data` stable for the whole call.
    pub fn encode(
        &mut self,
        data: &NodeData,
        now: Timestamp,
        buf: &mut [u8],
    ) -> Result<usize, EncodeError> {
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);

        encode_message(data, now, sequence, buf).map_err(|err| {
            log::warn!("Encoding failed: {}", err);
            err
        })
    }
}

fn encode_message(
    data: &NodeData,
    now: Timestamp,
    sequence: u32,
    buf: &mut [u8],
) -> Result<usize, EncodeError> {
    let mut e = Encoder::new(Cursor::new(buf));

    e.map(9)?;

    e.u32(keys::MESSAGE)?.map(3)?;
    e.u32(keys::VERSION)?.u32(VERSION)?;
    e.u32(keys::SEQUENCE)?.u32(sequence)?;
    e.u32(keys::TIMESTAMP)?.u64(now / MSEC_PER_SEC)?;

    e.u32(keys::ATTRIBUTE)?.map(3)?;
    e.u32(keys::SERIAL_NUMBER)?.u32(data.attributes.serial_number)?;
    e.u32(keys::HW_VARIANT)?.str(data.attributes.hw_variant)?;
    e.u32(keys::FW_VERSION)?.str(data.attributes.fw_version)?;

    e.u32(keys::SYSTEM)?.map(4)?;
    e.u32(keys::UPTIME)?.u64(data.system.uptime_s)?;
    put_scaled(&mut e, keys::VOLTAGE_REST, data.system.voltage_rest, SCALE_MILLI)?;
    put_scaled(&mut e, keys::VOLTAGE_LOAD, data.system.voltage_load, SCALE_MILLI)?;
    put_scaled(&mut e, keys::CURRENT_LOAD, data.system.current_load, 1.0)?;

    e.u32(keys::NETWORK)?.map(3)?;
    put_opt_u64(&mut e, keys::IMEI, data.network.imei)?;
    put_opt_u64(&mut e, keys::IMSI, data.network.imsi)?;
    e.u32(keys::PARAMETER)?.map(5)?;
    let param = &data.network.param;
    let valid = param.valid;
    put_opt_i32(&mut e, keys::EEST, valid.then_some(param.eest))?;
    put_opt_i32(&mut e, keys::ECL, valid.then_some(param.ecl))?;
    put_opt_i32(&mut e, keys::RSRP, valid.then_some(param.rsrp))?;
    put_opt_i32(&mut e, keys::RSRQ, valid.then_some(param.rsrq))?;
    put_opt_i32(&mut e, keys::SNR, valid.then_some(param.snr))?;

    e.u32(keys::THERMOMETER)?.map(1)?;
    put_scaled(&mut e, keys::TEMPERATURE, data.therm_temperature, SCALE_CENTI)?;

    e.u32(keys::ACCELEROMETER)?.map(1)?;
    put_opt_u32(
        &mut e,
        keys::ORIENTATION,
        data.accel.orientation.map(u32::from),
    )?;

    e.u32(keys::BACKUP)?.map(4)?;
    put_scaled(&mut e, keys::LINE_VOLTAGE, data.backup.line_voltage, SCALE_MILLI)?;
    put_scaled(&mut e, keys::BATT_VOLTAGE, data.backup.batt_voltage, SCALE_MILLI)?;
    put_opt_u32(
        &mut e,
        keys::BACKUP_STATE,
        data.backup.line_present.map(u32::from),
    )?;
    e.u32(keys::BACKUP_EVENTS)?;
    put_ring(&mut e, &data.backup.events, 1, |e, present| {
        e.u32(u32::from(*present))?;
        Ok(())
    })?;

    e.u32(keys::HYGROMETER)?.map(2)?;
    e.u32(keys::TEMPERATURE)?.map(2)?;
    e.u32(keys::EVENTS)?;
    put_ring(&mut e, &data.hygro.events, 2, |e, event| {
        e.u32(event.kind as u32)?;
        put_value(e, scale(event.value, SCALE_CENTI))?;
        Ok(())
    })?;
    e.u32(keys::MEASUREMENTS)?;
    put_ring(&mut e, &data.hygro.measurements, 4, |e, m| {
        put_aggregate(e, &m.temperature, SCALE_CENTI)
    })?;
    e.u32(keys::HUMIDITY)?.map(1)?;
    e.u32(keys::MEASUREMENTS)?;
    put_ring(&mut e, &data.hygro.measurements, 4, |e, m| {
        put_aggregate(e, &m.humidity, SCALE_CENTI)
    })?;

    e.u32(keys::W1_THERMOMETERS)?;
    e.array(data.therm_channels.len() as u64)?;
    for channel in &data.therm_channels {
        e.map(2)?;
        e.u32(keys::SERIAL_NUMBER)?.u64(channel.serial_number)?;
        e.u32(keys::MEASUREMENTS)?;
        put_ring(&mut e, &channel.measurements, 4, |e, agg| {
            put_aggregate(e, agg, SCALE_CENTI)
        })?;
    }

    Ok(e.writer().position())
}

/// Validity check before the unit transform
fn scale(value: f32, mul: f32) -> Option<i32> {
    if value.is_nan() {
        return None;
    }
    Some((value * mul) as i32)
}

fn put_value(e: Enc<'_, '_>, value: Option<i32>) -> Result<(), EncodeError> {
    match value {
        Some(v) => e.i32(v)?,
        None => e.null()?,
    };
    Ok(())
}

fn put_scaled(e: Enc<'_, '_>, key: u32, value: f32, mul: f32) -> Result<(), EncodeError> {
    e.u32(key)?;
    put_value(e, scale(value, mul))
}

fn put_opt_i32(e: Enc<'_, '_>, key: u32, value: Option<i32>) -> Result<(), EncodeError> {
    e.u32(key)?;
    put_value(e, value)
}

fn put_opt_u32(e: Enc<'_, '_>, key: u32, value: Option<u32>) -> Result<(), EncodeError> {
    e.u32(key)?;
    match value {
        Some(v) => e.u32(v)?,
        None => e.null()?,
    };
    Ok(())
}

fn put_opt_u64(e: Enc<'_, '_>, key: u32, value: Option<u64>) -> Result<(), EncodeError> {
    e.u32(key)?;
    match value {
        Some(v) => e.u64(v)?,
        None => e.null()?,
    };
    Ok(())
}

/// Four independently nullable aggregate fields, in fixed order
fn put_aggregate(e: Enc<'_, '_>, agg: &Aggregate, mul: f32) -> Result<(), EncodeError> {
    put_value(e, agg.min.and_then(|v| scale(v, mul)))?;
    put_value(e, agg.max.and_then(|v| scale(v, mul)))?;
    put_value(e, agg.avg.and_then(|v| scale(v, mul)))?;
    put_value(e, agg.mdn.and_then(|v| scale(v, mul)))?;
    Ok(())
}

/// Flat ring list: absolute base in seconds, then offset + fields per entry
fn put_ring<T, const N: usize>(
    e: Enc<'_, '_>,
    ring: &MeasurementRing<T, N>,
    fields_per_entry: u64,
    mut put_entry: impl FnMut(Enc<'_, '_>, &T) -> Result<(), EncodeError>,
) -> Result<(), EncodeError> {
    let Some(base) = ring.base_timestamp() else {
        e.array(0)?;
        return Ok(());
    };

    if ring.is_empty() {
        e.array(0)?;
        return Ok(());
    }

    e.array(1 + (1 + fields_per_entry) * ring.len() as u64)?;
    e.u64(base / MSEC_PER_SEC)?;

    for (offset_ms, entry) in ring.iter() {
        e.u64(offset_ms / MSEC_PER_SEC)?;
        put_entry(&mut *e, entry)?;
    }

    Ok(())
}
