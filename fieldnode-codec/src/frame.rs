//! Compact Frame Encoder
//!
//! ## Overview
//!
//! Fixed-layout alternative to the CBOR report for narrowband uplinks
//! with tens-of-bytes payload budgets. The first byte is a presence
//! bitmap; each set bit appends that section's fixed-width big-endian
//! fields. Missing values use an all-bits-set sentinel per field, applied
//! before the unit transform, so the frame length depends only on the
//! bitmap.
//!
//! Sections carry current values, not rings: the narrowband path trades
//! history for size.

use fieldnode_core::data::NodeData;

use crate::encode::EncodeError;

/// Sentinel for a missing 16-bit unsigned field
pub const NONE_U16: u16 = 0xFFFF;
/// Sentinel for a missing 16-bit signed field
pub const NONE_S16: i16 = 0x7FFF;
/// Sentinel for a missing 8-bit field
pub const NONE_U8: u8 = 0xFF;

/// Presence bit: battery voltages and current
pub const FLAG_BATT: u8 = 1 << 0;
/// Presence bit: orientation
pub const FLAG_ACCEL: u8 = 1 << 1;
/// Presence bit: onboard thermometer
pub const FLAG_THERM: u8 = 1 << 2;
/// Presence bit: hygrometer
pub const FLAG_HYGRO: u8 = 1 << 3;
/// Presence bit: external thermometers
pub const FLAG_W1_THERM: u8 = 1 << 4;
/// Presence bit: backup power
pub const FLAG_BACKUP: u8 = 1 << 5;

struct FrameWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> FrameWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn put_u8(&mut self, value: u8) -> Result<(), EncodeError> {
        let slot = self
            .buf
            .get_mut(self.pos)
            .ok_or(EncodeError::BufferTooSmall)?;
        *slot = value;
        self.pos += 1;
        Ok(())
    }

    fn put_u16(&mut self, value: u16) -> Result<(), EncodeError> {
        for byte in value.to_be_bytes() {
            self.put_u8(byte)?;
        }
        Ok(())
    }

    fn put_s16(&mut self, value: i16) -> Result<(), EncodeError> {
        self.put_u16(value as u16)
    }
}

fn scale_u16(value: f32, mul: f32) -> u16 {
    if value.is_nan() {
        return NONE_U16;
    }
    (value * mul) as u16
}

fn scale_s16(value: f32, mul: f32) -> i16 {
    if value.is_nan() {
        return NONE_S16;
    }
    (value * mul) as i16
}

fn scale_u8(value: f32, mul: f32) -> u8 {
    if value.is_nan() {
        return NONE_U8;
    }
    (value * mul) as u8
}

/// Encode one compact frame; returns the number of bytes written
///
/// `flags` selects the sections to include ([`FLAG_BATT`] and friends);
/// unknown bits are ignored. On [`EncodeError::BufferTooSmall`] the
/// buffer contents are unspecified and must not be sent.
pub fn encode(data: &NodeData, flags: u8, buf: &mut [u8]) -> Result<usize, EncodeError> {
    let mut w = FrameWriter::new(buf);

    w.put_u8(flags)?;

    if flags & FLAG_BATT != 0 {
        w.put_u16(scale_u16(data.system.voltage_rest, 1000.0))?;
        w.put_u16(scale_u16(data.system.voltage_load, 1000.0))?;
        w.put_u8(scale_u8(data.system.current_load, 1.0))?;
    }

    if flags & FLAG_ACCEL != 0 {
        w.put_u8(data.accel.orientation.unwrap_or(NONE_U8))?;
    }

    if flags & FLAG_THERM != 0 {
        w.put_s16(scale_s16(data.therm_temperature, 100.0))?;
    }

    if flags & FLAG_HYGRO != 0 {
        w.put_s16(scale_s16(data.hygro.last_temperature(), 100.0))?;
        // Humidity packs 0-100 % into half-percent steps
        w.put_u8(scale_u8(data.hygro.last_humidity(), 2.0))?;
    }

    if flags & FLAG_W1_THERM != 0 {
        w.put_u8(data.therm_channels.len() as u8)?;
        for channel in &data.therm_channels {
            w.put_s16(scale_s16(channel.last_sample, 100.0))?;
        }
    }

    if flags & FLAG_BACKUP != 0 {
        w.put_u8(data.backup.line_present.map(u8::from).unwrap_or(NONE_U8))?;
        w.put_u16(scale_u16(data.backup.line_voltage, 1000.0))?;
        w.put_u16(scale_u16(data.backup.batt_voltage, 1000.0))?;
    }

    Ok(w.pos)
}
