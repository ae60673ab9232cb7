//! Reference Report Decoder
//!
//! Mirror of the [`encode`](crate::encode) schema, used by the round-trip
//! tests and by backend tooling. Every leaf that can be null on the wire
//! decodes to an `Option`; ring lists are unfolded back into absolute
//! timestamps. Unknown keys are skipped so newer firmware stays decodable.

use alloc::string::String;
use alloc::vec::Vec;

use minicbor::data::Type;
use minicbor::Decoder;
use thiserror_no_std::Error;

use crate::encode::VERSION;
use crate::keys;

/// Errors raised while decoding a report
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Not a well-formed message of this schema
    #[error("message truncated or malformed")]
    Malformed,
    /// The message header carries a version this decoder does not speak
    #[error("unsupported message version {0}")]
    UnsupportedVersion(u32),
}

impl From<minicbor::decode::Error> for DecodeError {
    fn from(_: minicbor::decode::Error) -> Self {
        Self::Malformed
    }
}

/// One decoded aggregate window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregateEntry {
    /// Absolute window timestamp, seconds
    pub timestamp: u64,
    /// Minimum, in wire units
    pub min: Option<i32>,
    /// Maximum, in wire units
    pub max: Option<i32>,
    /// Average, in wire units
    pub avg: Option<i32>,
    /// Median, in wire units
    pub mdn: Option<i32>,
}

/// One decoded discrete event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventEntry {
    /// Absolute event timestamp, seconds
    pub timestamp: u64,
    /// Event kind code
    pub kind: u32,
    /// Value at the event, in wire units
    pub value: Option<i32>,
}

/// Decoded backup power section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackupReport {
    /// DC input voltage, millivolts
    pub line_voltage: Option<i32>,
    /// Backup battery voltage, millivolts
    pub batt_voltage: Option<i32>,
    /// Line power presence
    pub line_present: Option<bool>,
    /// Line power edges as (timestamp, present)
    pub events: Vec<(u64, bool)>,
}

/// Decoded hygrometer section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HygroReport {
    /// Temperature alarm edges
    pub temperature_events: Vec<EventEntry>,
    /// Temperature windows, centi-degrees
    pub temperature: Vec<AggregateEntry>,
    /// Humidity windows, centi-percent
    pub humidity: Vec<AggregateEntry>,
}

/// Decoded external thermometer channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct W1Report {
    /// Probe serial number
    pub serial_number: u64,
    /// Temperature windows, centi-degrees
    pub measurements: Vec<AggregateEntry>,
}

/// One fully decoded report
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    /// Wire schema version
    pub version: u32,
    /// Message sequence number
    pub sequence: u32,
    /// Message timestamp, seconds
    pub timestamp: u64,
    /// Device serial number
    pub serial_number: Option<u32>,
    /// Hardware variant string
    pub hw_variant: Option<String>,
    /// Firmware version string
    pub fw_version: Option<String>,
    /// Seconds since boot
    pub uptime: Option<u64>,
    /// Battery rest voltage, millivolts
    pub voltage_rest: Option<i32>,
    /// Battery load voltage, millivolts
    pub voltage_load: Option<i32>,
    /// Battery load current, milliamps
    pub current_load: Option<i32>,
    /// Modem IMEI
    pub imei: Option<u64>,
    /// SIM IMSI
    pub imsi: Option<u64>,
    /// Energy estimate
    pub eest: Option<i32>,
    /// Coverage enhancement level
    pub ecl: Option<i32>,
    /// Reference signal received power
    pub rsrp: Option<i32>,
    /// Reference signal received quality
    pub rsrq: Option<i32>,
    /// Signal-to-noise ratio
    pub snr: Option<i32>,
    /// Onboard temperature, centi-degrees
    pub therm_temperature: Option<i32>,
    /// Orientation code
    pub orientation: Option<u32>,
    /// Backup power section
    pub backup: BackupReport,
    /// Hygrometer section
    pub hygro: HygroReport,
    /// External thermometer channels
    pub w1_thermometers: Vec<W1Report>,
}

/// Decode one report message
pub fn decode(bytes: &[u8]) -> Result<Report, DecodeError> {
    let mut d = Decoder::new(bytes);
    let mut report = Report::default();

    let n = d.map()?.ok_or(DecodeError::Malformed)?;
    for _ in 0..n {
        match d.u32()? {
            keys::MESSAGE => decode_message(&mut d, &mut report)?,
            keys::ATTRIBUTE => decode_attribute(&mut d, &mut report)?,
            keys::SYSTEM => decode_system(&mut d, &mut report)?,
            keys::NETWORK => decode_network(&mut d, &mut report)?,
            keys::THERMOMETER => decode_thermometer(&mut d, &mut report)?,
            keys::ACCELEROMETER => decode_accelerometer(&mut d, &mut report)?,
            keys::BACKUP => decode_backup(&mut d, &mut report)?,
            keys::HYGROMETER => decode_hygrometer(&mut d, &mut report)?,
            keys::W1_THERMOMETERS => decode_w1(&mut d, &mut report)?,
            _ => d.skip()?,
        }
    }

    if report.version != VERSION {
        return Err(DecodeError::UnsupportedVersion(report.version));
    }

    Ok(report)
}

fn decode_message(d: &mut Decoder<'_>, report: &mut Report) -> Result<(), DecodeError> {
    let n = d.map()?.ok_or(DecodeError::Malformed)?;
    for _ in 0..n {
        match d.u32()? {
            keys::VERSION => report.version = d.u32()?,
            keys::SEQUENCE => report.sequence = d.u32()?,
            keys::TIMESTAMP => report.timestamp = d.u64()?,
            _ => d.skip()?,
        }
    }
    Ok(())
}

fn decode_attribute(d: &mut Decoder<'_>, report: &mut Report) -> Result<(), DecodeError> {
    let n = d.map()?.ok_or(DecodeError::Malformed)?;
    for _ in 0..n {
        match d.u32()? {
            keys::SERIAL_NUMBER => report.serial_number = Some(d.u32()?),
            keys::HW_VARIANT => report.hw_variant = Some(String::from(d.str()?)),
            keys::FW_VERSION => report.fw_version = Some(String::from(d.str()?)),
            _ => d.skip()?,
        }
    }
    Ok(())
}

fn decode_system(d: &mut Decoder<'_>, report: &mut Report) -> Result<(), DecodeError> {
    let n = d.map()?.ok_or(DecodeError::Malformed)?;
    for _ in 0..n {
        match d.u32()? {
            keys::UPTIME => report.uptime = Some(d.u64()?),
            keys::VOLTAGE_REST => report.voltage_rest = opt_i32(d)?,
            keys::VOLTAGE_LOAD => report.voltage_load = opt_i32(d)?,
            keys::CURRENT_LOAD => report.current_load = opt_i32(d)?,
            _ => d.skip()?,
        }
    }
    Ok(())
}

fn decode_network(d: &mut Decoder<'_>, report: &mut Report) -> Result<(), DecodeError> {
    let n = d.map()?.ok_or(DecodeError::Malformed)?;
    for _ in 0..n {
        match d.u32()? {
            keys::IMEI => report.imei = opt_u64(d)?,
            keys::IMSI => report.imsi = opt_u64(d)?,
            keys::PARAMETER => {
                let n = d.map()?.ok_or(DecodeError::Malformed)?;
                for _ in 0..n {
                    match d.u32()? {
                        keys::EEST => report.eest = opt_i32(d)?,
                        keys::ECL => report.ecl = opt_i32(d)?,
                        keys::RSRP => report.rsrp = opt_i32(d)?,
                        keys::RSRQ => report.rsrq = opt_i32(d)?,
                        keys::SNR => report.snr = opt_i32(d)?,
                        _ => d.skip()?,
                    }
                }
            }
            _ => d.skip()?,
        }
    }
    Ok(())
}

fn decode_thermometer(d: &mut Decoder<'_>, report: &mut Report) -> Result<(), DecodeError> {
    let n = d.map()?.ok_or(DecodeError::Malformed)?;
    for _ in 0..n {
        match d.u32()? {
            keys::TEMPERATURE => report.therm_temperature = opt_i32(d)?,
            _ => d.skip()?,
        }
    }
    Ok(())
}

fn decode_accelerometer(d: &mut Decoder<'_>, report: &mut Report) -> Result<(), DecodeError> {
    let n = d.map()?.ok_or(DecodeError::Malformed)?;
    for _ in 0..n {
        match d.u32()? {
            keys::ORIENTATION => report.orientation = opt_u32(d)?,
            _ => d.skip()?,
        }
    }
    Ok(())
}

fn decode_backup(d: &mut Decoder<'_>, report: &mut Report) -> Result<(), DecodeError> {
    let n = d.map()?.ok_or(DecodeError::Malformed)?;
    for _ in 0..n {
        match d.u32()? {
            keys::LINE_VOLTAGE => report.backup.line_voltage = opt_i32(d)?,
            keys::BATT_VOLTAGE => report.backup.batt_voltage = opt_i32(d)?,
            keys::BACKUP_STATE => {
                report.backup.line_present = opt_u32(d)?.map(|v| v != 0);
            }
            keys::BACKUP_EVENTS => {
                report.backup.events = decode_ring(d, 1, |d, timestamp| {
                    Ok((timestamp, d.u32()? != 0))
                })?;
            }
            _ => d.skip()?,
        }
    }
    Ok(())
}

fn decode_hygrometer(d: &mut Decoder<'_>, report: &mut Report) -> Result<(), DecodeError> {
    let n = d.map()?.ok_or(DecodeError::Malformed)?;
    for _ in 0..n {
        match d.u32()? {
            keys::TEMPERATURE => {
                let n = d.map()?.ok_or(DecodeError::Malformed)?;
                for _ in 0..n {
                    match d.u32()? {
                        keys::EVENTS => {
                            report.hygro.temperature_events =
                                decode_ring(d, 2, |d, timestamp| {
                                    Ok(EventEntry {
                                        timestamp,
                                        kind: d.u32()?,
                                        value: opt_i32(d)?,
                                    })
                                })?;
                        }
                        keys::MEASUREMENTS => {
                            report.hygro.temperature = decode_measurements(d)?;
                        }
                        _ => d.skip()?,
                    }
                }
            }
            keys::HUMIDITY => {
                let n = d.map()?.ok_or(DecodeError::Malformed)?;
                for _ in 0..n {
                    match d.u32()? {
                        keys::MEASUREMENTS => {
                            report.hygro.humidity = decode_measurements(d)?;
                        }
                        _ => d.skip()?,
                    }
                }
            }
            _ => d.skip()?,
        }
    }
    Ok(())
}

fn decode_w1(d: &mut Decoder<'_>, report: &mut Report) -> Result<(), DecodeError> {
    let n = d.array()?.ok_or(DecodeError::Malformed)?;
    for _ in 0..n {
        let mut channel = W1Report::default();
        let n = d.map()?.ok_or(DecodeError::Malformed)?;
        for _ in 0..n {
            match d.u32()? {
                keys::SERIAL_NUMBER => channel.serial_number = d.u64()?,
                keys::MEASUREMENTS => channel.measurements = decode_measurements(d)?,
                _ => d.skip()?,
            }
        }
        report.w1_thermometers.push(channel);
    }
    Ok(())
}

fn decode_measurements(d: &mut Decoder<'_>) -> Result<Vec<AggregateEntry>, DecodeError> {
    decode_ring(d, 4, |d, timestamp| {
        Ok(AggregateEntry {
            timestamp,
            min: opt_i32(d)?,
            max: opt_i32(d)?,
            avg: opt_i32(d)?,
            mdn: opt_i32(d)?,
        })
    })
}

/// Unfold a flat ring list back into absolute per-entry timestamps
fn decode_ring<T>(
    d: &mut Decoder<'_>,
    fields_per_entry: u64,
    mut entry: impl FnMut(&mut Decoder<'_>, u64) -> Result<T, DecodeError>,
) -> Result<Vec<T>, DecodeError> {
    let n = d.array()?.ok_or(DecodeError::Malformed)?;
    if n == 0 {
        return Ok(Vec::new());
    }

    if (n - 1) % (1 + fields_per_entry) != 0 {
        return Err(DecodeError::Malformed);
    }
    let count = (n - 1) / (1 + fields_per_entry);

    let base = d.u64()?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let offset = d.u64()?;
        let timestamp = base.checked_add(offset).ok_or(DecodeError::Malformed)?;
        out.push(entry(d, timestamp)?);
    }
    Ok(out)
}

fn opt_i32(d: &mut Decoder<'_>) -> Result<Option<i32>, DecodeError> {
    if d.datatype()? == Type::Null {
        d.null()?;
        return Ok(None);
    }
    Ok(Some(d.i32()?))
}

fn opt_u32(d: &mut Decoder<'_>) -> Result<Option<u32>, DecodeError> {
    if d.datatype()? == Type::Null {
        d.null()?;
        return Ok(None);
    }
    Ok(Some(d.u32()?))
}

fn opt_u64(d: &mut Decoder<'_>) -> Result<Option<u64>, DecodeError> {
    if d.datatype()? == Type::Null {
        d.null()?;
        return Ok(None);
    }
    Ok(Some(d.u64()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage() {
        assert_eq!(decode(&[0xFF, 0x00]), Err(DecodeError::Malformed));
    }

    #[test]
    fn rejects_unknown_version() {
        // {MESSAGE: {VERSION: 99}}
        let mut buf = [0u8; 32];
        let mut e = minicbor::Encoder::new(minicbor::encode::write::Cursor::new(&mut buf[..]));
        e.map(1)
            .unwrap()
            .u32(keys::MESSAGE)
            .unwrap()
            .map(1)
            .unwrap()
            .u32(keys::VERSION)
            .unwrap()
            .u32(99)
            .unwrap();
        let len = e.writer().position();

        assert_eq!(decode(&buf[..len]), Err(DecodeError::UnsupportedVersion(99)));
    }

    #[test]
    fn rejects_offset_overflowing_base_timestamp() {
        // {BACKUP: {BACKUP_EVENTS: [u64::MAX, 1, 1]}}
        let mut buf = [0u8; 64];
        let mut e = minicbor::Encoder::new(minicbor::encode::write::Cursor::new(&mut buf[..]));
        e.map(1)
            .unwrap()
            .u32(keys::BACKUP)
            .unwrap()
            .map(1)
            .unwrap()
            .u32(keys::BACKUP_EVENTS)
            .unwrap()
            .array(3)
            .unwrap()
            .u64(u64::MAX)
            .unwrap()
            .u64(1)
            .unwrap()
            .u32(1)
            .unwrap();
        let len = e.writer().position();

        assert_eq!(decode(&buf[..len]), Err(DecodeError::Malformed));
    }
}
