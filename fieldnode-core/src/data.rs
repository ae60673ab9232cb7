//! Node Data Model
//!
//! ## Overview
//!
//! Owned state structs for everything the report encoder snapshots. There
//! are no file-scope singletons: the owning application constructs a
//! [`NodeData`], injects it into its work handlers and the encoder, and
//! (when producers run on another context) wraps it in one coarse mutex
//! held for the whole critical section. Rust scope guards release the lock
//! on every exit path, including error paths.
//!
//! ## Missing Data
//!
//! Two conventions coexist, both consumed by the codec crate:
//!
//! - Float groups read in one hardware transaction use NaN-as-missing and
//!   are set or invalidated as a unit ([`SystemState::invalidate`]); a
//!   transient read failure leaves the group NaN and the cycle continues.
//! - Structurally optional values use `Option` (orientation, line
//!   presence, network parameters).
//!
//! A transient sensor failure never aborts the owning work cycle - the
//! other fields of the same cycle are still collected and reported.

use heapless::Vec;

use crate::aggregate::Aggregate;
use crate::channel::{MeasurementRing, SampleSeries};
use crate::errors::ChannelError;
use crate::time::Timestamp;

/// Samples per aggregation window, per channel
pub const MAX_SAMPLES: usize = 32;

/// Measurements per report cycle, per channel
pub const MAX_MEASUREMENTS: usize = 32;

/// Discrete events per report cycle, per channel
pub const MAX_EVENTS: usize = 32;

/// External thermometer channels on the one-wire bus
pub const MAX_THERM_CHANNELS: usize = 10;

/// Static device identity reported in every message
#[derive(Debug, Clone, Copy)]
pub struct Attributes {
    /// Factory-assigned serial number
    pub serial_number: u32,
    /// Hardware variant name
    pub hw_variant: &'static str,
    /// Firmware version string
    pub fw_version: &'static str,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            serial_number: 0,
            hw_variant: "",
            fw_version: crate::VERSION,
        }
    }
}

/// Battery and uptime state, refreshed by the battery task
#[derive(Debug, Clone, Copy)]
pub struct SystemState {
    /// Seconds since boot
    pub uptime_s: u64,
    /// Battery rest voltage in volts (NaN until first read)
    pub voltage_rest: f32,
    /// Battery load voltage in volts (NaN until first read)
    pub voltage_load: f32,
    /// Battery load current in milliamps (NaN until first read)
    pub current_load: f32,
}

impl Default for SystemState {
    fn default() -> Self {
        Self {
            uptime_s: 0,
            voltage_rest: f32::NAN,
            voltage_load: f32::NAN,
            current_load: f32::NAN,
        }
    }
}

impl SystemState {
    /// Record one successful battery read
    pub fn update(&mut self, voltage_rest: f32, voltage_load: f32, current_load: f32) {
        self.voltage_rest = voltage_rest;
        self.voltage_load = voltage_load;
        self.current_load = current_load;
    }

    /// Mark the whole battery group missing after a failed read
    pub fn invalidate(&mut self) {
        self.voltage_rest = f32::NAN;
        self.voltage_load = f32::NAN;
        self.current_load = f32::NAN;
    }
}

/// Modem registration parameters, valid as a group
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkParam {
    /// Whether the parameter group below holds a real measurement
    pub valid: bool,
    /// Energy estimate indicator
    pub eest: i32,
    /// Coverage enhancement level
    pub ecl: i32,
    /// Reference signal received power, dBm
    pub rsrp: i32,
    /// Reference signal received quality, dB
    pub rsrq: i32,
    /// Signal-to-noise ratio, dB
    pub snr: i32,
}

/// Network identity and registration state
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkState {
    /// Modem IMEI, once known
    pub imei: Option<u64>,
    /// SIM IMSI, once known
    pub imsi: Option<u64>,
    /// Last registration parameter snapshot
    pub param: NetworkParam,
}

/// Accelerometer-derived state
#[derive(Debug, Clone, Copy, Default)]
pub struct AccelState {
    /// Device orientation code 1-6, `None` while unknown
    pub orientation: Option<u8>,
}

/// Line-power / backup-battery state with connect events
#[derive(Debug, Clone)]
pub struct BackupState {
    /// DC input voltage in volts (NaN until first read)
    pub line_voltage: f32,
    /// Backup battery voltage in volts (NaN until first read)
    pub batt_voltage: f32,
    /// Whether line power is currently present
    pub line_present: Option<bool>,
    /// Connect/disconnect edges since the last report
    pub events: MeasurementRing<bool, MAX_EVENTS>,
}

impl Default for BackupState {
    fn default() -> Self {
        Self {
            line_voltage: f32::NAN,
            batt_voltage: f32::NAN,
            line_present: None,
            events: MeasurementRing::new(),
        }
    }
}

impl BackupState {
    /// Record a line-power edge; returns the edge if the state changed
    pub fn update_line(
        &mut self,
        present: bool,
        now: Timestamp,
    ) -> Result<Option<bool>, ChannelError> {
        let changed = self.line_present != Some(present);
        self.line_present = Some(present);

        if changed {
            self.events.append(present, now)?;
            return Ok(Some(present));
        }

        Ok(None)
    }
}

/// Hygrometer alarm edge kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HygroEventKind {
    /// Temperature rose above the high alarm threshold
    AlarmHiActivated = 0,
    /// Temperature fell back below the high alarm threshold
    AlarmHiDeactivated = 1,
    /// Temperature fell below the low alarm threshold
    AlarmLoActivated = 2,
    /// Temperature rose back above the low alarm threshold
    AlarmLoDeactivated = 3,
}

/// One hygrometer alarm edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HygroEvent {
    /// Which edge fired
    pub kind: HygroEventKind,
    /// Temperature at the edge, °C
    pub value: f32,
}

/// One closed hygrometer aggregation window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HygroMeasurement {
    /// Temperature summary, °C
    pub temperature: Aggregate,
    /// Relative humidity summary, %
    pub humidity: Aggregate,
}

/// Alarm thresholds with hysteresis, in °C
#[derive(Debug, Clone, Copy)]
pub struct HygroAlarms {
    /// High alarm activation threshold
    pub hi_threshold: f32,
    /// Hysteresis subtracted from (added to) the high (low) threshold
    pub hysteresis: f32,
    /// Low alarm activation threshold
    pub lo_threshold: f32,
}

impl Default for HygroAlarms {
    fn default() -> Self {
        Self {
            hi_threshold: 40.0,
            hysteresis: 2.0,
            lo_threshold: -10.0,
        }
    }
}

/// Hygrometer channel: paired temperature/humidity series, one sample clock
#[derive(Debug, Clone, Default)]
pub struct HygroState {
    temperature: SampleSeries<MAX_SAMPLES>,
    humidity: SampleSeries<MAX_SAMPLES>,
    /// Closed aggregation windows since the last report
    pub measurements: MeasurementRing<HygroMeasurement, MAX_MEASUREMENTS>,
    /// Alarm edges since the last report
    pub events: MeasurementRing<HygroEvent, MAX_EVENTS>,
    /// Alarm thresholds
    pub alarms: HygroAlarms,
    alarm_hi_active: bool,
    alarm_lo_active: bool,
}

impl HygroState {
    /// Record one paired temperature/humidity sample
    ///
    /// Evaluates alarm hysteresis on the temperature and records any edge
    /// as an event. Returns `true` when an edge fired, so the caller can
    /// notify the rate-limited reporter.
    pub fn sample(&mut self, temperature: f32, humidity: f32, now: Timestamp) -> bool {
        if self.temperature.push(temperature).is_err() || self.humidity.push(humidity).is_err() {
            log::warn!("Sample buffer full");
            return false;
        }

        self.evaluate_alarms(temperature, now)
    }

    fn evaluate_alarms(&mut self, temperature: f32, now: Timestamp) -> bool {
        if temperature.is_nan() {
            return false;
        }

        let mut edge = None;

        if !self.alarm_hi_active && temperature > self.alarms.hi_threshold {
            self.alarm_hi_active = true;
            edge = Some(HygroEventKind::AlarmHiActivated);
        } else if self.alarm_hi_active
            && temperature < self.alarms.hi_threshold - self.alarms.hysteresis
        {
            self.alarm_hi_active = false;
            edge = Some(HygroEventKind::AlarmHiDeactivated);
        } else if !self.alarm_lo_active && temperature < self.alarms.lo_threshold {
            self.alarm_lo_active = true;
            edge = Some(HygroEventKind::AlarmLoActivated);
        } else if self.alarm_lo_active
            && temperature > self.alarms.lo_threshold + self.alarms.hysteresis
        {
            self.alarm_lo_active = false;
            edge = Some(HygroEventKind::AlarmLoDeactivated);
        }

        let Some(kind) = edge else {
            return false;
        };

        let event = HygroEvent {
            kind,
            value: temperature,
        };
        if self.events.append(event, now).is_err() {
            log::warn!("Event buffer full");
        }

        true
    }

    /// Close the current aggregation window
    pub fn aggregate(&mut self, now: Timestamp) -> Result<(), ChannelError> {
        let measurement = HygroMeasurement {
            temperature: self.temperature.aggregate(),
            humidity: self.humidity.aggregate(),
        };

        self.measurements.append(measurement, now).map_err(|err| {
            log::warn!("Measurement buffer full");
            err
        })
    }

    /// Number of samples in the open window
    pub fn sample_count(&self) -> usize {
        self.temperature.len()
    }

    /// Most recent temperature of the open window, NaN when none
    pub fn last_temperature(&self) -> f32 {
        self.temperature.last().unwrap_or(f32::NAN)
    }

    /// Most recent humidity of the open window, NaN when none
    pub fn last_humidity(&self) -> f32 {
        self.humidity.last().unwrap_or(f32::NAN)
    }
}

/// One external thermometer channel
///
/// Channels are iterated as a homogeneous array - per-channel behavior
/// differs only by this descriptor's contents.
#[derive(Debug, Clone)]
pub struct ThermChannel {
    /// One-wire serial number of the probe
    pub serial_number: u64,
    /// Most recent raw sample, °C (NaN until first read)
    pub last_sample: f32,
    series: SampleSeries<MAX_SAMPLES>,
    /// Closed aggregation windows since the last report
    pub measurements: MeasurementRing<Aggregate, MAX_MEASUREMENTS>,
}

impl ThermChannel {
    /// Create a channel for the probe with the given serial number
    pub fn new(serial_number: u64) -> Self {
        Self {
            serial_number,
            last_sample: f32::NAN,
            series: SampleSeries::new(),
            measurements: MeasurementRing::new(),
        }
    }

    /// Record one raw temperature sample
    pub fn sample(&mut self, temperature: f32) -> Result<(), ChannelError> {
        self.last_sample = temperature;
        self.series.push(temperature).map_err(|err| {
            log::warn!("Sample buffer full");
            err
        })
    }

    /// Close the current aggregation window
    pub fn aggregate(&mut self, now: Timestamp) -> Result<(), ChannelError> {
        let aggregate = self.series.aggregate();
        self.measurements.append(aggregate, now).map_err(|err| {
            log::warn!("Measurement buffer full");
            err
        })
    }
}

/// Everything the report encoder snapshots
///
/// Constructed by the owning application; the engine only ever borrows it.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// Device identity
    pub attributes: Attributes,
    /// Battery and uptime
    pub system: SystemState,
    /// Network identity and registration
    pub network: NetworkState,
    /// Onboard thermometer, °C (NaN until first read)
    pub therm_temperature: f32,
    /// Accelerometer state
    pub accel: AccelState,
    /// Line power / backup battery
    pub backup: BackupState,
    /// Hygrometer channel
    pub hygro: HygroState,
    /// External thermometer channels
    pub therm_channels: Vec<ThermChannel, MAX_THERM_CHANNELS>,
}

impl NodeData {
    /// Create an empty node state
    pub fn new(attributes: Attributes) -> Self {
        Self {
            attributes,
            system: SystemState::default(),
            network: NetworkState::default(),
            therm_temperature: f32::NAN,
            accel: AccelState::default(),
            backup: BackupState::default(),
            hygro: HygroState::default(),
            therm_channels: Vec::new(),
        }
    }

    /// Drop all accumulated measurements and events
    ///
    /// Called after every report attempt, successful or not: report data
    /// is never retried, so the rings must not grow across cycles.
    pub fn clear_measurements(&mut self) {
        self.backup.events.clear();
        self.hygro.measurements.clear();
        self.hygro.events.clear();
        for channel in &mut self.therm_channels {
            channel.measurements.clear();
        }
    }
}

impl Default for NodeData {
    fn default() -> Self {
        Self::new(Attributes::default())
    }
}
