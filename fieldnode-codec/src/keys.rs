//! Message Key Dictionary
//!
//! Integer map keys shared with the backend decoder. The numbering is a
//! versioned contract: values are append-only and never reused, so a
//! backend can decode messages from any firmware revision that speaks
//! [`VERSION`](crate::encode::VERSION).

/// Accelerometer section
pub const ACCELEROMETER: u32 = 3;
/// Device identity section
pub const ATTRIBUTE: u32 = 5;
/// Battery load current
pub const CURRENT_LOAD: u32 = 9;
/// Coverage enhancement level
pub const ECL: u32 = 11;
/// Energy estimate
pub const EEST: u32 = 12;
/// Message header section
pub const MESSAGE: u32 = 13;
/// Firmware version string
pub const FW_VERSION: u32 = 15;
/// Relative humidity subsection
pub const HUMIDITY: u32 = 16;
/// Hygrometer section
pub const HYGROMETER: u32 = 17;
/// Hardware variant string
pub const HW_VARIANT: u32 = 19;
/// Message schema version
pub const VERSION: u32 = 20;
/// Modem IMEI
pub const IMEI: u32 = 23;
/// SIM IMSI
pub const IMSI: u32 = 24;
/// Network section
pub const NETWORK: u32 = 26;
/// Device orientation code
pub const ORIENTATION: u32 = 27;
/// Registration parameter subsection
pub const PARAMETER: u32 = 28;
/// Reference signal received power
pub const RSRP: u32 = 33;
/// Reference signal received quality
pub const RSRQ: u32 = 34;
/// Message sequence number
pub const SEQUENCE: u32 = 35;
/// Device or probe serial number
pub const SERIAL_NUMBER: u32 = 36;
/// Signal-to-noise ratio
pub const SNR: u32 = 37;
/// Temperature value or subsection
pub const TEMPERATURE: u32 = 38;
/// Onboard thermometer section
pub const THERMOMETER: u32 = 39;
/// Message timestamp
pub const TIMESTAMP: u32 = 40;
/// Uptime in seconds
pub const UPTIME: u32 = 41;
/// Battery load voltage
pub const VOLTAGE_LOAD: u32 = 43;
/// Battery rest voltage
pub const VOLTAGE_REST: u32 = 44;
/// External one-wire thermometer list
pub const W1_THERMOMETERS: u32 = 45;
/// Aggregated measurement list
pub const MEASUREMENTS: u32 = 47;
/// Line power presence
pub const BACKUP_STATE: u32 = 49;
/// Discrete event list
pub const EVENTS: u32 = 50;
/// DC input voltage
pub const LINE_VOLTAGE: u32 = 51;
/// Backup battery voltage
pub const BATT_VOLTAGE: u32 = 52;
/// Backup power section
pub const BACKUP: u32 = 53;
/// Line power event list
pub const BACKUP_EVENTS: u32 = 54;
/// System section
pub const SYSTEM: u32 = 55;
