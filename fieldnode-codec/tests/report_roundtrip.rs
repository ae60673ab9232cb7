//! Report encode/decode round-trips and the full engine-to-wire path

use std::cell::RefCell;
use std::rc::Rc;

use fieldnode_codec::decode::{decode, AggregateEntry, DecodeError};
use fieldnode_codec::encode::{EncodeError, ReportEncoder, VERSION};
use fieldnode_core::aggregate::Aggregate;
use fieldnode_core::data::{Attributes, NodeData, ThermChannel};
use fieldnode_core::errors::WorkError;
use fieldnode_core::scheduler::Scheduler;

fn attributes() -> Attributes {
    Attributes {
        serial_number: 1234,
        hw_variant: "FN-A",
        fw_version: "1.2.3",
    }
}

#[test]
fn all_invalid_snapshot_encodes_nulls_with_valid_header() {
    let data = NodeData::new(attributes());
    let mut encoder = ReportEncoder::new();
    let mut buf = [0u8; 1024];

    let len = encoder.encode(&data, 45_000, &mut buf).unwrap();
    let report = decode(&buf[..len]).unwrap();

    assert_eq!(report.version, VERSION);
    assert_eq!(report.sequence, 0);
    assert_eq!(report.timestamp, 45);
    assert_eq!(report.serial_number, Some(1234));
    assert_eq!(report.hw_variant.as_deref(), Some("FN-A"));

    assert_eq!(report.voltage_rest, None);
    assert_eq!(report.voltage_load, None);
    assert_eq!(report.current_load, None);
    assert_eq!(report.eest, None);
    assert_eq!(report.rsrp, None);
    assert_eq!(report.therm_temperature, None);
    assert_eq!(report.orientation, None);
    assert_eq!(report.backup.line_present, None);
    assert!(report.backup.events.is_empty());
    assert!(report.hygro.temperature.is_empty());
    assert!(report.w1_thermometers.is_empty());
}

#[test]
fn populated_snapshot_roundtrips() {
    let mut data = NodeData::new(attributes());

    data.system.uptime_s = 77;
    data.system.update(3.6, 3.4, 42.0);

    data.network.imei = Some(351_358_810_000_000);
    data.network.imsi = Some(901_288_000_000_000);
    data.network.param.valid = true;
    data.network.param.eest = 7;
    data.network.param.ecl = 0;
    data.network.param.rsrp = -93;
    data.network.param.rsrq = -10;
    data.network.param.snr = 11;

    data.therm_temperature = 23.5;
    data.accel.orientation = Some(2);

    data.backup.line_voltage = 12.0;
    data.backup.batt_voltage = 3.7;
    data.backup.update_line(true, 10_000).unwrap();
    data.backup.update_line(false, 20_000).unwrap();

    // One alarm edge at 45 C, then one closed window
    assert!(data.hygro.sample(45.0, 55.0, 30_000));
    data.hygro.aggregate(60_000).unwrap();

    let mut w1 = ThermChannel::new(0xAABB);
    w1.sample(21.25).unwrap();
    w1.aggregate(60_000).unwrap();
    data.therm_channels.push(w1).ok();

    let mut encoder = ReportEncoder::new();
    let mut buf = [0u8; 2048];
    let len = encoder.encode(&data, 60_000, &mut buf).unwrap();
    let report = decode(&buf[..len]).unwrap();

    assert_eq!(report.uptime, Some(77));
    assert_eq!(report.voltage_rest, Some(3600));
    assert_eq!(report.voltage_load, Some(3400));
    assert_eq!(report.current_load, Some(42));

    assert_eq!(report.imei, Some(351_358_810_000_000));
    assert_eq!(report.imsi, Some(901_288_000_000_000));
    assert_eq!(report.eest, Some(7));
    assert_eq!(report.ecl, Some(0));
    assert_eq!(report.rsrp, Some(-93));
    assert_eq!(report.rsrq, Some(-10));
    assert_eq!(report.snr, Some(11));

    assert_eq!(report.therm_temperature, Some(2350));
    assert_eq!(report.orientation, Some(2));

    assert_eq!(report.backup.line_voltage, Some(12_000));
    assert_eq!(report.backup.batt_voltage, Some(3700));
    assert_eq!(report.backup.line_present, Some(false));
    assert_eq!(report.backup.events, vec![(10, true), (20, false)]);

    assert_eq!(report.hygro.temperature_events.len(), 1);
    let event = report.hygro.temperature_events[0];
    assert_eq!(event.timestamp, 30);
    assert_eq!(event.value, Some(4500));

    assert_eq!(
        report.hygro.temperature,
        vec![AggregateEntry {
            timestamp: 60,
            min: Some(4500),
            max: Some(4500),
            avg: Some(4500),
            mdn: Some(4500),
        }]
    );
    assert_eq!(report.hygro.humidity[0].avg, Some(5500));

    assert_eq!(report.w1_thermometers.len(), 1);
    assert_eq!(report.w1_thermometers[0].serial_number, 0xAABB);
    assert_eq!(report.w1_thermometers[0].measurements[0].mdn, Some(2125));
}

#[test]
fn undersized_buffer_aborts_the_attempt() {
    let data = NodeData::new(attributes());
    let mut encoder = ReportEncoder::new();
    let mut buf = [0u8; 64];
    assert_eq!(
        encoder.encode(&data, 0, &mut buf),
        Err(EncodeError::BufferTooSmall)
    );
}

#[test]
fn sequence_numbers_are_monotonic() {
    let data = NodeData::new(attributes());
    let mut encoder = ReportEncoder::new();
    let mut buf = [0u8; 1024];

    for expected in 0..3 {
        let len = encoder.encode(&data, 0, &mut buf).unwrap();
        let report = decode(&buf[..len]).unwrap();
        assert_eq!(report.sequence, expected);
    }
}

#[test]
fn truncated_message_is_rejected() {
    let data = NodeData::new(attributes());
    let mut encoder = ReportEncoder::new();
    let mut buf = [0u8; 1024];
    let len = encoder.encode(&data, 0, &mut buf).unwrap();

    assert_eq!(decode(&buf[..len / 2]), Err(DecodeError::Malformed));
}

/// Five samples at a 60 s cadence, one window closed at 300 s, reported
/// on the wire with values matching a directly computed summary.
#[test]
fn engine_to_wire_scenario() {
    let data = Rc::new(RefCell::new(NodeData::new(attributes())));
    let mut sched: Scheduler<4> = Scheduler::new();

    let sampler = {
        let data = Rc::clone(&data);
        move |now: u64| -> Result<(), WorkError> {
            let i = (now / 60_000) as f32 - 1.0;
            data.borrow_mut().hygro.sample(20.0 + i, 50.0 + i, now);
            Ok(())
        }
    };
    sched
        .schedule("sample", 0, 60_000, 60_000, Box::new(sampler))
        .unwrap();

    let aggregator = {
        let data = Rc::clone(&data);
        move |now: u64| {
            data.borrow_mut()
                .hygro
                .aggregate(now)
                .map_err(|_| WorkError("aggregate failed"))
        }
    };
    sched
        .schedule("aggregate", 0, 300_000, 300_000, Box::new(aggregator))
        .unwrap();

    let mut now = 0;
    while now <= 300_000 {
        sched.poll(now);
        now += 1_000;
    }

    {
        let data = data.borrow();
        assert_eq!(data.hygro.measurements.len(), 1);
        let (offset, window) = data.hygro.measurements.iter().next().unwrap();
        assert_eq!(offset, 0);

        let expected = Aggregate::compute(&mut [20.0, 21.0, 22.0, 23.0, 24.0]);
        assert_eq!(window.temperature, expected);
    }

    let mut encoder = ReportEncoder::new();
    let mut buf = [0u8; 2048];
    let len = encoder
        .encode(&data.borrow(), 300_000, &mut buf)
        .unwrap();
    let report = decode(&buf[..len]).unwrap();

    assert_eq!(
        report.hygro.temperature,
        vec![AggregateEntry {
            timestamp: 300,
            min: Some(2000),
            max: Some(2400),
            avg: Some(2200),
            mdn: Some(2200),
        }]
    );
    assert_eq!(report.hygro.humidity[0].mdn, Some(5200));

    // Next cycle starts clean
    data.borrow_mut().clear_measurements();
    assert!(data.borrow().hygro.measurements.is_empty());
}
