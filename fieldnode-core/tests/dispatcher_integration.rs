//! Dispatcher behavior against a scripted modem driver

use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use fieldnode_core::dispatcher::{
    Dispatcher, LinkDriver, LinkEvent, LinkQueues, LinkState, SendOptions,
};
use fieldnode_core::errors::LinkError;

/// Records every sleep the dispatcher requests
#[derive(Clone, Default)]
struct RecordingDelay {
    sleeps_ms: Rc<RefCell<Vec<u32>>>,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.sleeps_ms.borrow_mut().push(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.sleeps_ms.borrow_mut().push(ms);
    }
}

/// Driver scripted with per-operation failure counts
#[derive(Default)]
struct ScriptedDriver {
    boot_failures: u32,
    attach_failures: u32,
    sent: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl LinkDriver for ScriptedDriver {
    fn boot_once(&mut self) -> Result<(), LinkError> {
        if self.boot_failures > 0 {
            self.boot_failures -= 1;
            return Err(LinkError::Driver);
        }
        Ok(())
    }

    fn setup_once(&mut self) -> Result<(), LinkError> {
        Ok(())
    }

    fn attach_once(&mut self) -> Result<(), LinkError> {
        if self.attach_failures > 0 {
            self.attach_failures -= 1;
            return Err(LinkError::Timeout);
        }
        Ok(())
    }

    fn detach_once(&mut self) -> Result<(), LinkError> {
        Ok(())
    }

    fn send_once(&mut self, _opts: &SendOptions, payload: &[u8]) -> Result<(), LinkError> {
        self.sent.borrow_mut().push(payload.to_vec());
        Ok(())
    }
}

type Events = Rc<RefCell<Vec<LinkEvent>>>;

fn event_sink(events: &Events) -> impl FnMut(LinkEvent) {
    let events = Rc::clone(events);
    move |event| events.borrow_mut().push(event)
}

#[test]
fn start_attach_send_happy_path() {
    let queues = LinkQueues::new();
    let events: Events = Events::default();
    let sent = Rc::new(RefCell::new(Vec::new()));
    let driver = ScriptedDriver {
        sent: Rc::clone(&sent),
        ..ScriptedDriver::default()
    };
    let mut dispatcher = Dispatcher::new(
        &queues,
        driver,
        event_sink(&events),
        RecordingDelay::default(),
    );

    let start_id = queues.start().unwrap();
    let attach_id = queues.attach().unwrap();
    let send_id = queues
        .send(SendOptions::default(), vec![0xDE, 0xAD])
        .unwrap();

    while dispatcher.process_one(0).is_ok() {}

    assert_eq!(dispatcher.state(), LinkState::Ready);
    assert_eq!(
        events.borrow().as_slice(),
        [
            LinkEvent::StartOk { corr_id: start_id },
            LinkEvent::AttachOk { corr_id: attach_id },
            LinkEvent::SendOk { corr_id: send_id },
        ]
    );
    assert_eq!(sent.borrow().as_slice(), [vec![0xDE, 0xAD]]);
}

#[test]
fn boot_retries_with_fixed_backoff_then_fails() {
    let queues = LinkQueues::new();
    let events: Events = Events::default();
    let delay = RecordingDelay::default();
    let driver = ScriptedDriver {
        boot_failures: 10,
        ..ScriptedDriver::default()
    };
    let mut dispatcher = Dispatcher::new(&queues, driver, event_sink(&events), delay.clone());

    let corr_id = queues.start().unwrap();
    dispatcher.process_one(0).unwrap();

    // Exactly three attempts with two sleeps between them
    assert_eq!(delay.sleeps_ms.borrow().as_slice(), [10_000, 10_000]);
    assert_eq!(dispatcher.state(), LinkState::Error);
    assert_eq!(
        events.borrow().as_slice(),
        [LinkEvent::StartErr { corr_id }, LinkEvent::Failure]
    );
}

#[test]
fn boot_succeeds_on_second_attempt() {
    let queues = LinkQueues::new();
    let events: Events = Events::default();
    let driver = ScriptedDriver {
        boot_failures: 1,
        ..ScriptedDriver::default()
    };
    let mut dispatcher = Dispatcher::new(
        &queues,
        driver,
        event_sink(&events),
        RecordingDelay::default(),
    );

    let corr_id = queues.start().unwrap();
    dispatcher.process_one(0).unwrap();

    assert_eq!(dispatcher.state(), LinkState::Ready);
    assert_eq!(events.borrow().as_slice(), [LinkEvent::StartOk { corr_id }]);
}

#[test]
fn failure_purges_pending_commands_silently() {
    let queues = LinkQueues::new();
    let events: Events = Events::default();
    let driver = ScriptedDriver {
        boot_failures: 10,
        ..ScriptedDriver::default()
    };
    let mut dispatcher = Dispatcher::new(
        &queues,
        driver,
        event_sink(&events),
        RecordingDelay::default(),
    );

    let start_id = queues.start().unwrap();
    queues.attach().unwrap();

    dispatcher.process_one(0).unwrap();

    // Command queue drained, nothing left to process
    assert!(dispatcher.process_one(0).is_err());

    // No event for the purged attach
    assert_eq!(
        events.borrow().as_slice(),
        [LinkEvent::StartErr { corr_id: start_id }, LinkEvent::Failure]
    );
}

#[test]
fn attach_exhaustion_uses_long_backoff() {
    let queues = LinkQueues::new();
    let events: Events = Events::default();
    let delay = RecordingDelay::default();
    let driver = ScriptedDriver {
        attach_failures: 10,
        ..ScriptedDriver::default()
    };
    let mut dispatcher = Dispatcher::new(&queues, driver, event_sink(&events), delay.clone());

    queues.start().unwrap();
    let attach_id = queues.attach().unwrap();
    dispatcher.process_one(0).unwrap();
    dispatcher.process_one(0).unwrap();

    assert_eq!(delay.sleeps_ms.borrow().as_slice(), [60_000, 60_000]);
    assert_eq!(dispatcher.state(), LinkState::Error);
    assert!(events
        .borrow()
        .contains(&LinkEvent::AttachErr { corr_id: attach_id }));
}

#[test]
fn commands_in_wrong_state_are_dropped() {
    let queues = LinkQueues::new();
    let events: Events = Events::default();
    let mut dispatcher = Dispatcher::new(
        &queues,
        ScriptedDriver::default(),
        event_sink(&events),
        RecordingDelay::default(),
    );

    // Attach before start: no event, state unchanged
    queues.attach().unwrap();
    dispatcher.process_one(0).unwrap();
    assert_eq!(dispatcher.state(), LinkState::Init);
    assert!(events.borrow().is_empty());

    // A second start while ready is also dropped
    queues.start().unwrap();
    queues.start().unwrap();
    while dispatcher.process_one(0).is_ok() {}
    assert_eq!(events.borrow().len(), 1);
}

#[test]
fn transfer_enqueued_before_start_waits_for_ready() {
    let queues = LinkQueues::new();
    let events: Events = Events::default();
    let sent = Rc::new(RefCell::new(Vec::new()));
    let driver = ScriptedDriver {
        sent: Rc::clone(&sent),
        ..ScriptedDriver::default()
    };
    let mut dispatcher = Dispatcher::new(
        &queues,
        driver,
        event_sink(&events),
        RecordingDelay::default(),
    );

    // Enqueued while still in Init: not serviceable yet
    let send_id = queues.send(SendOptions::default(), vec![0x01]).unwrap();
    assert!(dispatcher.process_one(0).is_err());
    assert_eq!(dispatcher.state(), LinkState::Init);
    assert!(events.borrow().is_empty());

    let start_id = queues.start().unwrap();
    while dispatcher.process_one(0).is_ok() {}

    // The waiting transfer goes out right after the start succeeds
    assert_eq!(
        events.borrow().as_slice(),
        [
            LinkEvent::StartOk { corr_id: start_id },
            LinkEvent::SendOk { corr_id: send_id },
        ]
    );
    assert_eq!(sent.borrow().as_slice(), [vec![0x01]]);
}

#[test]
fn queued_transfer_survives_link_failure() {
    let queues = LinkQueues::new();
    let events: Events = Events::default();
    let sent = Rc::new(RefCell::new(Vec::new()));
    let driver = ScriptedDriver {
        boot_failures: 3,
        sent: Rc::clone(&sent),
        ..ScriptedDriver::default()
    };
    let mut dispatcher = Dispatcher::new(
        &queues,
        driver,
        event_sink(&events),
        RecordingDelay::default(),
    );

    let send_id = queues.send(SendOptions::default(), vec![0x02]).unwrap();

    // First start exhausts its boot retries
    let first = queues.start().unwrap();
    dispatcher.process_one(0).unwrap();
    assert_eq!(dispatcher.state(), LinkState::Error);

    // The transfer is still queued and goes out after a second start
    let second = queues.start().unwrap();
    while dispatcher.process_one(0).is_ok() {}

    assert_eq!(
        events.borrow().as_slice(),
        [
            LinkEvent::StartErr { corr_id: first },
            LinkEvent::Failure,
            LinkEvent::StartOk { corr_id: second },
            LinkEvent::SendOk { corr_id: send_id },
        ]
    );
    assert_eq!(sent.borrow().as_slice(), [vec![0x02]]);
}

#[test]
fn expired_transfers_are_dropped_without_events() {
    let queues = LinkQueues::new();
    let events: Events = Events::default();
    let mut dispatcher = Dispatcher::new(
        &queues,
        ScriptedDriver::default(),
        event_sink(&events),
        RecordingDelay::default(),
    );

    queues.start().unwrap();
    dispatcher.process_one(0).unwrap();
    events.borrow_mut().clear();

    let opts = SendOptions {
        ttl: Some(5_000),
        ..SendOptions::default()
    };
    queues.send(opts, vec![0x01]).unwrap();

    // Dequeued one hour later, well past the deadline
    dispatcher.process_one(3_600_000).unwrap();

    assert!(events.borrow().is_empty());
    assert_eq!(dispatcher.state(), LinkState::Ready);
}

#[test]
fn fresh_transfers_within_ttl_are_sent() {
    let queues = LinkQueues::new();
    let events: Events = Events::default();
    let mut dispatcher = Dispatcher::new(
        &queues,
        ScriptedDriver::default(),
        event_sink(&events),
        RecordingDelay::default(),
    );

    queues.start().unwrap();
    dispatcher.process_one(0).unwrap();
    events.borrow_mut().clear();

    let opts = SendOptions {
        ttl: Some(5_000),
        ..SendOptions::default()
    };
    let corr_id = queues.send(opts, vec![0x01]).unwrap();
    dispatcher.process_one(4_000).unwrap();

    assert_eq!(events.borrow().as_slice(), [LinkEvent::SendOk { corr_id }]);
}
