//! Link Command Dispatcher
//!
//! ## Overview
//!
//! Serializes all modem traffic through two bounded queues: a control
//! queue for link lifecycle requests (start, attach, detach) and a
//! transfer queue for outbound payloads. Producers enqueue from any
//! context and receive a correlation id; the owner drains the queues
//! from one place by calling [`Dispatcher::process_one`], so driver
//! operations never interleave. The transfer queue is serviced only
//! while the link is ready; payloads enqueued earlier wait for a
//! successful start.
//!
//! ```text
//! producers ──► LinkQueues ──► Dispatcher ──► LinkDriver (modem)
//!                  (MPMC)          │
//!                                  └──► EventSink (owner callback)
//! ```
//!
//! ## Retry Discipline
//!
//! Each driver operation is one bounded retry loop with a fixed
//! inter-attempt delay. When the budget is exhausted the dispatcher
//! enters the error state, drains pending commands, and emits
//! [`LinkEvent::Failure`]; recovery requires a new start request.
//! Queued transfers survive the failure and are delivered after the
//! next successful start.
//!
//! ## Expiry
//!
//! A transfer may carry a deadline. Transfers dequeued past their
//! deadline are dropped with a warning and produce no event: stale
//! telemetry is worthless and the next cycle supersedes it.

use core::convert::Infallible;
use core::sync::atomic::{AtomicU32, Ordering};

use alloc::vec::Vec;
use embedded_hal::delay::DelayNs;
use heapless::mpmc::MpMcQueue;

use crate::errors::LinkError;
use crate::time::Timestamp;

/// Control and transfer queue depth
pub const QUEUE_DEPTH: usize = 16;

const BOOT_RETRY_COUNT: u32 = 3;
const BOOT_RETRY_DELAY_MS: u32 = 10_000;
const SETUP_RETRY_COUNT: u32 = 1;
const SETUP_RETRY_DELAY_MS: u32 = 10_000;
const ATTACH_RETRY_COUNT: u32 = 3;
const ATTACH_RETRY_DELAY_MS: u32 = 60_000;
const DETACH_RETRY_COUNT: u32 = 3;
const DETACH_RETRY_DELAY_MS: u32 = 10_000;
const SEND_RETRY_COUNT: u32 = 3;
const SEND_RETRY_DELAY_MS: u32 = 10_000;

/// Link lifecycle request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Boot and configure the modem
    Start,
    /// Register with the network
    Attach,
    /// Deregister from the network
    Detach,
}

/// One queued lifecycle command
#[derive(Debug, Clone, Copy)]
pub struct Command {
    /// Correlation id handed back to the producer at enqueue time
    pub corr_id: u32,
    /// Requested operation
    pub req: Request,
}

/// Per-transfer delivery options
#[derive(Debug, Clone, Copy, Default)]
pub struct SendOptions {
    /// Request a link-layer delivery confirmation
    pub confirmed: bool,
    /// Application port number
    pub port: u8,
    /// Drop the transfer if not started by this instant
    pub ttl: Option<Timestamp>,
}

/// One queued outbound payload
#[derive(Debug, Clone)]
pub struct Transfer {
    /// Correlation id handed back to the producer at enqueue time
    pub corr_id: u32,
    /// Delivery options
    pub opts: SendOptions,
    /// Encoded report bytes
    pub payload: Vec<u8>,
}

/// Dispatcher outcome delivered to the owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// An operation exhausted its retries; the link needs a restart
    Failure,
    /// Start completed
    StartOk {
        /// Correlation id of the originating request
        corr_id: u32,
    },
    /// Start failed
    StartErr {
        /// Correlation id of the originating request
        corr_id: u32,
    },
    /// Attach completed
    AttachOk {
        /// Correlation id of the originating request
        corr_id: u32,
    },
    /// Attach failed
    AttachErr {
        /// Correlation id of the originating request
        corr_id: u32,
    },
    /// Detach completed
    DetachOk {
        /// Correlation id of the originating request
        corr_id: u32,
    },
    /// Detach failed
    DetachErr {
        /// Correlation id of the originating request
        corr_id: u32,
    },
    /// Transfer delivered (or handed to the radio, if unconfirmed)
    SendOk {
        /// Correlation id of the originating transfer
        corr_id: u32,
    },
    /// Transfer failed
    SendErr {
        /// Correlation id of the originating transfer
        corr_id: u32,
    },
}

/// Link lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// Not started
    #[default]
    Init,
    /// Modem booted and configured; commands and transfers accepted
    Ready,
    /// A retry budget was exhausted; waiting for a new start request
    Error,
}

/// Single-attempt modem operations
///
/// Each method performs exactly one bounded-timeout attempt; retries and
/// inter-attempt delays belong to the dispatcher.
pub trait LinkDriver {
    /// Power on and probe the modem
    fn boot_once(&mut self) -> Result<(), LinkError>;
    /// Apply static modem configuration
    fn setup_once(&mut self) -> Result<(), LinkError>;
    /// Register with the network
    fn attach_once(&mut self) -> Result<(), LinkError>;
    /// Deregister from the network
    fn detach_once(&mut self) -> Result<(), LinkError>;
    /// Transmit one payload
    fn send_once(&mut self, opts: &SendOptions, payload: &[u8]) -> Result<(), LinkError>;
}

/// Owner callback for dispatcher outcomes
pub trait EventSink {
    /// Deliver one event
    fn on_event(&mut self, event: LinkEvent);
}

impl<F> EventSink for F
where
    F: FnMut(LinkEvent),
{
    fn on_event(&mut self, event: LinkEvent) {
        self(event)
    }
}

/// Producer-side queues shared with the dispatcher
///
/// `const`-constructible so it can live in a `static`; every producer
/// method is lock-free and callable from any context.
pub struct LinkQueues {
    cmd: MpMcQueue<Command, QUEUE_DEPTH>,
    xfer: MpMcQueue<Transfer, QUEUE_DEPTH>,
    corr_id: AtomicU32,
}

impl LinkQueues {
    /// Create empty queues
    pub const fn new() -> Self {
        Self {
            cmd: MpMcQueue::new(),
            xfer: MpMcQueue::new(),
            corr_id: AtomicU32::new(0),
        }
    }

    fn next_corr_id(&self) -> u32 {
        self.corr_id.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    fn request(&self, req: Request) -> Result<u32, LinkError> {
        let corr_id = self.next_corr_id();
        self.cmd
            .enqueue(Command { corr_id, req })
            .map_err(|_| LinkError::QueueFull)?;
        Ok(corr_id)
    }

    /// Request a modem start; returns the correlation id
    pub fn start(&self) -> Result<u32, LinkError> {
        self.request(Request::Start)
    }

    /// Request a network attach; returns the correlation id
    pub fn attach(&self) -> Result<u32, LinkError> {
        self.request(Request::Attach)
    }

    /// Request a network detach; returns the correlation id
    pub fn detach(&self) -> Result<u32, LinkError> {
        self.request(Request::Detach)
    }

    /// Enqueue an outbound payload; returns the correlation id
    pub fn send(&self, opts: SendOptions, payload: Vec<u8>) -> Result<u32, LinkError> {
        let corr_id = self.next_corr_id();
        self.xfer
            .enqueue(Transfer {
                corr_id,
                opts,
                payload,
            })
            .map_err(|_| LinkError::QueueFull)?;
        Ok(corr_id)
    }
}

impl Default for LinkQueues {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer side: drains the queues and drives the modem
pub struct Dispatcher<'a, D, S, W> {
    queues: &'a LinkQueues,
    driver: D,
    sink: S,
    delay: W,
    state: LinkState,
}

impl<'a, D, S, W> Dispatcher<'a, D, S, W>
where
    D: LinkDriver,
    S: EventSink,
    W: DelayNs,
{
    /// Create a dispatcher over the given queues
    pub fn new(queues: &'a LinkQueues, driver: D, sink: S, delay: W) -> Self {
        Self {
            queues,
            driver,
            sink,
            delay,
            state: LinkState::Init,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Dequeue and fully process one command or transfer
    ///
    /// Commands take priority over transfers, and the transfer queue is
    /// serviced only while the link is [`LinkState::Ready`]: payloads
    /// enqueued earlier stay queued until a start succeeds. Returns
    /// `WouldBlock` when nothing is serviceable.
    pub fn process_one(&mut self, now: Timestamp) -> nb::Result<(), Infallible> {
        if let Some(cmd) = self.queues.cmd.dequeue() {
            self.process_command(cmd);
            return Ok(());
        }

        if self.state == LinkState::Ready {
            if let Some(xfer) = self.queues.xfer.dequeue() {
                self.process_transfer(xfer, now);
                return Ok(());
            }
        }

        Err(nb::Error::WouldBlock)
    }

    fn process_command(&mut self, cmd: Command) {
        match cmd.req {
            Request::Start => self.start(cmd.corr_id),
            Request::Attach => self.attach(cmd.corr_id),
            Request::Detach => self.detach(cmd.corr_id),
        }
    }

    fn start(&mut self, corr_id: u32) {
        if self.state == LinkState::Ready {
            log::warn!("No START operation expected");
            return;
        }

        let driver = &mut self.driver;
        let result = retry(
            "BOOT",
            BOOT_RETRY_COUNT,
            BOOT_RETRY_DELAY_MS,
            &mut self.delay,
            || driver.boot_once(),
        )
        .and_then(|()| {
            retry(
                "SETUP",
                SETUP_RETRY_COUNT,
                SETUP_RETRY_DELAY_MS,
                &mut self.delay,
                || driver.setup_once(),
            )
        });

        match result {
            Ok(()) => {
                self.state = LinkState::Ready;
                self.sink.on_event(LinkEvent::StartOk { corr_id });
            }
            Err(_) => {
                self.sink.on_event(LinkEvent::StartErr { corr_id });
                self.fail();
            }
        }
    }

    fn attach(&mut self, corr_id: u32) {
        if self.state != LinkState::Ready {
            log::warn!("No ATTACH operation expected");
            return;
        }

        let driver = &mut self.driver;
        let result = retry(
            "ATTACH",
            ATTACH_RETRY_COUNT,
            ATTACH_RETRY_DELAY_MS,
            &mut self.delay,
            || driver.attach_once(),
        );

        match result {
            Ok(()) => self.sink.on_event(LinkEvent::AttachOk { corr_id }),
            Err(_) => {
                self.sink.on_event(LinkEvent::AttachErr { corr_id });
                self.fail();
            }
        }
    }

    fn detach(&mut self, corr_id: u32) {
        if self.state != LinkState::Ready {
            log::warn!("No DETACH operation expected");
            return;
        }

        let driver = &mut self.driver;
        let result = retry(
            "DETACH",
            DETACH_RETRY_COUNT,
            DETACH_RETRY_DELAY_MS,
            &mut self.delay,
            || driver.detach_once(),
        );

        match result {
            Ok(()) => self.sink.on_event(LinkEvent::DetachOk { corr_id }),
            Err(_) => {
                self.sink.on_event(LinkEvent::DetachErr { corr_id });
                self.fail();
            }
        }
    }

    fn process_transfer(&mut self, xfer: Transfer, now: Timestamp) {
        if let Some(ttl) = xfer.opts.ttl {
            if now > ttl {
                log::warn!("Transfer expired (correlation id: {})", xfer.corr_id);
                return;
            }
        }

        let driver = &mut self.driver;
        let result = retry(
            "SEND",
            SEND_RETRY_COUNT,
            SEND_RETRY_DELAY_MS,
            &mut self.delay,
            || driver.send_once(&xfer.opts, &xfer.payload),
        );

        match result {
            Ok(()) => self.sink.on_event(LinkEvent::SendOk {
                corr_id: xfer.corr_id,
            }),
            Err(_) => {
                self.sink.on_event(LinkEvent::SendErr {
                    corr_id: xfer.corr_id,
                });
                self.fail();
            }
        }
    }

    /// Enter the error state: drain pending commands, notify the owner
    ///
    /// Purged commands produce no per-command events. Queued transfers
    /// are kept; they go out once a later start succeeds.
    fn fail(&mut self) {
        self.state = LinkState::Error;
        while self.queues.cmd.dequeue().is_some() {}
        self.sink.on_event(LinkEvent::Failure);
    }
}

/// Run one operation with a bounded retry budget and fixed backoff
fn retry<W: DelayNs>(
    name: &str,
    count: u32,
    delay_ms: u32,
    delay: &mut W,
    mut op: impl FnMut() -> Result<(), LinkError>,
) -> Result<(), LinkError> {
    log::info!("Operation {} started", name);

    let mut retries = count;

    while retries > 0 {
        match op() {
            Ok(()) => {
                log::info!("Operation {} succeeded", name);
                return Ok(());
            }
            Err(err) => {
                log::warn!("Operation {} failed: {}", name, err);
            }
        }

        retries -= 1;

        if retries > 0 {
            log::warn!("Repeating {} operation (retries left: {})", name, retries);
            delay.delay_ms(delay_ms);
        }
    }

    Err(LinkError::NoLink)
}
