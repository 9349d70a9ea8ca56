//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, count them in a test, etc.

use crate::fsm::{EventKind, StateId};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Boot sequence finished and advertising is running.
    Started {
        advertising_set: u8,
        main_len: u8,
        scan_response_len: u8,
    },

    /// The state machine moved between states.
    StateChanged {
        from: StateId,
        to: StateId,
        cause: EventKind,
    },

    /// A subevent response was queued.
    ResponseSent(ResponseRecord),

    /// The central assigned a new response slot.
    ResponseSlotUpdated(u8),

    /// An event the responder does not handle (header id only).
    Unhandled { header: u32 },
}

/// What was sent for one subevent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseRecord {
    pub sync: u16,
    pub event_counter: u16,
    pub subevent: u8,
    pub response_slot: u8,
    pub ticks: u32,
}
