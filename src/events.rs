//! Stack events and the dispatcher queue.
//!
//! Events are produced by the wireless stack (boot, connection, PAwR sync,
//! GATT writes) in its callback context and consumed by the main loop, which
//! feeds them one at a time into the [`AppService`].
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Stack       │────▶│  Event Queue │────▶│  Main Loop   │
//! │ callbacks   │     │  (bounded)   │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Each event runs to completion before the next one is popped, so the
//! service never sees two events at once.

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::{debug, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{AttributePort, ClockPort, EventSink, StackPort};
use crate::app::service::AppService;
use crate::error::Result;
use crate::fsm::EventKind;

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 16;

/// Largest attribute write value carried in an event.
pub const MAX_WRITE_LEN: usize = 32;

/// Largest body kept for an unrecognised event.
pub const MAX_UNKNOWN_LEN: usize = 64;

/// Inbound events from the wireless stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEvent {
    /// The stack is up; commands may be issued from now on.
    SystemBoot,
    ConnectionOpened { connection: u8 },
    ConnectionClosed { connection: u8, reason: u16 },
    /// A central handed over its PAwR synchronization.
    PawrSyncTransferReceived { sync: u16, connection: u8 },
    PawrSubeventReport {
        sync: u16,
        event_counter: u16,
        subevent: u8,
    },
    SyncClosed { sync: u16, reason: u16 },
    /// A write to a user-handled characteristic that needs an explicit ack.
    UserWriteRequest {
        connection: u8,
        characteristic: u16,
        value: heapless::Vec<u8, MAX_WRITE_LEN>,
    },
    /// Any event this application does not handle.
    Unknown {
        header: u32,
        data: heapless::Vec<u8, MAX_UNKNOWN_LEN>,
    },
}

impl StackEvent {
    /// Discriminant used by the transition table.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::SystemBoot => EventKind::Boot,
            Self::ConnectionOpened { .. } => EventKind::ConnectionOpened,
            Self::ConnectionClosed { .. } => EventKind::ConnectionClosed,
            Self::PawrSyncTransferReceived { .. } => EventKind::SyncTransferReceived,
            Self::PawrSubeventReport { .. } => EventKind::SubeventReport,
            Self::SyncClosed { .. } => EventKind::SyncClosed,
            Self::UserWriteRequest { .. } => EventKind::AttributeWrite,
            Self::Unknown { .. } => EventKind::Unknown,
        }
    }
}

// ── Dispatcher ────────────────────────────────────────────────

/// Bounded FIFO between the stack callback context and the main loop.
pub struct EventDispatcher {
    queue: Channel<NoopRawMutex, StackEvent, EVENT_QUEUE_CAP>,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    pub const fn new() -> Self {
        Self {
            queue: Channel::new(),
        }
    }

    /// Queue an event.  A full queue hands the event back.
    pub fn push(&self, event: StackEvent) -> core::result::Result<(), StackEvent> {
        self.queue.try_send(event).map_err(|TrySendError::Full(event)| {
            warn!("Event queue full, dropping {:?}", event.kind());
            event
        })
    }

    pub fn pop(&self) -> Option<StackEvent> {
        self.queue.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drain every pending event into `service`, then run the idle hook.
    ///
    /// Illegal transitions are dropped.  The first fatal error stops the
    /// drain and is returned; the remaining events stay queued.
    pub fn pump(
        &self,
        service: &mut AppService,
        hw: &mut (impl StackPort + AttributePort + ClockPort),
        sink: &mut impl EventSink,
    ) -> Result<usize> {
        let mut handled = 0;
        while let Some(event) = self.pop() {
            match service.handle_event(&event, hw, sink) {
                Ok(()) => handled += 1,
                Err(e) if !e.is_fatal() => debug!("Dropped event: {}", e),
                Err(e) => return Err(e),
            }
        }
        service.process_action();
        Ok(handled)
    }
}

/// Emit an [`AppEvent::Unhandled`] and log the raw event bytes.
pub(crate) fn report_unhandled(header: u32, data: &[u8], sink: &mut impl EventSink) {
    log::info!(
        "Unhandled event: {:02x?} {:02x?}",
        header.to_le_bytes(),
        data
    );
    sink.emit(&AppEvent::Unhandled { header });
}
