//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events to the logger,
//! one line per event with a fixed tag so the output can be grepped.

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started {
                advertising_set,
                main_len,
                scan_response_len,
            } => {
                info!(
                    "START | set={} | adv={}B scan_rsp={}B",
                    advertising_set, main_len, scan_response_len
                );
            }
            AppEvent::StateChanged { from, to, cause } => {
                info!("STATE | {:?} -> {:?} on {:?}", from, to, cause);
            }
            AppEvent::ResponseSent(r) => {
                info!(
                    "RESP  | sync={} counter={} subevent={} slot={} ticks={}",
                    r.sync, r.event_counter, r.subevent, r.response_slot, r.ticks
                );
            }
            AppEvent::ResponseSlotUpdated(slot) => {
                info!("SLOT  | {}", slot);
            }
            AppEvent::Unhandled { header } => {
                info!("OTHER | header=0x{:08x}", header);
            }
        }
    }
}
