//! Fuzz target: `AppService::handle_event`
//!
//! Decodes arbitrary bytes into a stream of stack events and feeds them to a
//! fresh service backed by the simulated stack.  Against a healthy stack no
//! event order may produce a fatal error or panic.
//!
//! cargo fuzz run fuzz_event_sequence

#![no_main]

use libfuzzer_sys::fuzz_target;
use pawr_responder::adapters::sim_stack::SimStack;
use pawr_responder::app::events::AppEvent;
use pawr_responder::app::ports::EventSink;
use pawr_responder::app::service::AppService;
use pawr_responder::config::ResponderConfig;
use pawr_responder::events::StackEvent;

struct Discard;

impl EventSink for Discard {
    fn emit(&mut self, _: &AppEvent) {}
}

fn decode(chunk: &[u8]) -> StackEvent {
    let a = chunk[1];
    let b = u16::from_le_bytes([chunk[2], chunk[3]]);
    match chunk[0] % 8 {
        0 => StackEvent::SystemBoot,
        1 => StackEvent::ConnectionOpened { connection: a },
        2 => StackEvent::ConnectionClosed { connection: a, reason: b },
        3 => StackEvent::PawrSyncTransferReceived { sync: b, connection: a },
        4 => StackEvent::PawrSubeventReport {
            sync: b,
            event_counter: b.rotate_left(8),
            subevent: a,
        },
        5 => StackEvent::SyncClosed { sync: b, reason: b },
        6 => StackEvent::UserWriteRequest {
            connection: a,
            characteristic: b,
            value: heapless::Vec::from_slice(&chunk[1..2]).unwrap_or_default(),
        },
        _ => StackEvent::Unknown {
            header: u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
            data: heapless::Vec::new(),
        },
    }
}

fuzz_target!(|data: &[u8]| {
    let mut app = AppService::new(ResponderConfig::default());
    let mut hw = SimStack::new("fuzz");
    let mut sink = Discard;

    for chunk in data.chunks_exact(4) {
        if let Err(e) = app.handle_event(&decode(chunk), &mut hw, &mut sink) {
            assert!(!e.is_fatal(), "fatal error from a healthy stack: {}", e);
        }
    }
    assert!(app.main_advertisement().is_well_formed());
});
