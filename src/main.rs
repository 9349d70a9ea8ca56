//! PAwR Responder: host simulation entry point.
//!
//! Replays a complete responder lifecycle against the simulated stack:
//! boot, a central connecting and assigning a slot, the PAwR sync handover,
//! a run of subevents, and sync loss.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SimStack (Stack+Attribute+Clock)   LogEventSink (EventSink)   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  FSM · AD encoder · subevent responder                 │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  EventDispatcher (bounded queue, run-to-completion)            │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `pawr-responder [config.json | config.bin]`
//!
//! A `.json` file is parsed as JSON; anything else as a stored postcard blob.
#![deny(unused_must_use)]

use anyhow::{Context, Result, bail};
use log::{error, info, warn};

use pawr_responder::adapters::log_sink::LogEventSink;
use pawr_responder::adapters::sim_stack::{ADDRESS_HANDLE, SimStack};
use pawr_responder::app::service::AppService;
use pawr_responder::config::ResponderConfig;
use pawr_responder::events::{EventDispatcher, StackEvent};

const DEVICE_NAME: &str = "PAwR Responder";
const CONNECTION: u8 = 1;
const SYNC: u16 = 0;
const SUBEVENTS: u8 = 4;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("╔══════════════════════════════════════╗");
    info!("║  PAwR Responder v{}               ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = load_config()?;
    if let Err(e) = config.validate() {
        bail!("invalid configuration: {}", e);
    }

    let mut hw = SimStack::new(DEVICE_NAME);
    let mut sink = LogEventSink::new();
    let mut app = AppService::new(config);
    let dispatcher = EventDispatcher::new();

    let mut script = lifecycle_script()?.into_iter();
    loop {
        // Feed the stack's events in small batches, as its callbacks would.
        let mut fed = false;
        for event in script.by_ref().take(3) {
            if matches!(event, StackEvent::ConnectionOpened { .. }) {
                hw.on_connected();
            }
            if let Err(event) = dispatcher.push(event) {
                warn!("Dropped {:?}", event.kind());
            }
            fed = true;
        }
        if !fed {
            break;
        }

        if let Err(e) = dispatcher.pump(&mut app, &mut hw, &mut sink) {
            // On hardware this halts the responder.
            error!("Fatal: {} (state {:?})", e, app.state());
            return Err(anyhow::anyhow!(e));
        }
    }

    info!(
        "Done: state={:?} transitions={} responses={} slot={:?} commands={}",
        app.state(),
        app.transitions(),
        app.responses_sent(),
        app.response_slot(),
        hw.commands().len()
    );
    Ok(())
}

fn load_config() -> Result<ResponderConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let bytes = std::fs::read(&path).with_context(|| format!("reading config {}", path))?;
            let config: ResponderConfig = if path.ends_with(".json") {
                serde_json::from_slice(&bytes)
                    .map_err(|e| anyhow::anyhow!("parsing config {}: {}", path, e))?
            } else {
                ResponderConfig::from_blob(&bytes)
                    .map_err(|e| anyhow::anyhow!("config blob {}: {}", path, e))?
            };
            info!("Config loaded from {}", path);
            Ok(config)
        }
        None => {
            info!("Using default config");
            Ok(ResponderConfig::default())
        }
    }
}

fn lifecycle_script() -> Result<Vec<StackEvent>> {
    let slot = heapless::Vec::from_slice(&[2]).map_err(|_| anyhow::anyhow!("slot value"))?;

    let mut events = vec![
        StackEvent::SystemBoot,
        StackEvent::ConnectionOpened {
            connection: CONNECTION,
        },
        StackEvent::UserWriteRequest {
            connection: CONNECTION,
            characteristic: ADDRESS_HANDLE,
            value: slot,
        },
        StackEvent::PawrSyncTransferReceived {
            sync: SYNC,
            connection: CONNECTION,
        },
        StackEvent::ConnectionClosed {
            connection: CONNECTION,
            reason: 0x0216,
        },
    ];
    for counter in 0..SUBEVENTS {
        events.push(StackEvent::PawrSubeventReport {
            sync: SYNC,
            event_counter: counter as u16,
            subevent: counter % 2,
        });
    }
    events.push(StackEvent::SyncClosed {
        sync: SYNC,
        reason: 0x0213,
    });
    Ok(events)
}
