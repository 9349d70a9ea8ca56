//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the lifecycle FSM and its context.  It is invoked once
//! per stack event, runs to completion, and issues every outbound command
//! through the port traits injected at the call site, so the whole lifecycle
//! is testable against a recording mock.
//!
//! ```text
//!   StackEvent ──▶ ┌────────────────────────┐ ──▶ StackPort
//!                  │       AppService        │
//!  AttributePort ─▶│  FSM · payload encoder  │ ──▶ EventSink
//!     ClockPort ──▶└────────────────────────┘
//! ```

use log::{debug, error, info, warn};

use crate::advertising::AdvertisingBuffer;
use crate::config::ResponderConfig;
use crate::error::{Error, Result};
use crate::events::{StackEvent, report_unhandled};
use crate::fsm::context::FsmContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};

use super::events::{AppEvent, ResponseRecord};
use super::ports::{
    AdvertisingPacket, Attribute, AttributePort, ClockPort, EventSink, PawrResponse, StackCommand,
    StackPort, StackStatus, att,
};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service sequences every outbound stack command.
pub struct AppService {
    fsm: Fsm,
    ctx: FsmContext,
    responses_sent: u64,
    /// First fatal error.  Once set, every event is refused.
    halted: Option<Error>,
}

impl AppService {
    /// Construct the service.  Nothing is sent until the boot event.
    pub fn new(config: ResponderConfig) -> Self {
        info!("app_init()");
        Self {
            fsm: Fsm::new(build_state_table(), StateId::Uninitialized),
            ctx: FsmContext::new(config),
            responses_sent: 0,
            halted: None,
        }
    }

    // ── Event entry point ─────────────────────────────────────

    /// Handle one stack event.
    ///
    /// The transition is resolved first; an illegal event returns
    /// [`Error::IllegalTransition`] without touching the stack.  The state
    /// only changes after every command for the event has succeeded.
    ///
    /// A fatal error halts the service: it is latched, and this and every
    /// later call return it without issuing any command.
    pub fn handle_event(
        &mut self,
        event: &StackEvent,
        hw: &mut (impl StackPort + AttributePort + ClockPort),
        sink: &mut impl EventSink,
    ) -> Result<()> {
        if let Some(e) = self.halted {
            debug!("Halted, refusing {:?}", event.kind());
            return Err(e);
        }
        self.dispatch(event, hw, sink).inspect_err(|e| {
            if e.is_fatal() {
                error!("Halting in {}: {}", self.fsm.current_name(), e);
                self.halted = Some(*e);
            }
        })
    }

    fn dispatch(
        &mut self,
        event: &StackEvent,
        hw: &mut (impl StackPort + AttributePort + ClockPort),
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let kind = event.kind();
        let from = self.fsm.current_state();
        let next = self.fsm.evaluate(kind, &self.ctx).inspect_err(|e| {
            warn!("{}", e);
        })?;

        match event {
            StackEvent::SystemBoot => {
                self.boot(hw)?;
                sink.emit(&AppEvent::Started {
                    advertising_set: self.ctx.advertising_set,
                    main_len: self.ctx.main_adv.len() as u8,
                    scan_response_len: self.ctx.scan_rsp.len() as u8,
                });
            }
            StackEvent::ConnectionOpened { connection } => {
                info!("evt_connection_opened: {}", connection);
                self.ctx.connection = *connection;
                self.ctx.connection_open = true;
            }
            StackEvent::ConnectionClosed { connection, reason } => {
                info!("evt_connection_closed: {} reason=0x{:04x}", connection, reason);
                if *connection == self.ctx.connection {
                    self.ctx.connection_open = false;
                }
                if next == StateId::Advertising && from != StateId::Advertising {
                    self.start_advertising(hw)?;
                }
            }
            StackEvent::PawrSyncTransferReceived { sync, connection } => {
                info!("evt_pawr_sync_transfer_received: sync={} via {}", sync, connection);
                check(
                    StackCommand::CloseConnection,
                    hw.close_connection(self.ctx.connection),
                )?;
            }
            StackEvent::PawrSubeventReport {
                sync,
                event_counter,
                subevent,
            } => {
                self.respond(*sync, *event_counter, *subevent, hw, sink)?;
            }
            StackEvent::SyncClosed { sync, reason } => {
                info!("evt_sync_closed: sync={} reason=0x{:04x}", sync, reason);
                if next == StateId::Advertising && from != StateId::Advertising {
                    self.start_advertising(hw)?;
                }
            }
            StackEvent::UserWriteRequest {
                connection,
                characteristic,
                value,
            } => {
                self.on_user_write(*connection, *characteristic, value, hw, sink)?;
            }
            StackEvent::Unknown { header, data } => report_unhandled(*header, data, sink),
        }

        if self.fsm.commit(next) {
            sink.emit(&AppEvent::StateChanged {
                from,
                to: next,
                cause: kind,
            });
        }
        Ok(())
    }

    /// Idle hook, called by the main loop between event batches.
    ///
    /// Must never block.  The responder has no background work.
    pub fn process_action(&mut self) {}

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// The fatal error that halted the service, if any.
    pub fn halted(&self) -> Option<Error> {
        self.halted
    }

    /// Committed state changes since startup.
    pub fn transitions(&self) -> u64 {
        self.fsm.transitions()
    }

    /// Advertising set handle, `0xFF` before boot.
    pub fn advertising_set(&self) -> u8 {
        self.ctx.advertising_set
    }

    /// Last connection handle, `0xFF` if never connected.  Not cleared on close.
    pub fn connection(&self) -> u8 {
        self.ctx.connection
    }

    pub fn connection_open(&self) -> bool {
        self.ctx.connection_open
    }

    /// Slot written by the central, if any.
    pub fn response_slot(&self) -> Option<u8> {
        self.ctx.response_slot
    }

    pub fn main_advertisement(&self) -> &AdvertisingBuffer {
        &self.ctx.main_adv
    }

    pub fn scan_response(&self) -> &AdvertisingBuffer {
        &self.ctx.scan_rsp
    }

    /// Subevent responses queued since startup.
    pub fn responses_sent(&self) -> u64 {
        self.responses_sent
    }

    pub fn config(&self) -> &ResponderConfig {
        &self.ctx.config
    }

    // ── Boot sequence ─────────────────────────────────────────

    fn boot(&mut self, hw: &mut (impl StackPort + AttributePort)) -> Result<()> {
        // Must precede every other command.
        check(
            StackCommand::SetSyncReceiveParameters,
            hw.set_default_sync_receive_parameters(&self.ctx.config.sync_receive),
        )?;

        let set = check(StackCommand::CreateAdvertisingSet, hw.create_advertising_set())?;
        self.ctx.advertising_set = set;

        self.build_payloads(&*hw)?;

        check(
            StackCommand::SetAdvertisingData,
            hw.set_advertising_data(set, AdvertisingPacket::Main, self.ctx.main_adv.as_bytes()),
        )?;
        check(
            StackCommand::SetAdvertisingData,
            hw.set_advertising_data(
                set,
                AdvertisingPacket::ScanResponse,
                self.ctx.scan_rsp.as_bytes(),
            ),
        )?;
        check(
            StackCommand::SetAdvertisingTiming,
            hw.set_advertising_timing(set, &self.ctx.config.advertising.timing()),
        )?;

        self.start_advertising(hw)
    }

    /// Main: flags + device name.  Scan response: manufacturer data carrying
    /// the address and name attribute handles, so a central can skip discovery.
    fn build_payloads(&mut self, store: &impl AttributePort) -> Result<()> {
        let name = store
            .attribute_handle(Attribute::DeviceName)
            .ok_or(Error::AttributeMissing(Attribute::DeviceName))?;
        let address = store
            .attribute_handle(Attribute::DeviceAddress)
            .ok_or(Error::AttributeMissing(Attribute::DeviceAddress))?;

        let ctx = &mut self.ctx;
        ctx.main_adv.reset();
        ctx.scan_rsp.reset();

        ctx.main_adv.append_flags(ctx.config.ad_flags)?;
        ctx.main_adv.append_local_name(store, name)?;
        ctx.scan_rsp.append_manufacturer_data(
            ctx.config.company_id,
            address,
            name,
            ctx.config.marker.as_bytes(),
        )?;

        info!(
            "Advertising payloads built: main={}B scan_rsp={}B",
            ctx.main_adv.len(),
            ctx.scan_rsp.len()
        );
        Ok(())
    }

    /// Restart on the boot-time set with the boot-time payloads.
    fn start_advertising(&mut self, hw: &mut impl StackPort) -> Result<()> {
        check(
            StackCommand::StartAdvertising,
            hw.start_connectable_advertising(self.ctx.advertising_set),
        )?;
        info!("Advertising started on set {}", self.ctx.advertising_set);
        Ok(())
    }

    // ── Responder ─────────────────────────────────────────────

    fn respond(
        &mut self,
        sync: u16,
        event_counter: u16,
        subevent: u8,
        hw: &mut (impl StackPort + ClockPort),
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let ticks = hw.tick_count();
        let payload = ticks.to_le_bytes();
        let response_slot = self.ctx.effective_response_slot();

        check(
            StackCommand::SetPawrResponseData,
            hw.set_pawr_response_data(&PawrResponse {
                sync,
                event_counter,
                request_subevent: subevent,
                response_subevent: subevent,
                response_slot,
                data: &payload,
            }),
        )?;

        self.responses_sent += 1;
        sink.emit(&AppEvent::ResponseSent(ResponseRecord {
            sync,
            event_counter,
            subevent,
            response_slot,
            ticks,
        }));
        Ok(())
    }

    fn on_user_write(
        &mut self,
        connection: u8,
        characteristic: u16,
        value: &[u8],
        hw: &mut (impl StackPort + AttributePort),
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let status = if hw.attribute_handle(Attribute::DeviceAddress) != Some(characteristic) {
            warn!("Write to unexpected characteristic {}", characteristic);
            att::WRITE_NOT_PERMITTED
        } else if let Some(&address) = value.first() {
            self.ctx.response_slot = Some(address);
            info!("GATT write address: {}", address);
            sink.emit(&AppEvent::ResponseSlotUpdated(address));
            att::SUCCESS
        } else {
            warn!("Empty write to address characteristic");
            att::INVALID_ATTRIBUTE_VALUE_LENGTH
        };

        check(
            StackCommand::SendWriteResponse,
            hw.send_user_write_response(connection, characteristic, status),
        )
    }
}

/// Map a stack status onto the fatal error, naming the command.
fn check<T>(command: StackCommand, result: core::result::Result<T, StackStatus>) -> Result<T> {
    result.map_err(|status| {
        error!("{} failed: {}", command, status);
        Error::stack(command, status)
    })
}
