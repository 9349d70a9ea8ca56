//! Shared mutable context threaded through state handlers.
//!
//! Everything the lifecycle needs between events lives here: the handles
//! allocated by the stack, the response slot, and the two advertising
//! payloads built at boot.  One context per [`AppService`](crate::app::service::AppService);
//! there is no process-wide state.

use crate::advertising::AdvertisingBuffer;
use crate::config::ResponderConfig;

/// Stack handles use `0xFF` for "none".
pub const NO_HANDLE: u8 = 0xFF;

pub struct FsmContext {
    pub config: ResponderConfig,

    // ── Stack resources ──────────────────────────────────────
    /// Advertising set allocated at boot, reused for every restart.
    pub advertising_set: u8,
    /// Last connection handle reported by the stack.  Kept after the link
    /// closes; only `connection_open` tracks liveness.
    pub connection: u8,
    pub connection_open: bool,

    // ── Responder ────────────────────────────────────────────
    /// Slot assigned by the central, `None` until first written.
    pub response_slot: Option<u8>,

    // ── Advertising payloads (built once at boot) ───────────
    pub main_adv: AdvertisingBuffer,
    pub scan_rsp: AdvertisingBuffer,
}

impl FsmContext {
    pub fn new(config: ResponderConfig) -> Self {
        Self {
            config,
            advertising_set: NO_HANDLE,
            connection: NO_HANDLE,
            connection_open: false,
            response_slot: None,
            main_adv: AdvertisingBuffer::new(),
            scan_rsp: AdvertisingBuffer::new(),
        }
    }

    /// Whether the stack ever reported a connection.
    pub fn has_connection_handle(&self) -> bool {
        self.connection != NO_HANDLE
    }

    /// Slot for the next subevent response.
    pub fn effective_response_slot(&self) -> u8 {
        self.response_slot
            .unwrap_or(self.config.default_response_slot)
    }
}
