//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! The wireless stack, the GATT attribute database and the platform clock
//! are external collaborators.  The [`AppService`](super::service::AppService)
//! consumes them via generics, so the lifecycle logic never touches a real
//! radio and runs unchanged against the host simulator or a test mock.
//!
//! Every stack command returns `Result<_, StackStatus>`.  A non-success
//! status is never retried by the domain; see [`crate::error::Error`].

use core::fmt;

use crate::config::SyncReceiveParams;

// ───────────────────────────────────────────────────────────────
// Stack vocabulary
// ───────────────────────────────────────────────────────────────

/// Non-success status code returned by a stack command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackStatus(pub u16);

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status 0x{:04x}", self.0)
    }
}

/// Identifies which outbound command failed, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackCommand {
    SetSyncReceiveParameters,
    CreateAdvertisingSet,
    SetAdvertisingData,
    SetAdvertisingTiming,
    StartAdvertising,
    StopAdvertising,
    CloseConnection,
    SetPawrResponseData,
    SendWriteResponse,
}

impl fmt::Display for StackCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SetSyncReceiveParameters => "set default sync receive parameters",
            Self::CreateAdvertisingSet => "create advertising set",
            Self::SetAdvertisingData => "set advertising data",
            Self::SetAdvertisingTiming => "set advertising timing",
            Self::StartAdvertising => "start advertising",
            Self::StopAdvertising => "stop advertising",
            Self::CloseConnection => "close connection",
            Self::SetPawrResponseData => "set PAwR response data",
            Self::SendWriteResponse => "send write response",
        };
        f.write_str(name)
    }
}

/// Which legacy advertising packet a payload is pushed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AdvertisingPacket {
    /// Primary advertisement.
    Main = 0,
    /// Scan response.
    ScanResponse = 1,
}

/// Advertising timing in stack units.
///
/// Intervals are in 0.625 ms units, duration in 10 ms units (0 = no limit),
/// `max_events` 0 = no limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisingTiming {
    pub interval_min: u32,
    pub interval_max: u32,
    pub duration: u16,
    pub max_events: u8,
}

/// One PAwR subevent response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PawrResponse<'a> {
    pub sync: u16,
    pub event_counter: u16,
    pub request_subevent: u8,
    pub response_subevent: u8,
    pub response_slot: u8,
    pub data: &'a [u8],
}

/// ATT status codes used when acknowledging writes.
pub mod att {
    pub const SUCCESS: u8 = 0x00;
    pub const WRITE_NOT_PERMITTED: u8 = 0x03;
    pub const INVALID_ATTRIBUTE_VALUE_LENGTH: u8 = 0x0D;
}

// ───────────────────────────────────────────────────────────────
// Stack port (driven adapter: domain → radio)
// ───────────────────────────────────────────────────────────────

/// Outbound commands to the wireless stack.
///
/// No method may be called before the stack has delivered its boot event.
pub trait StackPort {
    /// Configure how a transferred periodic sync is received.
    fn set_default_sync_receive_parameters(
        &mut self,
        params: &SyncReceiveParams,
    ) -> Result<(), StackStatus>;

    /// Allocate an advertising set and return its handle.
    fn create_advertising_set(&mut self) -> Result<u8, StackStatus>;

    /// Push raw AD bytes into the given packet of an advertising set.
    fn set_advertising_data(
        &mut self,
        set: u8,
        packet: AdvertisingPacket,
        data: &[u8],
    ) -> Result<(), StackStatus>;

    fn set_advertising_timing(
        &mut self,
        set: u8,
        timing: &AdvertisingTiming,
    ) -> Result<(), StackStatus>;

    /// Start legacy connectable, scannable advertising.
    fn start_connectable_advertising(&mut self, set: u8) -> Result<(), StackStatus>;

    /// Stop advertising on `set`.
    ///
    /// Reserved: the lifecycle never stops advertising explicitly, since the
    /// stack ends connectable advertising itself when a central connects.
    fn stop_advertising(&mut self, set: u8) -> Result<(), StackStatus> {
        let _ = set;
        Ok(())
    }

    fn close_connection(&mut self, connection: u8) -> Result<(), StackStatus>;

    /// Queue response data for one subevent of a synchronized PAwR train.
    fn set_pawr_response_data(&mut self, response: &PawrResponse<'_>) -> Result<(), StackStatus>;

    /// Acknowledge a user-handled attribute write.
    fn send_user_write_response(
        &mut self,
        connection: u8,
        characteristic: u16,
        att_status: u8,
    ) -> Result<(), StackStatus>;
}

// ───────────────────────────────────────────────────────────────
// Attribute port (driven adapter: domain ↔ GATT database)
// ───────────────────────────────────────────────────────────────

/// Attributes the responder looks up by symbolic name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Human-readable device name (Generic Access).
    DeviceName,
    /// Characteristic written by the central to assign the response slot.
    DeviceAddress,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceName => f.write_str("device_name"),
            Self::DeviceAddress => f.write_str("address"),
        }
    }
}

/// Errors from [`AttributePort::read_attribute_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeError {
    /// No attribute with this handle.
    InvalidHandle,
    /// Offset is past the end of the value.
    InvalidOffset,
    /// The attribute value cannot be read locally.
    ReadNotPermitted,
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandle => write!(f, "invalid handle"),
            Self::InvalidOffset => write!(f, "invalid offset"),
            Self::ReadNotPermitted => write!(f, "read not permitted"),
        }
    }
}

pub trait AttributePort {
    /// Resolve the database handle of a named attribute.
    fn attribute_handle(&self, attribute: Attribute) -> Option<u16>;

    /// Copy at most `buf.len()` bytes of the value starting at `offset`.
    /// Returns the number of bytes written.
    fn read_attribute_value(
        &self,
        handle: u16,
        offset: u16,
        buf: &mut [u8],
    ) -> Result<usize, AttributeError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Free-running platform tick counter (wraps at `u32::MAX`).
pub trait ClockPort {
    fn tick_count(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
