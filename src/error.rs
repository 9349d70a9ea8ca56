//! Unified error type for the responder.
//!
//! Every fallible operation funnels into [`Error`].  All variants are `Copy`
//! so they travel through the dispatcher and event sink without allocation.
//!
//! Only [`Error::IllegalTransition`] is recoverable: it means an event arrived
//! in a state where it has no meaning, and the dispatcher drops it.  Everything
//! else indicates a programming or configuration defect and halts the device.

use core::fmt;

use crate::advertising::CapacityError;
use crate::app::ports::{Attribute, AttributeError, StackCommand, StackStatus};
use crate::fsm::{EventKind, StateId};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A stack command returned a non-success status.
    Stack {
        command: StackCommand,
        status: StackStatus,
    },
    /// Reading an attribute value from the GATT database failed.
    AttributeRead { handle: u16, error: AttributeError },
    /// The GATT database has no handle for a required attribute.
    AttributeMissing(Attribute),
    /// An advertising element did not fit in its 31-byte buffer.
    Capacity(CapacityError),
    /// The event has no transition from the current state.
    IllegalTransition { state: StateId, event: EventKind },
}

impl Error {
    pub(crate) const fn stack(command: StackCommand, status: StackStatus) -> Self {
        Self::Stack { command, status }
    }

    /// Whether the device must halt on this error.
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::IllegalTransition { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stack { command, status } => write!(f, "{command} failed: {status}"),
            Self::AttributeRead { handle, error } => {
                write!(f, "attribute read (handle {handle}) failed: {error}")
            }
            Self::AttributeMissing(attr) => {
                write!(f, "attribute {attr} missing from GATT database")
            }
            Self::Capacity(e) => write!(f, "advertising payload: {e}"),
            Self::IllegalTransition { state, event } => {
                write!(f, "illegal transition: {event:?} in state {state:?}")
            }
        }
    }
}

impl From<CapacityError> for Error {
    fn from(e: CapacityError) -> Self {
        Self::Capacity(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
