//! Table-driven lifecycle state machine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  StateTable                                          │
//! │  ┌────────────────┬───────────────────────────────┐  │
//! │  │ StateId        │ on_event                      │  │
//! │  ├────────────────┼───────────────────────────────┤  │
//! │  │ Uninitialized  │ fn(ctx, EventKind) -> Verdict │  │
//! │  │ Advertising    │ fn(ctx, EventKind) -> Verdict │  │
//! │  │ Connected      │ fn(ctx, EventKind) -> Verdict │  │
//! │  │ SyncPending    │ fn(ctx, EventKind) -> Verdict │  │
//! │  │ SyncActive     │ fn(ctx, EventKind) -> Verdict │  │
//! │  └────────────────┴───────────────────────────────┘  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! The engine is two-phase.  [`Fsm::evaluate`] asks the current state's
//! handler what an event means and fails with
//! [`Error::IllegalTransition`] when it means nothing.  The caller then
//! performs the stack commands for the event and only afterwards calls
//! [`Fsm::commit`], so a failed command never leaves the machine in a state
//! whose entry actions did not happen.

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all lifecycle states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Uninitialized = 0,
    Advertising = 1,
    Connected = 2,
    SyncPending = 3,
    SyncActive = 4,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 5;

    pub const ALL: [StateId; Self::COUNT] = [
        Self::Uninitialized,
        Self::Advertising,
        Self::Connected,
        Self::SyncPending,
        Self::SyncActive,
    ];

    /// Convert an index back to `StateId`.  Panics on out-of-range in
    /// debug builds; returns `Uninitialized` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Uninitialized,
            1 => Self::Advertising,
            2 => Self::Connected,
            3 => Self::SyncPending,
            4 => Self::SyncActive,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Uninitialized
            }
        }
    }
}

/// Event discriminant the transition table is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Boot,
    ConnectionOpened,
    ConnectionClosed,
    SyncTransferReceived,
    SubeventReport,
    SyncClosed,
    AttributeWrite,
    Unknown,
}

/// What a state handler decided for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Handle the event, stay in the current state.
    Stay,
    /// Handle the event, then move to the given state.
    Goto(StateId),
    /// The event has no meaning here.
    Illegal,
}

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Signature for the per-event handler.
pub type StateEventFn = fn(&FsmContext, EventKind) -> Verdict;

/// Static descriptor for a single FSM state.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_event: StateEventFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
    transitions: u64,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
            transitions: 0,
        }
    }

    /// Resolve the state `event` leads to from the current state.
    pub fn evaluate(&self, event: EventKind, ctx: &FsmContext) -> Result<StateId> {
        let state = self.current_state();
        match (self.table[self.current].on_event)(ctx, event) {
            Verdict::Stay => Ok(state),
            Verdict::Goto(next) => Ok(next),
            Verdict::Illegal => Err(Error::IllegalTransition { state, event }),
        }
    }

    /// Move to `next`.  Returns `true` when the state actually changed.
    pub fn commit(&mut self, next: StateId) -> bool {
        let next_idx = next as usize;
        if next_idx == self.current {
            return false;
        }
        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );
        self.current = next_idx;
        self.transitions += 1;
        true
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    pub fn current_name(&self) -> &'static str {
        self.table[self.current].name
    }

    /// Number of committed state changes since construction.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }
}
