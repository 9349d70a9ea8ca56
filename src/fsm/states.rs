//! Concrete state handler functions and table builder.
//!
//! Each state is one plain `fn` pointer that maps an [`EventKind`] to a
//! [`Verdict`].  Handlers only decide; the stack commands that go with a
//! transition are issued by [`AppService`](crate::app::service::AppService).
//!
//! ```text
//!  UNINITIALIZED ──[boot]──▶ ADVERTISING ──[conn opened]──▶ CONNECTED
//!                                 ▲  │                          │
//!                                 │  └──[sync transfer]──┐      │
//!                                 │                      ▼      │
//!                                 │                SYNC_PENDING ◀┘[sync transfer]
//!                                 │                      │
//!                                 │               [subevent report]
//!                                 │                      ▼
//!                                 └──[sync closed]── SYNC_ACTIVE ⟲ [subevent report]
//! ```
//!
//! A sync transfer while synchronized re-enters SYNC_PENDING.
//!
//! Connection-closed never changes state on its own: the link being up and
//! the advertiser running are tracked independently.  The only exception is
//! `Connected` with `readvertise_on_disconnect` set.

use super::context::FsmContext;
use super::{EventKind, StateDescriptor, StateId, Verdict};
use log::debug;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once per service.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Uninitialized
        StateDescriptor {
            id: StateId::Uninitialized,
            name: "Uninitialized",
            on_event: uninitialized_event,
        },
        // Index 1: Advertising
        StateDescriptor {
            id: StateId::Advertising,
            name: "Advertising",
            on_event: advertising_event,
        },
        // Index 2: Connected
        StateDescriptor {
            id: StateId::Connected,
            name: "Connected",
            on_event: connected_event,
        },
        // Index 3: SyncPending
        StateDescriptor {
            id: StateId::SyncPending,
            name: "SyncPending",
            on_event: sync_pending_event,
        },
        // Index 4: SyncActive
        StateDescriptor {
            id: StateId::SyncActive,
            name: "SyncActive",
            on_event: sync_active_event,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  UNINITIALIZED: nothing may be sent before the boot event
// ═══════════════════════════════════════════════════════════════════════════

fn uninitialized_event(_ctx: &FsmContext, event: EventKind) -> Verdict {
    match event {
        EventKind::Boot => Verdict::Goto(StateId::Advertising),
        EventKind::Unknown => Verdict::Stay,
        _ => Verdict::Illegal,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ADVERTISING: connectable advertising on the boot-time set
// ═══════════════════════════════════════════════════════════════════════════

fn advertising_event(ctx: &FsmContext, event: EventKind) -> Verdict {
    match event {
        EventKind::ConnectionOpened => Verdict::Goto(StateId::Connected),
        EventKind::SyncTransferReceived => sync_transfer(ctx),
        EventKind::SyncClosed => {
            debug!("ADVERTISING: ignoring stale sync-closed");
            Verdict::Stay
        }
        EventKind::ConnectionClosed | EventKind::AttributeWrite | EventKind::Unknown => {
            Verdict::Stay
        }
        EventKind::Boot | EventKind::SubeventReport => Verdict::Illegal,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONNECTED: central is configuring us before handing over its sync
// ═══════════════════════════════════════════════════════════════════════════

fn connected_event(ctx: &FsmContext, event: EventKind) -> Verdict {
    match event {
        EventKind::SyncTransferReceived => sync_transfer(ctx),
        EventKind::ConnectionClosed if ctx.config.readvertise_on_disconnect => {
            Verdict::Goto(StateId::Advertising)
        }
        EventKind::ConnectionClosed
        | EventKind::SyncClosed
        | EventKind::AttributeWrite
        | EventKind::Unknown => Verdict::Stay,
        // Single connection only.
        EventKind::ConnectionOpened => Verdict::Illegal,
        EventKind::Boot | EventKind::SubeventReport => Verdict::Illegal,
    }
}

/// A transfer arrives over a connection; without one there is nothing to close.
fn sync_transfer(ctx: &FsmContext) -> Verdict {
    if ctx.has_connection_handle() {
        Verdict::Goto(StateId::SyncPending)
    } else {
        Verdict::Illegal
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  SYNC_PENDING: synchronized, waiting for the first subevent report
// ═══════════════════════════════════════════════════════════════════════════

fn sync_pending_event(ctx: &FsmContext, event: EventKind) -> Verdict {
    synchronized_event(ctx, event)
}

// ═══════════════════════════════════════════════════════════════════════════
//  SYNC_ACTIVE: answering every subevent
// ═══════════════════════════════════════════════════════════════════════════

fn sync_active_event(ctx: &FsmContext, event: EventKind) -> Verdict {
    synchronized_event(ctx, event)
}

fn synchronized_event(ctx: &FsmContext, event: EventKind) -> Verdict {
    match event {
        EventKind::SubeventReport => Verdict::Goto(StateId::SyncActive),
        EventKind::SyncClosed => Verdict::Goto(StateId::Advertising),
        // A fresh transfer replaces the current sync.
        EventKind::SyncTransferReceived => sync_transfer(ctx),
        EventKind::ConnectionClosed | EventKind::AttributeWrite | EventKind::Unknown => {
            Verdict::Stay
        }
        EventKind::Boot | EventKind::ConnectionOpened => Verdict::Illegal,
    }
}
