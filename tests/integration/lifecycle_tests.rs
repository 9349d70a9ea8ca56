//! Integration tests for the stack event → FSM → stack command pipeline.
//!
//! Drives an [`AppService`] through the responder lifecycle against the
//! recording [`MockStack`] and checks the exact commands issued per event.

use pretty_assertions::assert_eq;

use pawr_responder::Error;
use pawr_responder::adapters::sim_stack::{SimCommand, SimStack};
use pawr_responder::app::events::AppEvent;
use pawr_responder::app::ports::{
    AdvertisingPacket, AdvertisingTiming, Attribute, AttributeError, StackCommand, StackStatus,
};
use pawr_responder::app::service::AppService;
use pawr_responder::config::ResponderConfig;
use pawr_responder::events::StackEvent;
use pawr_responder::fsm::{EventKind, StateId};

use super::mock_stack::{ADDRESS_HANDLE, ADV_SET, Call, MockStack, NAME_HANDLE, RecordingSink};

const CONN: u8 = 3;

fn make_app() -> (AppService, MockStack, RecordingSink) {
    (
        AppService::new(ResponderConfig::default()),
        MockStack::new(),
        RecordingSink::new(),
    )
}

fn subevent(event_counter: u16, subevent: u8) -> StackEvent {
    StackEvent::PawrSubeventReport {
        sync: 5,
        event_counter,
        subevent,
    }
}

/// Boot, connect, take the sync transfer, receive one subevent.
fn to_sync_active(app: &mut AppService, hw: &mut MockStack, sink: &mut RecordingSink) {
    for event in [
        StackEvent::SystemBoot,
        StackEvent::ConnectionOpened { connection: CONN },
        StackEvent::PawrSyncTransferReceived {
            sync: 5,
            connection: CONN,
        },
        subevent(0, 0),
    ] {
        app.handle_event(&event, hw, sink).unwrap();
    }
    assert_eq!(app.state(), StateId::SyncActive);
    hw.clear();
    sink.events.clear();
}

fn expected_main() -> Vec<u8> {
    vec![0x02, 0x01, 0x06, 0x05, 0x09, b'P', b'A', b'w', b'R']
}

fn expected_scan_response() -> Vec<u8> {
    let mut v = vec![
        21,
        0xFF,
        0xFF,
        0x02,
        ADDRESS_HANDLE as u8,
        0x00,
        NAME_HANDLE as u8,
        0x00,
    ];
    v.extend_from_slice(b"WWSJ PAwR Demo");
    v
}

// ── Scenario 1: boot ──────────────────────────────────────────

#[test]
fn boot_configures_and_starts_advertising() {
    let (mut app, mut hw, mut sink) = make_app();
    app.handle_event(&StackEvent::SystemBoot, &mut hw, &mut sink)
        .unwrap();

    assert_eq!(
        hw.calls,
        vec![
            Call::SyncParams(ResponderConfig::default().sync_receive),
            Call::CreateSet,
            Call::SetData(ADV_SET, AdvertisingPacket::Main, expected_main()),
            Call::SetData(ADV_SET, AdvertisingPacket::ScanResponse, expected_scan_response()),
            Call::Timing(
                ADV_SET,
                AdvertisingTiming {
                    interval_min: 160,
                    interval_max: 160,
                    duration: 0,
                    max_events: 0,
                }
            ),
            Call::StartAdvertising(ADV_SET),
        ]
    );
    assert_eq!(app.state(), StateId::Advertising);
    assert_eq!(app.advertising_set(), ADV_SET);
    assert_eq!(app.scan_response().len(), 22);
    assert_eq!(
        sink.events,
        vec![
            AppEvent::Started {
                advertising_set: ADV_SET,
                main_len: 9,
                scan_response_len: 22,
            },
            AppEvent::StateChanged {
                from: StateId::Uninitialized,
                to: StateId::Advertising,
                cause: EventKind::Boot,
            },
        ]
    );
}

#[test]
fn sync_receive_parameters_go_first() {
    let (mut app, mut hw, mut sink) = make_app();
    app.handle_event(&StackEvent::SystemBoot, &mut hw, &mut sink)
        .unwrap();
    assert!(matches!(hw.calls.first(), Some(Call::SyncParams(_))));
}

#[test]
fn names_up_to_26_bytes_fit_the_main_advertisement() {
    for len in [0usize, 1, 12, 26] {
        let mut hw = MockStack::with_name(&vec![b'n'; len]);
        let mut app = AppService::new(ResponderConfig::default());
        app.handle_event(&StackEvent::SystemBoot, &mut hw, &mut RecordingSink::new())
            .unwrap();
        assert_eq!(app.main_advertisement().len(), 3 + 2 + len);
        assert!(app.main_advertisement().len() <= 31);
        assert!(app.main_advertisement().is_well_formed());
    }
}

#[test]
fn long_names_are_truncated_to_capacity() {
    let mut hw = MockStack::with_name(&[b'x'; 40]);
    let mut app = AppService::new(ResponderConfig::default());
    app.handle_event(&StackEvent::SystemBoot, &mut hw, &mut RecordingSink::new())
        .unwrap();
    assert_eq!(app.main_advertisement().len(), 31);
    assert_eq!(app.main_advertisement().as_bytes()[3], 27);
}

// ── Scenario 2: connection opened ─────────────────────────────

#[test]
fn connection_opened_records_handle() {
    let (mut app, mut hw, mut sink) = make_app();
    app.handle_event(&StackEvent::SystemBoot, &mut hw, &mut sink)
        .unwrap();
    hw.clear();

    app.handle_event(&StackEvent::ConnectionOpened { connection: CONN }, &mut hw, &mut sink)
        .unwrap();

    assert_eq!(app.connection(), CONN);
    assert!(app.connection_open());
    assert_eq!(app.state(), StateId::Connected);
    assert!(hw.calls.is_empty(), "opening a connection issues no commands");
}

// ── Scenario 3: sync transfer ─────────────────────────────────

#[test]
fn sync_transfer_closes_the_stored_connection() {
    let (mut app, mut hw, mut sink) = make_app();
    app.handle_event(&StackEvent::SystemBoot, &mut hw, &mut sink)
        .unwrap();
    app.handle_event(&StackEvent::ConnectionOpened { connection: CONN }, &mut hw, &mut sink)
        .unwrap();
    hw.clear();

    app.handle_event(
        &StackEvent::PawrSyncTransferReceived {
            sync: 5,
            connection: CONN,
        },
        &mut hw,
        &mut sink,
    )
    .unwrap();

    assert_eq!(hw.calls, vec![Call::Close(CONN)]);
    assert_eq!(app.state(), StateId::SyncPending);
}

#[test]
fn sync_transfer_while_synchronized_restarts_the_sync() {
    let (mut app, mut hw, mut sink) = make_app();
    to_sync_active(&mut app, &mut hw, &mut sink);

    app.handle_event(
        &StackEvent::PawrSyncTransferReceived {
            sync: 6,
            connection: CONN,
        },
        &mut hw,
        &mut sink,
    )
    .unwrap();

    assert_eq!(hw.calls, vec![Call::Close(CONN)]);
    assert_eq!(app.state(), StateId::SyncPending);

    // The new sync is answered as usual.
    hw.clear();
    app.handle_event(&subevent(1, 0), &mut hw, &mut sink).unwrap();
    assert_eq!(app.state(), StateId::SyncActive);
    assert_eq!(hw.responses().len(), 1);
}

// ── Scenario 4: subevent response ─────────────────────────────

#[test]
fn subevent_is_answered_in_the_same_subevent() {
    let (mut app, mut hw, mut sink) = make_app();
    to_sync_active(&mut app, &mut hw, &mut sink);
    app.handle_event(
        &StackEvent::UserWriteRequest {
            connection: CONN,
            characteristic: ADDRESS_HANDLE,
            value: heapless::Vec::from_slice(&[9]).unwrap(),
        },
        &mut hw,
        &mut sink,
    )
    .unwrap();
    hw.clear();
    hw.ticks = 0x0102_0304;

    app.handle_event(&subevent(42, 7), &mut hw, &mut sink).unwrap();

    assert_eq!(
        hw.calls,
        vec![Call::Response {
            sync: 5,
            event_counter: 42,
            request_subevent: 7,
            response_subevent: 7,
            slot: 9,
            data: vec![0x04, 0x03, 0x02, 0x01],
        }]
    );
    assert_eq!(app.state(), StateId::SyncActive);
}

#[test]
fn responses_use_the_default_slot_until_written() {
    let (mut app, mut hw, mut sink) = make_app();
    to_sync_active(&mut app, &mut hw, &mut sink);
    app.handle_event(&subevent(1, 3), &mut hw, &mut sink).unwrap();
    assert!(matches!(hw.last_call(), Some(Call::Response { slot: 0, .. })));
    assert_eq!(app.responses_sent(), 2);
}

#[test]
fn first_subevent_moves_pending_to_active() {
    let (mut app, mut hw, mut sink) = make_app();
    for event in [
        StackEvent::SystemBoot,
        StackEvent::ConnectionOpened { connection: CONN },
        StackEvent::PawrSyncTransferReceived {
            sync: 5,
            connection: CONN,
        },
    ] {
        app.handle_event(&event, &mut hw, &mut sink).unwrap();
    }
    assert_eq!(app.state(), StateId::SyncPending);
    app.handle_event(&subevent(0, 0), &mut hw, &mut sink).unwrap();
    assert_eq!(app.state(), StateId::SyncActive);
}

// ── Scenario 5: sync lost ─────────────────────────────────────

#[test]
fn sync_closed_restarts_advertising_without_rebuild() {
    let (mut app, mut hw, mut sink) = make_app();
    to_sync_active(&mut app, &mut hw, &mut sink);
    let main = app.main_advertisement().clone();
    let scan = app.scan_response().clone();

    app.handle_event(&StackEvent::SyncClosed { sync: 5, reason: 0x3E }, &mut hw, &mut sink)
        .unwrap();

    assert_eq!(hw.calls, vec![Call::StartAdvertising(ADV_SET)]);
    assert_eq!(app.state(), StateId::Advertising);
    assert_eq!(app.main_advertisement(), &main);
    assert_eq!(app.scan_response(), &scan);
}

#[test]
fn sync_closed_while_pending_restarts_advertising() {
    let (mut app, mut hw, mut sink) = make_app();
    for event in [
        StackEvent::SystemBoot,
        StackEvent::ConnectionOpened { connection: CONN },
        StackEvent::PawrSyncTransferReceived {
            sync: 5,
            connection: CONN,
        },
    ] {
        app.handle_event(&event, &mut hw, &mut sink).unwrap();
    }
    hw.clear();
    app.handle_event(&StackEvent::SyncClosed { sync: 5, reason: 0 }, &mut hw, &mut sink)
        .unwrap();
    assert_eq!(hw.calls, vec![Call::StartAdvertising(ADV_SET)]);
    assert_eq!(app.state(), StateId::Advertising);
}

#[test]
fn full_cycle_can_repeat() {
    let (mut app, mut hw, mut sink) = make_app();
    to_sync_active(&mut app, &mut hw, &mut sink);
    app.handle_event(&StackEvent::SyncClosed { sync: 5, reason: 0 }, &mut hw, &mut sink)
        .unwrap();
    app.handle_event(&StackEvent::ConnectionOpened { connection: 4 }, &mut hw, &mut sink)
        .unwrap();
    app.handle_event(
        &StackEvent::PawrSyncTransferReceived {
            sync: 6,
            connection: 4,
        },
        &mut hw,
        &mut sink,
    )
    .unwrap();
    assert_eq!(hw.last_call(), Some(&Call::Close(4)));
    assert_eq!(app.state(), StateId::SyncPending);
}

// ── Connection closed ─────────────────────────────────────────

#[test]
fn connection_closed_leaves_a_stale_handle() {
    let (mut app, mut hw, mut sink) = make_app();
    app.handle_event(&StackEvent::SystemBoot, &mut hw, &mut sink)
        .unwrap();
    app.handle_event(&StackEvent::ConnectionOpened { connection: CONN }, &mut hw, &mut sink)
        .unwrap();
    hw.clear();

    app.handle_event(
        &StackEvent::ConnectionClosed {
            connection: CONN,
            reason: 0x13,
        },
        &mut hw,
        &mut sink,
    )
    .unwrap();

    assert_eq!(app.state(), StateId::Connected);
    assert_eq!(app.connection(), CONN);
    assert!(!app.connection_open());
    assert!(hw.calls.is_empty());
}

#[test]
fn connection_closed_after_transfer_keeps_sync_state() {
    let (mut app, mut hw, mut sink) = make_app();
    to_sync_active(&mut app, &mut hw, &mut sink);
    app.handle_event(
        &StackEvent::ConnectionClosed {
            connection: CONN,
            reason: 0x16,
        },
        &mut hw,
        &mut sink,
    )
    .unwrap();
    assert_eq!(app.state(), StateId::SyncActive);
    assert!(hw.calls.is_empty());
}

#[test]
fn readvertise_on_disconnect_restarts_advertising() {
    let config = ResponderConfig {
        readvertise_on_disconnect: true,
        ..Default::default()
    };
    let mut app = AppService::new(config);
    let mut hw = MockStack::new();
    let mut sink = RecordingSink::new();
    app.handle_event(&StackEvent::SystemBoot, &mut hw, &mut sink)
        .unwrap();
    app.handle_event(&StackEvent::ConnectionOpened { connection: CONN }, &mut hw, &mut sink)
        .unwrap();
    hw.clear();

    app.handle_event(
        &StackEvent::ConnectionClosed {
            connection: CONN,
            reason: 0x13,
        },
        &mut hw,
        &mut sink,
    )
    .unwrap();

    assert_eq!(hw.calls, vec![Call::StartAdvertising(ADV_SET)]);
    assert_eq!(app.state(), StateId::Advertising);
}

// ── Illegal transitions ───────────────────────────────────────

#[test]
fn subevent_before_boot_is_illegal_and_silent() {
    let (mut app, mut hw, mut sink) = make_app();
    let err = app.handle_event(&subevent(0, 0), &mut hw, &mut sink).unwrap_err();
    assert_eq!(
        err,
        Error::IllegalTransition {
            state: StateId::Uninitialized,
            event: EventKind::SubeventReport,
        }
    );
    assert!(!err.is_fatal());
    assert!(hw.calls.is_empty());
    assert!(sink.events.is_empty());
    assert_eq!(app.state(), StateId::Uninitialized);
}

#[test]
fn second_boot_is_illegal() {
    let (mut app, mut hw, mut sink) = make_app();
    app.handle_event(&StackEvent::SystemBoot, &mut hw, &mut sink)
        .unwrap();
    hw.clear();
    let err = app
        .handle_event(&StackEvent::SystemBoot, &mut hw, &mut sink)
        .unwrap_err();
    assert!(matches!(err, Error::IllegalTransition { .. }));
    assert!(hw.calls.is_empty());
}

#[test]
fn spurious_sync_closed_while_advertising_is_ignored() {
    let (mut app, mut hw, mut sink) = make_app();
    app.handle_event(&StackEvent::SystemBoot, &mut hw, &mut sink)
        .unwrap();
    hw.clear();
    app.handle_event(&StackEvent::SyncClosed { sync: 1, reason: 0 }, &mut hw, &mut sink)
        .unwrap();
    assert!(hw.calls.is_empty());
    assert_eq!(app.state(), StateId::Advertising);
}

#[test]
fn unknown_events_are_reported_in_any_state() {
    let (mut app, mut hw, mut sink) = make_app();
    let unknown = StackEvent::Unknown {
        header: 0x0400_00A0,
        data: heapless::Vec::from_slice(&[1, 2, 3]).unwrap(),
    };
    app.handle_event(&unknown, &mut hw, &mut sink).unwrap();
    assert_eq!(sink.events, vec![AppEvent::Unhandled { header: 0x0400_00A0 }]);
    assert_eq!(app.state(), StateId::Uninitialized);
    assert!(hw.calls.is_empty());
}

// ── Fatal errors ──────────────────────────────────────────────

#[test]
fn failed_start_is_fatal_and_keeps_state() {
    let mut hw = MockStack::failing(StackCommand::StartAdvertising, 0x0181);
    let mut app = AppService::new(ResponderConfig::default());
    let mut sink = RecordingSink::new();

    let err = app
        .handle_event(&StackEvent::SystemBoot, &mut hw, &mut sink)
        .unwrap_err();

    assert_eq!(
        err,
        Error::Stack {
            command: StackCommand::StartAdvertising,
            status: StackStatus(0x0181),
        }
    );
    assert!(err.is_fatal());
    assert_eq!(app.state(), StateId::Uninitialized);
    assert!(sink.events.is_empty());
}

#[test]
fn failed_sync_parameters_stop_the_boot_sequence() {
    let mut hw = MockStack::failing(StackCommand::SetSyncReceiveParameters, 0x0002);
    let mut app = AppService::new(ResponderConfig::default());
    let err = app
        .handle_event(&StackEvent::SystemBoot, &mut hw, &mut RecordingSink::new())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Stack {
            command: StackCommand::SetSyncReceiveParameters,
            ..
        }
    ));
    assert!(hw.calls.is_empty());
}

#[test]
fn failed_close_keeps_connected() {
    let (mut app, mut hw, mut sink) = make_app();
    app.handle_event(&StackEvent::SystemBoot, &mut hw, &mut sink)
        .unwrap();
    app.handle_event(&StackEvent::ConnectionOpened { connection: CONN }, &mut hw, &mut sink)
        .unwrap();
    hw.fail = Some((StackCommand::CloseConnection, StackStatus(0x0C)));

    let err = app
        .handle_event(
            &StackEvent::PawrSyncTransferReceived {
                sync: 5,
                connection: CONN,
            },
            &mut hw,
            &mut sink,
        )
        .unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(app.state(), StateId::Connected);
}

#[test]
fn missing_name_attribute_is_fatal() {
    let mut hw = MockStack::new();
    hw.missing = Some(Attribute::DeviceName);
    let mut app = AppService::new(ResponderConfig::default());
    let err = app
        .handle_event(&StackEvent::SystemBoot, &mut hw, &mut RecordingSink::new())
        .unwrap_err();
    assert_eq!(err, Error::AttributeMissing(Attribute::DeviceName));
}

#[test]
fn unreadable_name_is_fatal() {
    let mut hw = MockStack::new();
    hw.name_read_error = Some(AttributeError::ReadNotPermitted);
    let mut app = AppService::new(ResponderConfig::default());
    let err = app
        .handle_event(&StackEvent::SystemBoot, &mut hw, &mut RecordingSink::new())
        .unwrap_err();
    assert_eq!(
        err,
        Error::AttributeRead {
            handle: NAME_HANDLE,
            error: AttributeError::ReadNotPermitted,
        }
    );
    assert_eq!(app.state(), StateId::Uninitialized);
}

#[test]
fn fatal_error_halts_the_responder() {
    let (mut app, mut hw, mut sink) = make_app();
    to_sync_active(&mut app, &mut hw, &mut sink);
    hw.fail = Some((StackCommand::SetPawrResponseData, StackStatus(0x0181)));

    let err = app.handle_event(&subevent(1, 1), &mut hw, &mut sink).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(app.halted(), Some(err));

    // The stack recovers, but the responder stays down.
    hw.fail = None;
    hw.clear();
    sink.events.clear();
    let transitions = app.transitions();
    for event in [
        subevent(2, 2),
        StackEvent::SyncClosed { sync: 5, reason: 0x13 },
        StackEvent::PawrSyncTransferReceived {
            sync: 6,
            connection: CONN,
        },
    ] {
        assert_eq!(app.handle_event(&event, &mut hw, &mut sink), Err(err));
    }
    assert!(hw.calls.is_empty(), "a halted responder issues no commands");
    assert!(sink.events.is_empty());
    assert_eq!(app.state(), StateId::SyncActive);
    assert_eq!(app.transitions(), transitions);
}

#[test]
fn failed_boot_is_not_retried() {
    let mut hw = MockStack::failing(StackCommand::StartAdvertising, 0x0181);
    let mut app = AppService::new(ResponderConfig::default());
    let mut sink = RecordingSink::new();
    let err = app
        .handle_event(&StackEvent::SystemBoot, &mut hw, &mut sink)
        .unwrap_err();

    hw.fail = None;
    hw.clear();
    assert_eq!(
        app.handle_event(&StackEvent::SystemBoot, &mut hw, &mut sink),
        Err(err)
    );
    assert!(
        !hw.calls.contains(&Call::CreateSet),
        "no second advertising set is created"
    );
    assert!(hw.calls.is_empty());
    assert_eq!(app.state(), StateId::Uninitialized);
}

#[test]
fn illegal_transitions_do_not_halt() {
    let (mut app, mut hw, mut sink) = make_app();
    let err = app.handle_event(&subevent(0, 0), &mut hw, &mut sink).unwrap_err();
    assert!(!err.is_fatal());
    assert_eq!(app.halted(), None);

    app.handle_event(&StackEvent::SystemBoot, &mut hw, &mut sink)
        .unwrap();
    assert_eq!(app.state(), StateId::Advertising);
}

// ── Advertising stop ──────────────────────────────────────────

#[test]
fn full_lifecycle_never_stops_advertising_explicitly() {
    let mut hw = SimStack::new("PAwR");
    let mut app = AppService::new(ResponderConfig::default());
    let mut sink = RecordingSink::new();

    app.handle_event(&StackEvent::SystemBoot, &mut hw, &mut sink)
        .unwrap();
    hw.on_connected();
    for event in [
        StackEvent::ConnectionOpened { connection: CONN },
        StackEvent::PawrSyncTransferReceived {
            sync: 5,
            connection: CONN,
        },
        subevent(0, 0),
        StackEvent::SyncClosed { sync: 5, reason: 0x13 },
    ] {
        app.handle_event(&event, &mut hw, &mut sink).unwrap();
    }

    assert_eq!(app.state(), StateId::Advertising);
    assert_eq!(hw.advertising(), Some(app.advertising_set()));
    assert!(
        !hw.commands()
            .iter()
            .any(|c| matches!(c, SimCommand::StopAdvertising(_)))
    );
}
