//! Integration tests for the bounded event queue feeding the service.

use pawr_responder::app::ports::StackCommand;
use pawr_responder::app::service::AppService;
use pawr_responder::config::ResponderConfig;
use pawr_responder::events::{EventDispatcher, StackEvent};
use pawr_responder::fsm::StateId;

use super::mock_stack::{Call, MockStack, RecordingSink};

#[test]
fn pump_drains_in_order() {
    let dispatcher = EventDispatcher::new();
    let mut app = AppService::new(ResponderConfig::default());
    let mut hw = MockStack::new();
    let mut sink = RecordingSink::new();

    dispatcher.push(StackEvent::SystemBoot).unwrap();
    dispatcher
        .push(StackEvent::ConnectionOpened { connection: 1 })
        .unwrap();
    dispatcher
        .push(StackEvent::PawrSyncTransferReceived {
            sync: 0,
            connection: 1,
        })
        .unwrap();

    let handled = dispatcher.pump(&mut app, &mut hw, &mut sink).unwrap();

    assert_eq!(handled, 3);
    assert!(dispatcher.is_empty());
    assert_eq!(app.state(), StateId::SyncPending);
    assert_eq!(hw.last_call(), Some(&Call::Close(1)));
}

#[test]
fn illegal_events_are_dropped_and_draining_continues() {
    let dispatcher = EventDispatcher::new();
    let mut app = AppService::new(ResponderConfig::default());
    let mut hw = MockStack::new();
    let mut sink = RecordingSink::new();

    dispatcher
        .push(StackEvent::PawrSubeventReport {
            sync: 0,
            event_counter: 0,
            subevent: 0,
        })
        .unwrap();
    dispatcher.push(StackEvent::SystemBoot).unwrap();

    let handled = dispatcher.pump(&mut app, &mut hw, &mut sink).unwrap();
    assert_eq!(handled, 1);
    assert_eq!(app.state(), StateId::Advertising);
    assert!(hw.responses().is_empty());
}

#[test]
fn fatal_error_stops_the_drain() {
    let dispatcher = EventDispatcher::new();
    let mut app = AppService::new(ResponderConfig::default());
    let mut hw = MockStack::failing(StackCommand::CreateAdvertisingSet, 0x0007);
    let mut sink = RecordingSink::new();

    dispatcher.push(StackEvent::SystemBoot).unwrap();
    dispatcher
        .push(StackEvent::ConnectionOpened { connection: 1 })
        .unwrap();

    let err = dispatcher.pump(&mut app, &mut hw, &mut sink).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(dispatcher.len(), 1, "remaining events stay queued");
    assert_eq!(app.state(), StateId::Uninitialized);
}

#[test]
fn pumping_a_halted_service_issues_no_commands() {
    let dispatcher = EventDispatcher::new();
    let mut app = AppService::new(ResponderConfig::default());
    let mut hw = MockStack::failing(StackCommand::StartAdvertising, 0x0181);
    let mut sink = RecordingSink::new();

    dispatcher.push(StackEvent::SystemBoot).unwrap();
    let err = dispatcher.pump(&mut app, &mut hw, &mut sink).unwrap_err();

    hw.fail = None;
    hw.clear();
    dispatcher.push(StackEvent::SystemBoot).unwrap();
    dispatcher
        .push(StackEvent::ConnectionOpened { connection: 1 })
        .unwrap();
    assert_eq!(dispatcher.pump(&mut app, &mut hw, &mut sink), Err(err));
    assert!(hw.calls.is_empty());
    assert_eq!(app.state(), StateId::Uninitialized);
}
