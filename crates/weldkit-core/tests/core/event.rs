//! Tests for core::event

use weldkit_core::{EventDispatcher, MachineEvent, MachinePhase};

#[test]
fn test_every_subscriber_sees_the_event() {
    let dispatcher = EventDispatcher::default();
    let mut first = dispatcher.subscribe();
    let mut second = dispatcher.subscribe();

    assert_eq!(dispatcher.publish(MachineEvent::EmergencyStop), 2);
    assert_eq!(first.try_recv().unwrap(), MachineEvent::EmergencyStop);
    assert_eq!(second.try_recv().unwrap(), MachineEvent::EmergencyStop);
}

#[tokio::test]
async fn test_events_cross_threads() {
    let dispatcher = EventDispatcher::new(16);
    let mut rx = dispatcher.subscribe();
    let publisher = dispatcher.clone();

    std::thread::spawn(move || {
        publisher.publish(MachineEvent::PhaseChanged(MachinePhase::Welding));
    })
    .join()
    .unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(event, MachineEvent::PhaseChanged(MachinePhase::Welding));
}
