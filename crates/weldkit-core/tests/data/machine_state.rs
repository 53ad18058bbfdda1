//! Tests for data::MachineState

use weldkit_core::{Axis, MachinePhase, MachineState, Point, TiltPlane};

#[test]
fn test_snapshot_serializes_round_trip() {
    let mut state = MachineState::new(100.0, 100.0, 200.0);
    state.x.homing_offset = Some(-1234);
    state.x.position_mm = 12.5;
    state.is_homed = true;
    state.tilt_plane = Some(TiltPlane::new(0.001, -0.002, 0.5));

    let json = serde_json::to_string(&state).unwrap();
    let restored: MachineState = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, state);
}

#[test]
fn test_axis_keys_are_lowercase_in_json() {
    let json = serde_json::to_string(&Axis::Z).unwrap();
    assert_eq!(json, "\"z\"");
}

#[test]
fn test_stopped_phase_only_leaves_to_idle() {
    let mut state = MachineState::default();
    state.set_phase(MachinePhase::Welding);
    state.set_phase(MachinePhase::Stopped);
    state.set_phase(MachinePhase::Welding);
    assert_eq!(state.phase, MachinePhase::Stopped);
    state.set_phase(MachinePhase::Idle);
    assert_eq!(state.phase, MachinePhase::Idle);
}

#[test]
fn test_xy_reflects_axis_positions() {
    let mut state = MachineState::default();
    state.axis_mut(Axis::X).position_mm = 3.0;
    state.axis_mut(Axis::Y).position_mm = 4.0;
    assert_eq!(state.xy(), Point::new(3.0, 4.0));
}
