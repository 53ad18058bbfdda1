//! Moves, Z limits, the press sequence and scale calibration

use crate::fixture::{homed_rig, rig, rig_with};
use std::sync::Arc;
use std::time::Duration;
use weldkit_core::{ActuatorError, Axis, EnvelopeError, MotionError, Point, TiltPlane};
use weldkit_motion::{Clock, MachineController, OperatingMode, SimCommand, SimulatedMachine};
use weldkit_settings::{Config, MemoryScaleStore, ScaleStore};

fn test1(config: &Config) -> weldkit_settings::WeldPreset {
    *config.preset("test1").unwrap()
}

#[test]
fn test_weld_cycle_runs_full_sequence() {
    let rig = homed_rig();
    let preset = test1(rig.controller.config());

    let contact = rig
        .controller
        .execute_weld_cycle(Point::new(10.0, 5.0), &preset, Point::new(20.0, 20.0))
        .unwrap();

    assert!((contact - 5_000).abs() <= 1, "contact {contact}");
    assert_eq!(rig.sim.welder_activations(), 1);
    assert!(!rig.sim.welder_on());
    assert!(rig.sim.welder_on_time() >= Duration::from_millis(990));
    assert!((rig.sim.position(Axis::Z) - 2_000.0).abs() <= 10.0);

    let state = rig.controller.state();
    assert_eq!(state.xy(), Point::new(30.0, 25.0));
    let x_offset = state.x.homing_offset.unwrap() as f64;
    assert!((rig.sim.position(Axis::X) - (x_offset + 3_000.0)).abs() <= 1.0);
}

#[test]
fn test_weld_current_applied_during_weld() {
    let rig = homed_rig();
    let preset = test1(rig.controller.config());
    rig.sim.clear_commands();
    rig.controller.execute_welding_press(&preset).unwrap();

    let commands = rig.sim.commands();
    let welder_on = commands
        .iter()
        .position(|c| *c == SimCommand::Welder(true))
        .unwrap();
    let weld_current = commands
        .iter()
        .position(|c| *c == SimCommand::Current(Axis::Z, 50))
        .unwrap();
    let gentle = commands
        .iter()
        .position(|c| *c == SimCommand::Current(Axis::Z, 35))
        .unwrap();
    assert!(gentle < weld_current && weld_current < welder_on);
    assert_eq!(rig.sim.mode(Axis::Z), OperatingMode::Position);
}

#[test]
fn test_weld_cycle_outside_envelope_never_moves() {
    let rig = homed_rig();
    let preset = rig.controller.config().default_preset();
    rig.sim.clear_commands();

    let err = rig
        .controller
        .execute_weld_cycle(Point::new(590.01, 0.0), &preset, Point::new(10.0, 0.0))
        .unwrap_err();

    match err {
        MotionError::Envelope(EnvelopeError::OutOfRange { overage, .. }) => {
            assert!((overage.x_above - 0.01).abs() < 1e-6);
            assert_eq!(overage.x_below, 0.0);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(rig.sim.commands().is_empty());
}

#[test]
fn test_moves_require_homing() {
    let rig = rig();
    let preset = rig.controller.config().default_preset();
    assert_eq!(
        rig.controller.move_xy_abs(1.0, 1.0, &preset),
        Err(MotionError::NotHomed)
    );
    assert_eq!(
        rig.controller
            .execute_weld_cycle(Point::new(1.0, 1.0), &preset, Point::new(0.0, 0.0)),
        Err(MotionError::NotHomed)
    );
    assert_eq!(rig.controller.return_to_origin(), Err(MotionError::NotHomed));
}

#[test]
fn test_relative_move_accumulates() {
    let rig = homed_rig();
    let preset = rig.controller.config().default_preset();
    rig.controller.move_xy_rel(12.5, 4.0, &preset).unwrap();
    rig.controller.move_xy_rel(-2.5, 1.0, &preset).unwrap();
    assert_eq!(rig.controller.state().xy(), Point::new(10.0, 5.0));
}

#[test]
fn test_z_target_clamped_to_soft_limits() {
    let rig = rig();
    assert_eq!(rig.controller.move_z_abs_pulse(-500).unwrap(), 0);
    assert!(rig.sim.commands().contains(&SimCommand::Position(Axis::Z, 0)));
    assert!(!rig.sim.commands().contains(&SimCommand::Position(Axis::Z, -500)));
    assert_eq!(rig.controller.move_z_abs_pulse(1_500).unwrap(), 1_500);
    assert!((rig.sim.position(Axis::Z) - 1_500.0).abs() <= 10.0);
}

#[test]
fn test_tilt_added_to_logical_z_moves() {
    let rig = homed_rig();
    let preset = rig.controller.config().default_preset();
    assert_eq!(rig.controller.set_z_origin_here().unwrap(), 0);
    rig.controller
        .set_tilt_plane(Some(TiltPlane::new(0.01, 0.0, 1.5)));
    rig.controller.move_xy_abs(100.0, 0.0, &preset).unwrap();

    rig.controller.move_z_abs_mm(0.0).unwrap();
    // 0.01 * 100 + 1.5 = 2.5 mm
    assert!(rig.sim.commands().contains(&SimCommand::Position(Axis::Z, 2_500)));
    assert_eq!(rig.controller.state().z.position_mm, 0.0);

    rig.controller.move_z_rel(0.5).unwrap();
    assert!(rig.sim.commands().contains(&SimCommand::Position(Axis::Z, 3_000)));
}

#[test]
fn test_contact_read_failure_aborts_press() {
    let rig = homed_rig();
    let preset = rig.controller.config().default_preset();
    rig.sim.fail_next_reads(Axis::Z, 1);

    let err = rig.controller.execute_welding_press(&preset).unwrap_err();
    assert!(matches!(err, MotionError::ContactFailed { .. }));
    assert_eq!(rig.sim.welder_activations(), 0);
}

#[test]
fn test_welder_failure_releases_pressing_current() {
    let rig = homed_rig();
    let preset = test1(rig.controller.config());
    rig.sim.set_welder_faulty(true);

    let err = rig.controller.execute_welding_press(&preset).unwrap_err();
    assert!(matches!(
        err,
        MotionError::Actuator(ActuatorError::OutputFailed { .. })
    ));
    assert_eq!(rig.sim.current(Axis::Z), 0);
    assert!(rig
        .sim
        .commands()
        .contains(&SimCommand::Current(Axis::Z, 50)));
    assert_eq!(rig.sim.welder_activations(), 0);
}

#[test]
fn test_stuck_welder_still_releases_pressing_current() {
    let rig = homed_rig();
    let preset = test1(rig.controller.config());
    // The output jams as soon as it has been switched on.
    for tick in 1..200 {
        let sim = rig.sim.clone();
        rig.sim.schedule(Duration::from_millis(tick * 50), move || {
            if sim.welder_on() {
                sim.set_welder_faulty(true);
            }
        });
    }

    let err = rig.controller.execute_welding_press(&preset).unwrap_err();
    assert!(matches!(
        err,
        MotionError::Actuator(ActuatorError::OutputFailed { .. })
    ));
    assert_eq!(rig.sim.welder_activations(), 1);
    assert!(rig.sim.welder_on());
    assert_eq!(rig.sim.current(Axis::Z), 0);
}

#[test]
fn test_manual_current_drive() {
    let rig = homed_rig();
    rig.controller.set_axis_current(Axis::X, 5).unwrap();
    assert_eq!(rig.sim.mode(Axis::X), OperatingMode::Current);
    rig.sim.sleep(Duration::from_millis(100));
    rig.controller.stop_continuous(Axis::X).unwrap();

    assert_eq!(rig.sim.mode(Axis::X), OperatingMode::ExtendedPosition);
    assert_eq!(rig.sim.current(Axis::X), 0);
    let x = rig.controller.state().x.position_mm;
    assert!((x - 5.0).abs() < 0.05, "x = {x}");
}

#[test]
fn test_connection_check() {
    let rig = rig();
    rig.sim.set_offline(Axis::Y, true);
    assert!(rig.controller.check_connection(Axis::X));
    assert!(!rig.controller.check_connection(Axis::Y));
}

#[test]
fn test_scale_calibration_persists() {
    let rig = rig();
    let scale = rig
        .controller
        .apply_scale_calibration(Axis::X, 100.0, 98.0)
        .unwrap();
    assert!((scale - 100.0 * 100.0 / 98.0).abs() < 1e-9);
    assert_eq!(rig.store.load(Axis::X), Some(scale));
    assert_eq!(rig.controller.state().x.pulses_per_unit, scale);
}

#[test]
fn test_scale_calibration_rejections() {
    let rig = rig();
    assert!(matches!(
        rig.controller.apply_scale_calibration(Axis::Z, 10.0, 9.0),
        Err(MotionError::InvalidCalibration { .. })
    ));
    assert!(matches!(
        rig.controller.apply_scale_calibration(Axis::Y, 100.0, 0.0),
        Err(MotionError::InvalidCalibration { .. })
    ));
    assert!(matches!(
        rig.controller.set_pulses_per_unit(Axis::Y, -3.0),
        Err(MotionError::InvalidCalibration { .. })
    ));
    assert_eq!(rig.store.load(Axis::Y), None);
    assert_eq!(rig.controller.state().y.pulses_per_unit, 100.0);
}

#[test]
fn test_persisted_scale_loaded_at_startup() {
    let sim = SimulatedMachine::default();
    let store = Arc::new(MemoryScaleStore::with_values([(Axis::Y, 80.0)]));
    let controller = MachineController::new(sim.io(), Config::default(), store);
    let state = controller.state();
    assert_eq!(state.y.pulses_per_unit, 80.0);
    assert_eq!(state.x.pulses_per_unit, 100.0);
}

#[test]
fn test_final_return_uses_final_retract() {
    let mut config = Config::default();
    config.machine.final_retract_pulse = 100;
    let rig = rig_with(Default::default(), config);
    rig.controller.home_axes().unwrap();
    rig.sim.clear_commands();
    rig.controller.final_return_to_origin().unwrap();
    assert!(rig.sim.commands().contains(&SimCommand::Position(Axis::Z, 100)));
}
