//! Tilt calibration against a sloped simulated surface

use crate::fixture::{homed_rig, rig};
use weldkit_core::{Axis, MachineEvent, MachinePhase, MotionError};
use weldkit_motion::SimSurface;

#[test]
fn test_requires_z_origin_before_anything_else() {
    let rig = rig();
    let preset = rig.controller.config().default_preset();
    rig.sim.clear_commands();
    assert_eq!(
        rig.controller.calibrate_tilt(7, &preset),
        Err(MotionError::ZNotZeroed)
    );
    assert!(rig.sim.commands().is_empty());
}

#[test]
fn test_requires_homing_after_z_origin() {
    let rig = rig();
    let preset = rig.controller.config().default_preset();
    rig.controller.set_z_origin_here().unwrap();
    assert_eq!(
        rig.controller.calibrate_tilt(3, &preset),
        Err(MotionError::NotHomed)
    );
}

#[test]
fn test_rejects_unsupported_probe_count() {
    let rig = homed_rig();
    let preset = rig.controller.config().default_preset();
    rig.controller.set_z_origin_here().unwrap();
    rig.sim.clear_commands();
    assert_eq!(
        rig.controller.calibrate_tilt(5, &preset),
        Err(MotionError::UnsupportedProbeCount { count: 5 })
    );
    assert!(rig.sim.commands().is_empty());
}

fn sloped_rig() -> crate::fixture::Rig {
    let rig = homed_rig();
    assert_eq!(rig.controller.set_z_origin_here().unwrap(), 0);
    // 0.05 Z pulse per X pulse is 0.005 mm per mm at 100 and 1000 pulses/mm
    rig.sim.set_surface(SimSurface {
        base_pulse: 5_000.0,
        slope_x: 0.05,
        slope_y: -0.02,
    });
    rig
}

#[test]
fn test_three_point_plane() {
    let rig = sloped_rig();
    let preset = rig.controller.config().default_preset();
    let mut rx = rig.controller.events().subscribe();

    let plane = rig.controller.calibrate_tilt(3, &preset).unwrap();

    assert!((plane.a - 0.005).abs() < 1e-4, "{plane}");
    assert!((plane.b + 0.002).abs() < 1e-4, "{plane}");
    assert!((plane.c - 5.0).abs() < 0.01, "{plane}");

    let state = rig.controller.state();
    assert_eq!(state.tilt_plane, Some(plane));
    assert_eq!(state.phase, MachinePhase::Idle);
    assert_eq!(state.xy(), weldkit_core::Point::new(0.0, 0.0));
    assert_eq!(rig.sim.welder_activations(), 0);

    let mut samples = 0;
    let mut computed = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            MachineEvent::TiltSample { total, .. } => {
                assert_eq!(total, 3);
                samples += 1;
            }
            MachineEvent::TiltPlaneComputed(p) => computed = p == plane,
            _ => {}
        }
    }
    assert_eq!(samples, 3);
    assert!(computed);
}

#[test]
fn test_sixteen_point_plane() {
    let rig = sloped_rig();
    let preset = rig.controller.config().default_preset();
    let plane = rig.controller.calibrate_tilt(16, &preset).unwrap();
    assert!((plane.a - 0.005).abs() < 1e-4, "{plane}");
    assert!((plane.b + 0.002).abs() < 1e-4, "{plane}");
    assert!((plane.c - 5.0).abs() < 0.01, "{plane}");
}

#[test]
fn test_probes_return_to_safe_height() {
    let rig = sloped_rig();
    let preset = rig.controller.config().default_preset();
    rig.controller.calibrate_tilt(3, &preset).unwrap();
    assert!((rig.sim.position(Axis::Z) - 2_000.0).abs() <= 10.0);
}
