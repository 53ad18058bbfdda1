//! Weld jobs: ordering, retract heights, stop, pause and previews

use crate::fixture::{homed_rig, rig};
use std::time::Duration;
use weldkit_core::{Axis, EnvelopeError, MachineEvent, MachinePhase, MotionError, Point};
use weldkit_motion::{JobOutcome, SimCommand, WeldJob};

fn job(rig: &crate::fixture::Rig) -> WeldJob {
    let preset = *rig.controller.config().preset("test1").unwrap();
    WeldJob::new(
        vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(50.0, 0.0),
        ],
        Point::new(10.0, 10.0),
        preset,
    )
}

#[test]
fn test_job_welds_every_point_in_order() {
    let rig = homed_rig();
    let job = job(&rig);
    let mut rx = rig.controller.events().subscribe();

    let report = rig.controller.run_job(&job).unwrap();

    assert!(report.is_complete());
    assert_eq!(report.welded, 3);
    assert_eq!(report.contacts.len(), 3);
    assert!(report.contacts.iter().all(|c| (c - 5_000).abs() <= 1));
    assert_eq!(rig.sim.welder_activations(), 3);

    let mut welded = Vec::new();
    let mut finished = None;
    while let Ok(event) = rx.try_recv() {
        match event {
            MachineEvent::PointWelded { index, point, .. } => welded.push((index, point)),
            MachineEvent::JobFinished {
                welded,
                total,
                stopped,
            } => finished = Some((welded, total, stopped)),
            _ => {}
        }
    }
    let expected: Vec<_> = job.points.iter().enumerate().map(|(i, p)| (i + 1, *p)).collect();
    assert_eq!(welded, expected);
    assert_eq!(finished, Some((3, 3, false)));
}

#[test]
fn test_long_gap_uses_long_retract() {
    let rig = homed_rig();
    let job = job(&rig);
    rig.sim.clear_commands();
    rig.controller.run_job(&job).unwrap();

    let z_targets: Vec<i32> = rig
        .sim
        .commands()
        .into_iter()
        .filter_map(|c| match c {
            SimCommand::Position(Axis::Z, p) => Some(p),
            _ => None,
        })
        .collect();
    // safe Z, retract after point 1, long retract before the 45 mm gap,
    // retract after the last point, then the return to origin
    assert_eq!(z_targets, vec![2_000, 2_000, 500, 2_000, 2_000]);
}

#[test]
fn test_first_point_contact_current_override() {
    let rig = homed_rig();
    let job = job(&rig).with_first_gentle_current(-1);
    rig.sim.clear_commands();

    let report = rig.controller.run_job(&job).unwrap();
    assert!(report.is_complete());

    let gentle: Vec<i32> = rig
        .sim
        .commands()
        .iter()
        .filter_map(|c| match c {
            SimCommand::Current(Axis::Z, ma) if *ma != 0 && *ma != 50 => Some(*ma),
            _ => None,
        })
        .collect();
    assert_eq!(gentle, vec![-1, 35, 35]);
}

#[test]
fn test_completed_job_returns_to_origin() {
    let rig = homed_rig();
    let job = job(&rig);
    rig.controller.run_job(&job).unwrap();

    let state = rig.controller.state();
    assert_eq!(state.xy(), Point::new(0.0, 0.0));
    assert_eq!(state.phase, MachinePhase::Idle);
    let x_offset = state.x.homing_offset.unwrap() as f64;
    assert!((rig.sim.position(Axis::X) - x_offset).abs() <= 1.0);
}

#[test]
fn test_stop_request_ends_job_between_points() {
    let rig = homed_rig();
    let job = job(&rig);
    let safety = rig.controller.safety();
    // lands in the first-point settle
    rig.sim
        .schedule(Duration::from_millis(1_500), move || safety.request_stop());

    let report = rig.controller.run_job(&job).unwrap();

    assert_eq!(report.outcome, JobOutcome::Stopped);
    assert_eq!(report.welded, 1);
    assert!(!report.aborted());
    assert_eq!(rig.sim.welder_activations(), 1);
    // a stopped job stays where it stopped
    assert_eq!(rig.controller.state().xy(), Point::new(10.0, 10.0));
}

#[test]
fn test_pause_holds_then_resumes() {
    let rig = homed_rig();
    let job = job(&rig);
    let mut rx = rig.controller.events().subscribe();
    let pause = rig.controller.safety();
    let resume = rig.controller.safety();
    rig.sim
        .schedule(Duration::from_millis(1_500), move || pause.pause());
    rig.sim
        .schedule(Duration::from_secs(8), move || resume.resume());

    let report = rig.controller.run_job(&job).unwrap();
    assert!(report.is_complete());

    let mut phases = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let MachineEvent::PhaseChanged(phase) = event {
            phases.push(phase);
        }
    }
    assert_eq!(
        phases,
        vec![
            MachinePhase::Welding,
            MachinePhase::Paused,
            MachinePhase::Welding,
            MachinePhase::Idle
        ]
    );
}

#[test]
fn test_emergency_stop_aborts_job() {
    let rig = homed_rig();
    let job = job(&rig);
    let safety = rig.controller.safety();
    // lands inside the first weld
    rig.sim
        .schedule(Duration::from_millis(3_500), move || safety.emergency_stop());

    let report = rig.controller.run_job(&job).unwrap();

    assert_eq!(report.outcome, JobOutcome::EmergencyStopped);
    assert!(report.aborted());
    assert_eq!(report.welded, 0);
    assert_eq!(rig.sim.welder_activations(), 1);
    assert!(!rig.sim.welder_on());
    assert_eq!(rig.controller.state().phase, MachinePhase::Stopped);
}

#[test]
fn test_job_outside_envelope_never_starts() {
    let rig = homed_rig();
    let mut job = job(&rig);
    job.points.push(Point::new(590.01, 0.0));
    rig.sim.clear_commands();

    let err = rig.controller.run_job(&job).unwrap_err();
    assert!(matches!(
        err,
        MotionError::Envelope(EnvelopeError::OutOfRange { .. })
    ));
    assert!(rig.sim.commands().is_empty());
}

#[test]
fn test_job_requires_homing() {
    let rig = rig();
    let job = job(&rig);
    assert_eq!(rig.controller.run_job(&job), Err(MotionError::NotHomed));
}

#[test]
fn test_preview_range_traces_bounds() {
    let rig = homed_rig();
    let job = job(&rig);
    rig.sim.clear_commands();

    let bounds = rig
        .controller
        .preview_range(&job.points, job.origin, &job.preset)
        .unwrap();

    assert_eq!(bounds.min_x, 10.0);
    assert_eq!(bounds.max_x, 60.0);
    let x_moves = rig
        .sim
        .commands()
        .iter()
        .filter(|c| matches!(c, SimCommand::Position(Axis::X, _)))
        .count();
    assert_eq!(x_moves, 5);
    assert_eq!(rig.sim.welder_activations(), 0);
    assert_eq!(rig.controller.state().xy(), Point::new(10.0, 10.0));
}

#[test]
fn test_preview_path_visits_points() {
    let rig = homed_rig();
    let job = job(&rig);
    let visited = rig
        .controller
        .preview_path(&job.points, job.origin, &job.preset)
        .unwrap();
    assert_eq!(visited, 3);
    assert_eq!(rig.controller.state().xy(), Point::new(60.0, 10.0));
    assert_eq!(rig.sim.welder_activations(), 0);
}

#[test]
fn test_work_origin_from_jog() {
    let rig = homed_rig();
    let preset = rig.controller.config().default_preset();
    rig.controller.move_xy_rel(12.0, 7.0, &preset).unwrap();
    assert_eq!(rig.controller.work_origin_here(), Point::new(12.0, 7.0));
}
