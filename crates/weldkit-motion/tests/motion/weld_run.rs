//! Whole run: configuration file, path generation and a simulated weld job

use std::sync::Arc;
use weldkit_core::Point;
use weldkit_motion::{JobOutcome, MachineController, SimulatedMachine, WeldJob};
use weldkit_path::{assemble_contours, generate_points, Segment};
use weldkit_settings::{Config, MemoryScaleStore};

fn square(side: f64) -> Vec<Segment> {
    vec![
        Segment::from(((0.0, 0.0), (side, 0.0))),
        Segment::from(((side, side), (0.0, side))),
        Segment::from(((side, 0.0), (side, side))),
        Segment::from(((0.0, side), (0.0, 0.0))),
    ]
}

#[test]
fn test_config_file_drives_a_weld_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weldkit.toml");
    let mut config = Config::default();
    config.machine.safe_z_pulse = 1_500;
    config.save_to_file(&path).unwrap();

    let config = Config::load_from_file(&path).unwrap();
    config.validate().unwrap();
    let preset = *config.preset("test1").unwrap();

    let chains = assemble_contours(&square(4.0), config.tolerances.contour);
    assert_eq!(chains.len(), 1);
    let points = generate_points(&chains, preset.weld_pitch).unwrap();
    assert_eq!(points.len(), 8);

    let sim = SimulatedMachine::default();
    let controller = MachineController::new(sim.io(), config, Arc::new(MemoryScaleStore::new()));
    controller.setup_motors().unwrap();
    controller.home_axes().unwrap();

    let report = controller
        .run_job(&WeldJob::new(points, Point::new(50.0, 50.0), preset))
        .unwrap();
    assert_eq!(report.outcome, JobOutcome::Completed);
    assert_eq!(report.welded, 8);
    assert_eq!(sim.welder_activations(), 8);
    assert_eq!(controller.state().xy(), Point::new(0.0, 0.0));
}
