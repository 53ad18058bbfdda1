//! Simulated weld run.
//!
//! Builds a rectangular outline with a notch, generates the weld points,
//! homes a simulated machine and welds the part. Pass a TOML or JSON
//! configuration path to override the defaults; without one the file in
//! the platform config directory is used when present.

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use weldkit::{
    assemble_contours, generate_points, init_logging, place_heads, Config, MachineController,
    MemoryScaleStore, Segment, SimulatedMachine, WeldJob, BUILD_DATE, VERSION,
};

fn outline() -> Vec<Segment> {
    let corners = [
        (0.0, 0.0),
        (40.0, 0.0),
        (40.0, 25.0),
        (25.0, 25.0),
        (25.0, 15.0),
        (15.0, 15.0),
        (15.0, 25.0),
        (0.0, 25.0),
    ];
    // deliberately unordered, as CAD flattening delivers them
    let mut segments: Vec<Segment> = (0..corners.len())
        .map(|i| Segment::from((corners[i], corners[(i + 1) % corners.len()])))
        .collect();
    segments.reverse();
    segments.swap(1, 5);
    segments
}

fn load_config() -> anyhow::Result<Config> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load_from_file(Path::new(&path))
            .with_context(|| format!("loading configuration from {}", path))?,
        None => match Config::default_path() {
            Ok(path) => Config::load_or_default(&path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                Config::default()
            }
        },
    };
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    init_logging()?;
    tracing::info!("WeldKit {} (built {})", VERSION, BUILD_DATE);

    let config = load_config()?;
    let preset = config.default_preset();

    let chains = assemble_contours(&outline(), config.tolerances.contour);
    let points = generate_points(&chains, preset.weld_pitch)?;
    let heads = place_heads(&chains, preset.weld_pitch, &config.head, &chains)?;
    let limited = heads.iter().filter(|h| h.correction_limited).count();
    tracing::info!(
        "{} contour(s), {} weld points, {} head positions ({} correction-limited)",
        chains.len(),
        points.len(),
        heads.len(),
        limited
    );

    let sim = SimulatedMachine::default();
    let controller =
        MachineController::new(sim.io(), config, Arc::new(MemoryScaleStore::new()));

    controller.setup_motors()?;
    controller.home_axes()?;
    controller.move_xy_abs(100.0, 100.0, &preset)?;
    let origin = controller.work_origin_here();

    let job = WeldJob::new(points, origin, preset);
    let report = controller.run_job(&job)?;
    controller.final_return_to_origin()?;
    controller.shutdown();

    tracing::info!(
        "Job finished: {:?}, {}/{} welded, welder on for {:?}",
        report.outcome,
        report.welded,
        report.total,
        sim.welder_on_time()
    );
    Ok(())
}
