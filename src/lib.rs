//! # WeldKit
//!
//! Control software for a three-axis ultrasonic welding machine:
//! - Outline assembly and weld-point generation from flattened CAD segments
//! - Tool-head placement that keeps both tool ends inside the part
//! - Sensor homing, Z soft limits and tilt-plane calibration
//! - The contact, press and weld sequence with emergency stop
//!
//! ## Architecture
//!
//! WeldKit is organized as a workspace with multiple crates:
//!
//! 1. **weldkit-core** - Shared types, machine state, events and errors
//! 2. **weldkit-path** - Contours, weld points and head placement
//! 3. **weldkit-settings** - Configuration, weld presets and scale persistence
//! 4. **weldkit-motion** - Hardware traits, simulation and the machine controller
//! 5. **weldkit** - This crate and the demo binary

pub use weldkit_core::data;
pub use weldkit_motion::hardware;

pub use weldkit_core::{
    ActuatorError, Axis, AxisSnapshot, EnvelopeError, EnvelopeOverage, Error, EventDispatcher,
    GeometryError, MachineEvent, MachinePhase, MachineState, MotionError, Point, Result,
    SharedMachineState, TiltPlane,
};

pub use weldkit_path::{
    assemble_contours, bounds, distribute_heads, generate_points, place_heads, point_in_outline,
    swap_xy, translate, Bounds, HeadFootprint, HeadGeometry, Segment, VertexChain, WeldPoint,
};

pub use weldkit_settings::{
    builtin_presets, Config, JsonScaleStore, MemoryScaleStore, ScaleStore, SettingsError,
    WeldPreset, DEFAULT_PRESET_NAME,
};

pub use weldkit_motion::{
    fit_plane, JobOutcome, JobReport, MachineController, MachineIo, SafetyHandle, SimConfig,
    SimulatedMachine, WeldJob, WorkEnvelope,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Pretty console output filtered by `RUST_LOG`, INFO by default.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing::Level::INFO.to_string()));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("logging already initialized: {}", e))?;

    Ok(())
}
