//! # WeldKit Motion
//!
//! Drives the three-axis welder: unit conversion and soft limits, sensor
//! homing, tilt calibration, the contact/press/weld sequence, emergency
//! stop and weld jobs.
//!
//! ## Architecture
//!
//! ```text
//! MachineController
//!   ├── MachineIo (ServoBus, TriggerSensor ×2, WelderOutput, Clock)
//!   ├── SafetyHandle (emergency stop latch, stop/pause requests)
//!   ├── SharedMachineState (snapshots for monitor threads)
//!   └── EventDispatcher (progress events)
//! ```
//!
//! Actuators are reached only through the traits in [`hardware`]. The
//! [`hardware::simulated`] backend runs everything on a virtual clock.

pub mod axis;
pub mod calibration;
pub mod controller;
pub mod envelope;
pub mod hardware;
pub mod homing;
pub mod job;
pub mod safety;

pub use axis::{calibrated_scale, AxisConversion, ZLimits};
pub use calibration::{fit_plane, tilt_targets, ProbeSample};
pub use controller::MachineController;
pub use envelope::WorkEnvelope;
pub use hardware::simulated::{SimAxisSpec, SimCommand, SimConfig, SimSurface, SimulatedMachine};
pub use hardware::{
    Clock, MachineIo, OperatingMode, ServoBus, SystemClock, TriggerSensor, WelderOutput,
};
pub use homing::{AxisHoming, BackoffOutcome, HomingPhase, HomingReport};
pub use job::{JobOutcome, JobReport, WeldJob};
pub use safety::SafetyHandle;

/// Result of a motion operation
pub type MotionResult<T> = Result<T, weldkit_core::MotionError>;
