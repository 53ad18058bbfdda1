//! # WeldKit Core
//!
//! Core types, errors and events shared by every WeldKit crate.
//! Provides the machine data model (axes, points, snapshots, tilt plane),
//! the error taxonomy and the event dispatcher used to publish progress
//! from the motion worker to monitor threads.

pub mod core;
pub mod data;
pub mod error;
pub mod types;

pub use crate::core::event::{EventDispatcher, MachineEvent};

pub use data::{Axis, AxisSnapshot, MachinePhase, MachineState, Point, TiltPlane};

pub use error::{
    ActuatorError, ActuatorResult, EnvelopeError, EnvelopeOverage, Error, GeometryError,
    MotionError, Result,
};

pub use types::{
    shared_machine_state, thread_safe, thread_safe_rw, SharedMachineState, ThreadSafe,
    ThreadSafeRw,
};
