//! Actuator abstraction
//!
//! The motion code talks to the machine only through these traits. A real
//! deployment maps them onto a servo bus and a digital I/O board; tests and
//! the demo use [`simulated::SimulatedMachine`].

pub mod simulated;

use std::sync::Arc;
use std::time::{Duration, Instant};
use weldkit_core::{ActuatorResult, Axis};

/// Servo control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatingMode {
    /// Torque (current) control
    Current,
    /// Constant velocity
    Velocity,
    /// Single-turn position control
    Position,
    /// Multi-turn position control
    ExtendedPosition,
}

impl std::fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Current => write!(f, "current"),
            Self::Velocity => write!(f, "velocity"),
            Self::Position => write!(f, "position"),
            Self::ExtendedPosition => write!(f, "extended position"),
        }
    }
}

/// Per-axis servo primitives.
///
/// Implementations own addressing; callers only name the axis.
pub trait ServoBus: Send + Sync {
    /// Check that the actuator answers
    fn ping(&self, axis: Axis) -> ActuatorResult<()>;

    /// Energize the actuator
    fn enable_torque(&self, axis: Axis) -> ActuatorResult<()>;

    /// De-energize the actuator
    fn disable_torque(&self, axis: Axis) -> ActuatorResult<()>;

    /// Switch control mode
    fn set_mode(&self, axis: Axis, mode: OperatingMode) -> ActuatorResult<()>;

    /// Set the position-mode motion profile
    fn set_profile(&self, axis: Axis, velocity: u32, acceleration: u32) -> ActuatorResult<()>;

    /// Command an absolute pulse position
    fn set_target_position(&self, axis: Axis, pulses: i32) -> ActuatorResult<()>;

    /// Command a signed velocity
    fn set_target_velocity(&self, axis: Axis, velocity: i32) -> ActuatorResult<()>;

    /// Command a signed current in mA
    fn set_target_current(&self, axis: Axis, milliamps: i32) -> ActuatorResult<()>;

    /// Read the absolute pulse position
    fn read_position(&self, axis: Axis) -> ActuatorResult<i32>;

    /// Read the actuator's in-motion flag
    fn read_is_moving(&self, axis: Axis) -> ActuatorResult<bool>;
}

/// Binary homing sensor
pub trait TriggerSensor: Send + Sync {
    /// Whether the sensor is currently triggered
    fn is_triggered(&self) -> bool;
}

/// Binary welder output
pub trait WelderOutput: Send + Sync {
    /// Energize or de-energize the ultrasonic generator
    fn set(&self, on: bool) -> ActuatorResult<()>;
}

/// Time source for polling loops
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed start
    fn now(&self) -> Duration;

    /// Block for the given duration
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time with thread sleeps
#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    /// Create a clock starting now
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Everything the controller drives
#[derive(Clone)]
pub struct MachineIo {
    /// Servo bus for all three axes
    pub bus: Arc<dyn ServoBus>,
    /// X homing sensor
    pub sensor_x: Arc<dyn TriggerSensor>,
    /// Y homing sensor
    pub sensor_y: Arc<dyn TriggerSensor>,
    /// Welder output
    pub welder: Arc<dyn WelderOutput>,
    /// Time source
    pub clock: Arc<dyn Clock>,
}

impl MachineIo {
    /// Homing sensor of a planar axis
    pub fn sensor(&self, axis: Axis) -> Option<&Arc<dyn TriggerSensor>> {
        match axis {
            Axis::X => Some(&self.sensor_x),
            Axis::Y => Some(&self.sensor_y),
            Axis::Z => None,
        }
    }
}

impl std::fmt::Debug for MachineIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineIo").finish_non_exhaustive()
    }
}
