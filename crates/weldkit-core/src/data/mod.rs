//! Data models for points, axes and machine state
//!
//! This module provides:
//! - 2-D points in the part/machine frame (millimetres)
//! - Axis identifiers for the three-axis welder
//! - Per-axis calibration/position snapshots
//! - The machine state snapshot handed to monitor threads
//! - The tilt plane used for Z compensation

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in the 2-D part frame, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub fn new(x: f64, y: f64) -> Self {
        debug_assert!(
            x.is_finite() && y.is_finite(),
            "Point coordinates must be finite: x={x}, y={y}"
        );
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// True when both coordinates are within `tolerance` of `other` (absolute, per axis)
    pub fn coincides_with(&self, other: &Point, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }

    /// Translate by an offset
    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Point with X and Y exchanged
    pub fn swapped(&self) -> Self {
        Self {
            x: self.y,
            y: self.x,
        }
    }

    /// Linear interpolation towards `other`; `t = 0` is `self`, `t = 1` is `other`
    pub fn lerp(&self, other: &Point, t: f64) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X:{:.3} Y:{:.3}", self.x, self.y)
    }
}

/// Machine axis identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Gantry X axis
    X,
    /// Gantry Y axis
    Y,
    /// Press (vertical) axis
    Z,
}

impl Axis {
    /// All axes in bus order
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Axes located by sensor homing
    pub const PLANAR: [Axis; 2] = [Axis::X, Axis::Y];

    /// Lower-case key used in persisted settings (`"x"`, `"y"`, `"z"`)
    pub fn key(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }

    /// Whether the axis belongs to the XY gantry
    pub fn is_planar(&self) -> bool {
        matches!(self, Axis::X | Axis::Y)
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "X"),
            Axis::Y => write!(f, "Y"),
            Axis::Z => write!(f, "Z"),
        }
    }
}

impl std::str::FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            _ => Err(format!("Unknown axis: {}", s)),
        }
    }
}

/// Calibration and position data for one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisSnapshot {
    /// Actuator pulses per millimetre (persisted, user calibrated)
    pub pulses_per_unit: f64,
    /// Pulse count representing logical zero; `None` until the axis is homed or zeroed
    pub homing_offset: Option<i32>,
    /// Last confirmed logical position in millimetres
    pub position_mm: f64,
}

impl AxisSnapshot {
    /// Create an un-referenced axis with the given scale
    pub fn new(pulses_per_unit: f64) -> Self {
        Self {
            pulses_per_unit,
            homing_offset: None,
            position_mm: 0.0,
        }
    }

    /// Whether a homing offset has been established
    pub fn is_referenced(&self) -> bool {
        self.homing_offset.is_some()
    }
}

impl Default for AxisSnapshot {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Which sequence, if any, currently drives the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachinePhase {
    /// Ready for commands
    Idle,
    /// XY homing in progress
    Homing,
    /// Tilt calibration probing in progress
    Calibrating,
    /// Range or path preview in progress
    Previewing,
    /// Weld job in progress
    Welding,
    /// Job paused between points
    Paused,
    /// Emergency stop latched; only recovery is accepted
    Stopped,
}

impl MachinePhase {
    /// Whether a motion sequence is running
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            MachinePhase::Homing
                | MachinePhase::Calibrating
                | MachinePhase::Previewing
                | MachinePhase::Welding
        )
    }

    /// Check if a transition from this phase to `target` is valid.
    ///
    /// - Any phase may enter Stopped (emergency stop)
    /// - Stopped only leaves through recovery to Idle
    /// - Sequences start from Idle and finish back to Idle
    /// - Welding may pause and resume
    pub fn can_transition_to(&self, target: MachinePhase) -> bool {
        use MachinePhase::*;
        if *self == target {
            return true;
        }
        match (self, target) {
            (_, Stopped) => true,
            (Stopped, Idle) => true,
            (Stopped, _) => false,
            (Idle, _) => true,
            (Welding, Paused | Idle) => true,
            (Paused, Welding | Idle) => true,
            (Homing | Calibrating | Previewing, Idle) => true,
            _ => false,
        }
    }
}

impl fmt::Display for MachinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Homing => write!(f, "Homing"),
            Self::Calibrating => write!(f, "Calibrating"),
            Self::Previewing => write!(f, "Previewing"),
            Self::Welding => write!(f, "Welding"),
            Self::Paused => write!(f, "Paused"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Best-fit work surface plane `z = a·x + b·y + c`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TiltPlane {
    /// X slope
    pub a: f64,
    /// Y slope
    pub b: f64,
    /// Height at the origin
    pub c: f64,
}

impl TiltPlane {
    /// Create a plane from its coefficients
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Surface height (Z correction) at the given XY position
    pub fn z_offset(&self, x: f64, y: f64) -> f64 {
        self.a * x + self.b * y + self.c
    }
}

impl fmt::Display for TiltPlane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "z = {:.4}x + {:.4}y + {:.4}", self.a, self.b, self.c)
    }
}

/// Complete machine state snapshot
///
/// Owned by the controller and written only by the worker that drives the
/// machine. Monitor threads receive clones, so a read is never torn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineState {
    /// X axis
    pub x: AxisSnapshot,
    /// Y axis
    pub y: AxisSnapshot,
    /// Z axis
    pub z: AxisSnapshot,
    /// True only after both X and Y completed homing
    pub is_homed: bool,
    /// Latched emergency-stop flag
    pub stopped: bool,
    /// Active sequence
    pub phase: MachinePhase,
    /// Last computed tilt plane, if any
    pub tilt_plane: Option<TiltPlane>,
}

impl MachineState {
    /// Create a fresh state with the given per-axis scales
    pub fn new(ppu_x: f64, ppu_y: f64, ppu_z: f64) -> Self {
        Self {
            x: AxisSnapshot::new(ppu_x),
            y: AxisSnapshot::new(ppu_y),
            z: AxisSnapshot::new(ppu_z),
            is_homed: false,
            stopped: false,
            phase: MachinePhase::Idle,
            tilt_plane: None,
        }
    }

    /// Snapshot of one axis
    pub fn axis(&self, axis: Axis) -> &AxisSnapshot {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }

    /// Mutable access to one axis
    pub fn axis_mut(&mut self, axis: Axis) -> &mut AxisSnapshot {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
        }
    }

    /// Current logical XY position
    pub fn xy(&self) -> Point {
        Point::new(self.x.position_mm, self.y.position_mm)
    }

    /// Move the phase, logging and ignoring invalid transitions
    pub fn set_phase(&mut self, target: MachinePhase) {
        if self.phase.can_transition_to(target) {
            self.phase = target;
        } else {
            tracing::warn!("Ignoring phase transition {} -> {}", self.phase, target);
        }
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}
