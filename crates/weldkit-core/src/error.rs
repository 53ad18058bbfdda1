//! Error handling for WeldKit
//!
//! Provides error types for all layers of the machine:
//! - Geometry errors (degenerate input, invalid pitch)
//! - Actuator errors (bus communication, failed reads)
//! - Envelope errors (path exceeds the machine travel)
//! - Motion errors (homing, contact detection, preconditions, emergency stop)
//!
//! All error types use `thiserror` for ergonomic error handling.

use crate::data::Axis;
use thiserror::Error;

/// Geometry error type
///
/// Degenerate or invalid input to the path components. Rejected
/// synchronously before any work is done.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Weld pitch is zero, negative or not finite
    #[error("Weld pitch must be greater than zero, got {pitch}")]
    InvalidPitch {
        /// The rejected pitch.
        pitch: f64,
    },

    /// Chain has too few points to define an edge
    #[error("Vertex chain needs at least 2 points, got {count}")]
    DegenerateChain {
        /// Number of points in the chain.
        count: usize,
    },

    /// Tool dimensions are not usable
    #[error("Invalid head dimensions: width {width}, overlap {overlap}")]
    InvalidHead {
        /// Tool width.
        width: f64,
        /// Overlap between neighbouring heads.
        overlap: f64,
    },
}

/// Actuator error type
///
/// Failures reported by the servo bus, sensors or welder output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActuatorError {
    /// A bus transaction failed
    #[error("Communication error on {axis} during {operation}: {reason}")]
    Communication {
        /// Axis addressed by the transaction.
        axis: Axis,
        /// Name of the primitive that failed.
        operation: String,
        /// Reason reported by the transport.
        reason: String,
    },

    /// Position could not be read
    #[error("Position read failed on {axis}")]
    ReadFailed {
        /// The axis that failed.
        axis: Axis,
    },

    /// Digital output write failed
    #[error("Output write failed: {reason}")]
    OutputFailed {
        /// Reason reported by the I/O board.
        reason: String,
    },
}

/// Result of an actuator primitive
pub type ActuatorResult<T> = std::result::Result<T, ActuatorError>;

/// Per-side overage of a path beyond the machine envelope, in millimetres.
///
/// Each field is zero when that side is within the limit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnvelopeOverage {
    /// Amount below X = 0
    pub x_below: f64,
    /// Amount beyond X max
    pub x_above: f64,
    /// Amount below Y = 0
    pub y_below: f64,
    /// Amount beyond Y max
    pub y_above: f64,
}

impl EnvelopeOverage {
    /// Whether any side exceeds the envelope
    pub fn any(&self) -> bool {
        self.x_below > 0.0 || self.x_above > 0.0 || self.y_below > 0.0 || self.y_above > 0.0
    }
}

/// Envelope error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnvelopeError {
    /// No points to validate
    #[error("Path is empty")]
    EmptyPath,

    /// Path bounding box leaves the machine travel
    #[error(
        "Path range X [{min_x:.3}, {max_x:.3}] Y [{min_y:.3}, {max_y:.3}] exceeds machine envelope X [0, {limit_x:.3}] Y [0, {limit_y:.3}] (over by X-{:.3} X+{:.3} Y-{:.3} Y+{:.3})",
        overage.x_below, overage.x_above, overage.y_below, overage.y_above
    )]
    OutOfRange {
        /// Minimum X of the translated path.
        min_x: f64,
        /// Maximum X of the translated path.
        max_x: f64,
        /// Minimum Y of the translated path.
        min_y: f64,
        /// Maximum Y of the translated path.
        max_y: f64,
        /// Machine X travel.
        limit_x: f64,
        /// Machine Y travel.
        limit_y: f64,
        /// Per-side overage.
        overage: EnvelopeOverage,
    },
}

/// Motion error type
///
/// Errors raised by the homing, calibration and weld sequences.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionError {
    /// The emergency stop is latched
    #[error("Emergency stop is latched; recover before commanding motion")]
    EmergencyStopped,

    /// XY position is unknown
    #[error("XY axes are not homed")]
    NotHomed,

    /// Z has no user-set origin
    #[error("Z origin has not been set")]
    ZNotZeroed,

    /// Homing sequence failed
    #[error("Homing failed on {axis}: {reason}")]
    HomingFailed {
        /// The axis being homed.
        axis: Axis,
        /// The reason the sequence aborted.
        reason: String,
    },

    /// Contact detection could not read the Z position
    #[error("Contact detection failed: {reason}")]
    ContactFailed {
        /// The reason contact could not be established.
        reason: String,
    },

    /// Tilt calibration only supports 3 or 16 probe points
    #[error("Unsupported tilt probe count {count} (use 3 or 16)")]
    UnsupportedProbeCount {
        /// The requested count.
        count: usize,
    },

    /// Tilt fit needs at least three samples
    #[error("Tilt fit needs at least 3 samples, got {count}")]
    InsufficientSamples {
        /// Number of samples collected.
        count: usize,
    },

    /// Samples are collinear so no unique plane exists
    #[error("Tilt samples are degenerate (collinear); no unique plane")]
    DegenerateSamples,

    /// Invalid calibration input
    #[error("Invalid calibration: {reason}")]
    InvalidCalibration {
        /// The reason the calibration was rejected.
        reason: String,
    },

    /// A configured value could not be persisted
    #[error("Failed to persist {key}: {reason}")]
    PersistFailed {
        /// Key that failed to persist.
        key: String,
        /// Reason reported by the store.
        reason: String,
    },

    /// Actuator failure on a safety-relevant step
    #[error(transparent)]
    Actuator(#[from] ActuatorError),

    /// Path outside the machine envelope
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// Geometry input rejected
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

impl MotionError {
    /// Whether the error was raised before any motion was commanded
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            MotionError::NotHomed
                | MotionError::ZNotZeroed
                | MotionError::UnsupportedProbeCount { .. }
                | MotionError::InvalidCalibration { .. }
                | MotionError::Envelope(_)
                | MotionError::Geometry(_)
        )
    }
}

/// Main error type for WeldKit
///
/// A unified error type that can represent any error from all layers.
#[derive(Error, Debug)]
pub enum Error {
    /// Geometry error
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Actuator error
    #[error(transparent)]
    Actuator(#[from] ActuatorError),

    /// Envelope error
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// Motion error
    #[error(transparent)]
    Motion(#[from] MotionError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is the latched emergency stop
    pub fn is_safety_stop(&self) -> bool {
        matches!(self, Error::Motion(MotionError::EmergencyStopped))
    }

    /// Check if this is an envelope (range) error
    pub fn is_envelope_error(&self) -> bool {
        matches!(
            self,
            Error::Envelope(_) | Error::Motion(MotionError::Envelope(_))
        )
    }

    /// Check if this is a geometry error
    pub fn is_geometry_error(&self) -> bool {
        matches!(
            self,
            Error::Geometry(_) | Error::Motion(MotionError::Geometry(_))
        )
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
