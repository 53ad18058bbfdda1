//! Event system for machine progress reporting
//!
//! Provides:
//! - Event types for phase changes, homing, probing and welding progress
//! - Event dispatcher for publishing events to monitor threads

use crate::data::{Axis, MachinePhase, Point, TiltPlane};
use tokio::sync::broadcast;

/// Machine event types
#[derive(Debug, Clone, PartialEq)]
pub enum MachineEvent {
    /// Active sequence changed
    PhaseChanged(MachinePhase),
    /// An axis finished homing
    AxisHomed {
        /// Homed axis.
        axis: Axis,
        /// Pulse count that now represents logical zero.
        offset: i32,
    },
    /// Logical position changed after a completed move
    PositionChanged {
        /// X in mm.
        x: f64,
        /// Y in mm.
        y: f64,
        /// Z in mm.
        z: f64,
    },
    /// The press head touched the work surface
    ContactDetected {
        /// Z position at contact, in pulses.
        z_pulse: i32,
    },
    /// One tilt probe sample was recorded
    TiltSample {
        /// 1-based sample number.
        index: usize,
        /// Number of planned samples.
        total: usize,
        /// Probe X in mm.
        x: f64,
        /// Probe Y in mm.
        y: f64,
        /// Measured Z in mm.
        z: f64,
    },
    /// A tilt plane was fitted
    TiltPlaneComputed(TiltPlane),
    /// One weld point was pressed
    PointWelded {
        /// 1-based point number.
        index: usize,
        /// Number of points in the job.
        total: usize,
        /// Logical position of the point.
        point: Point,
    },
    /// The weld job ended
    JobFinished {
        /// Number of points welded.
        welded: usize,
        /// Number of points in the job.
        total: usize,
        /// Whether the job ended because of a stop request.
        stopped: bool,
    },
    /// Emergency stop latched
    EmergencyStop,
    /// Recovered from emergency stop
    Recovered,
    /// Non-fatal warning
    Warning(String),
}

impl std::fmt::Display for MachineEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MachineEvent::PhaseChanged(phase) => write!(f, "Phase: {}", phase),
            MachineEvent::AxisHomed { axis, offset } => {
                write!(f, "{} homed (offset {} pulses)", axis, offset)
            }
            MachineEvent::PositionChanged { x, y, z } => {
                write!(f, "Position X:{:.3} Y:{:.3} Z:{:.3}", x, y, z)
            }
            MachineEvent::ContactDetected { z_pulse } => {
                write!(f, "Contact at Z pulse {}", z_pulse)
            }
            MachineEvent::TiltSample {
                index,
                total,
                x,
                y,
                z,
            } => write!(
                f,
                "Tilt sample {}/{}: X:{:.3} Y:{:.3} Z:{:.4}",
                index, total, x, y, z
            ),
            MachineEvent::TiltPlaneComputed(plane) => write!(f, "Tilt plane: {}", plane),
            MachineEvent::PointWelded {
                index,
                total,
                point,
            } => write!(f, "Welded {}/{} at {}", index, total, point),
            MachineEvent::JobFinished {
                welded,
                total,
                stopped,
            } => {
                if *stopped {
                    write!(f, "Job stopped after {}/{} points", welded, total)
                } else {
                    write!(f, "Job finished: {}/{} points", welded, total)
                }
            }
            MachineEvent::EmergencyStop => write!(f, "EMERGENCY STOP"),
            MachineEvent::Recovered => write!(f, "Recovered from emergency stop"),
            MachineEvent::Warning(msg) => write!(f, "Warning: {}", msg),
        }
    }
}

/// Event dispatcher for publishing events to subscribers
#[derive(Clone)]
pub struct EventDispatcher {
    /// Broadcast sender channel for machine events.
    tx: broadcast::Sender<MachineEvent>,
}

impl EventDispatcher {
    /// Create a new event dispatcher
    ///
    /// # Arguments
    /// * `buffer_size` - Size of the broadcast buffer (default 100)
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer_size.max(1));
        Self { tx }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<MachineEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of receivers reached. Publishing with nobody
    /// listening is not an error for the machine worker.
    pub fn publish(&self, event: MachineEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}
