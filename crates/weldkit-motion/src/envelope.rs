//! Work envelope validation
//!
//! A path is checked as a whole before any motion. If its translated
//! bounding box leaves the machine travel on any side the job is refused
//! and nothing moves.

use weldkit_core::{EnvelopeError, EnvelopeOverage, Point};
use weldkit_path::{bounds, Bounds, WeldPoint};

/// Reachable XY travel, in mm from the homed origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkEnvelope {
    /// X travel
    pub max_x: f64,
    /// Y travel
    pub max_y: f64,
    /// Overage tolerated before a path is refused
    pub tolerance: f64,
}

impl WorkEnvelope {
    /// Create an envelope
    pub fn new(max_x: f64, max_y: f64, tolerance: f64) -> Self {
        Self {
            max_x,
            max_y,
            tolerance,
        }
    }

    /// Per-side overage of a bounding box
    pub fn overage(&self, b: &Bounds) -> EnvelopeOverage {
        EnvelopeOverage {
            x_below: (-b.min_x).max(0.0),
            x_above: (b.max_x - self.max_x).max(0.0),
            y_below: (-b.min_y).max(0.0),
            y_above: (b.max_y - self.max_y).max(0.0),
        }
    }

    /// Validate `points` translated by `origin`.
    ///
    /// Returns the translated bounding box on success.
    pub fn validate(&self, points: &[WeldPoint], origin: Point) -> Result<Bounds, EnvelopeError> {
        let b = bounds(points)
            .ok_or(EnvelopeError::EmptyPath)?
            .translated(origin.x, origin.y);
        let overage = self.overage(&b);
        let exceeded = [
            overage.x_below,
            overage.x_above,
            overage.y_below,
            overage.y_above,
        ]
        .iter()
        .any(|side| *side > self.tolerance);

        if exceeded {
            let err = EnvelopeError::OutOfRange {
                min_x: b.min_x,
                max_x: b.max_x,
                min_y: b.min_y,
                max_y: b.max_y,
                limit_x: self.max_x,
                limit_y: self.max_y,
                overage,
            };
            tracing::error!("{}", err);
            return Err(err);
        }
        Ok(b)
    }
}
