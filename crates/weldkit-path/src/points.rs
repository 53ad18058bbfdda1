//! Weld point generation
//!
//! Walks vertex chains at a fixed pitch along cumulative arc length and
//! provides the pure coordinate transforms applied before execution.

use crate::contour::VertexChain;
use serde::{Deserialize, Serialize};
use weldkit_core::{GeometryError, Point};

/// A weld location in the part frame
pub type WeldPoint = Point;

/// Edges shorter than this are skipped while walking a chain
pub const MIN_EDGE_LENGTH: f64 = 1e-6;

/// Axis-aligned bounding box of a point set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum X
    pub min_x: f64,
    /// Minimum Y
    pub min_y: f64,
    /// Maximum X
    pub max_x: f64,
    /// Maximum Y
    pub max_y: f64,
}

impl Bounds {
    /// Box width
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Box height
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// The box shifted by an offset
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            min_x: self.min_x + dx,
            min_y: self.min_y + dy,
            max_x: self.max_x + dx,
            max_y: self.max_y + dy,
        }
    }

    /// Corners in trace order, closing back at the first corner
    pub fn trace(&self) -> [Point; 5] {
        [
            Point::new(self.min_x, self.min_y),
            Point::new(self.max_x, self.min_y),
            Point::new(self.max_x, self.max_y),
            Point::new(self.min_x, self.max_y),
            Point::new(self.min_x, self.min_y),
        ]
    }
}

fn check_pitch(pitch: f64) -> Result<(), GeometryError> {
    if pitch.is_finite() && pitch > 0.0 {
        Ok(())
    } else {
        Err(GeometryError::InvalidPitch { pitch })
    }
}

/// Visit every pitch station of one chain with the unit tangent of its edge.
///
/// The first vertex is always visited; it takes the tangent of the first
/// usable edge.
pub(crate) fn walk_chain<F>(chain: &VertexChain, pitch: f64, mut visit: F)
where
    F: FnMut(Point, (f64, f64)),
{
    let first_dir = chain
        .edges()
        .filter(|e| e.length() >= MIN_EDGE_LENGTH)
        .find_map(|e| e.direction())
        .unwrap_or((1.0, 0.0));
    visit(chain.points()[0], first_dir);

    let mut travelled = 0.0_f64;
    for edge in chain.edges() {
        let len = edge.length();
        if len < MIN_EDGE_LENGTH {
            continue;
        }
        let dir = edge.direction().unwrap_or(first_dir);
        // A station landing exactly on this edge's start vertex belongs here.
        let mut k = (travelled / pitch - 1e-9).ceil().max(1.0);
        loop {
            let station = k * pitch;
            if station >= travelled + len {
                break;
            }
            let t = ((station - travelled) / len).max(0.0);
            visit(edge.start.lerp(&edge.end, t), dir);
            k += 1.0;
        }
        travelled += len;
    }
}

/// Generate weld points along every chain at the given pitch.
///
/// Each chain contributes its first vertex followed by a point at every
/// multiple of `pitch` strictly before the end of the walk. Chains are
/// concatenated in order with no travel optimisation between them.
pub fn generate_points(chains: &[VertexChain], pitch: f64) -> Result<Vec<WeldPoint>, GeometryError> {
    check_pitch(pitch)?;
    let mut points = Vec::new();
    for chain in chains {
        if chain.len() < 2 {
            return Err(GeometryError::DegenerateChain { count: chain.len() });
        }
        walk_chain(chain, pitch, |p, _| points.push(p));
    }
    tracing::debug!(
        "Generated {} weld point(s) from {} chain(s) at pitch {}",
        points.len(),
        chains.len(),
        pitch
    );
    Ok(points)
}

/// Shift every point by a work-origin offset
pub fn translate(points: &[WeldPoint], dx: f64, dy: f64) -> Vec<WeldPoint> {
    points.iter().map(|p| p.offset(dx, dy)).collect()
}

/// Exchange X and Y of every point
pub fn swap_xy(points: &[WeldPoint]) -> Vec<WeldPoint> {
    points.iter().map(Point::swapped).collect()
}

/// Bounding box, or `None` for an empty set
pub fn bounds(points: &[WeldPoint]) -> Option<Bounds> {
    let first = points.first()?;
    let init = Bounds {
        min_x: first.x,
        min_y: first.y,
        max_x: first.x,
        max_y: first.y,
    };
    Some(points.iter().skip(1).fold(init, |b, p| Bounds {
        min_x: b.min_x.min(p.x),
        min_y: b.min_y.min(p.y),
        max_x: b.max_x.max(p.x),
        max_y: b.max_y.max(p.y),
    }))
}
