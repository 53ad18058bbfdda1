//! Geometry kernel
//!
//! Segment type plus the point predicates shared by contour assembly and
//! head placement. Every comparison takes an explicit absolute tolerance.

use serde::{Deserialize, Serialize};
use weldkit_core::Point;

/// Default tolerance of the on-segment test
pub const ON_SEGMENT_TOLERANCE: f64 = 1e-9;

/// A straight segment between two points.
///
/// Identity is undirected: a segment equals its reverse for deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// First endpoint
    pub start: Point,
    /// Second endpoint
    pub end: Point,
}

impl Segment {
    /// Create a new segment
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Segment length
    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    /// Whether both endpoints coincide within `tolerance`
    pub fn is_degenerate(&self, tolerance: f64) -> bool {
        self.start.coincides_with(&self.end, tolerance)
    }

    /// The same segment traversed the other way
    pub fn reversed(&self) -> Self {
        Self {
            start: self.end,
            end: self.start,
        }
    }

    /// Endpoints ordered lexicographically by (x, y)
    pub fn canonical(&self) -> Self {
        let (a, b) = (self.start, self.end);
        if (a.x, a.y) <= (b.x, b.y) {
            *self
        } else {
            self.reversed()
        }
    }

    /// Undirected equality within `tolerance`
    pub fn same_as(&self, other: &Segment, tolerance: f64) -> bool {
        (self.start.coincides_with(&other.start, tolerance)
            && self.end.coincides_with(&other.end, tolerance))
            || (self.start.coincides_with(&other.end, tolerance)
                && self.end.coincides_with(&other.start, tolerance))
    }

    /// Unit tangent from start to end, or `None` for a zero-length segment
    pub fn direction(&self) -> Option<(f64, f64)> {
        let len = self.length();
        if len <= f64::EPSILON {
            return None;
        }
        Some(((self.end.x - self.start.x) / len, (self.end.y - self.start.y) / len))
    }
}

impl From<((f64, f64), (f64, f64))> for Segment {
    fn from((a, b): ((f64, f64), (f64, f64))) -> Self {
        Self::new(a.into(), b.into())
    }
}

/// True iff `p` lies within `tolerance` of the bounding box of `a-b` and the
/// cross product of `(p - a)` with `(b - a)` is within `tolerance`.
pub fn point_on_segment(p: &Point, a: &Point, b: &Point, tolerance: f64) -> bool {
    let in_box = p.x >= a.x.min(b.x) - tolerance
        && p.x <= a.x.max(b.x) + tolerance
        && p.y >= a.y.min(b.y) - tolerance
        && p.y <= a.y.max(b.y) + tolerance;
    if !in_box {
        return false;
    }
    let cross = (p.y - a.y) * (b.x - a.x) - (p.x - a.x) * (b.y - a.y);
    cross.abs() < tolerance
}

/// Iterate the edges of a ring, including the closing edge back to the first vertex
pub fn ring_edges(ring: &[Point]) -> impl Iterator<Item = (&Point, &Point)> + '_ {
    let n = ring.len();
    (0..n).map(move |i| (&ring[i], &ring[(i + 1) % n]))
}

/// Whether `p` lies on any edge of the ring
pub fn point_on_ring(p: &Point, ring: &[Point], tolerance: f64) -> bool {
    ring.len() >= 2 && ring_edges(ring).any(|(a, b)| point_on_segment(p, a, b, tolerance))
}

/// Parity contribution of one edge to the horizontal ray cast from `p`
fn crosses_ray(p: &Point, a: &Point, b: &Point) -> bool {
    if p.y > a.y.min(b.y) && p.y <= a.y.max(b.y) && p.x <= a.x.max(b.x) {
        if a.x == b.x {
            return true;
        }
        if a.y != b.y {
            let x_inters = (p.y - a.y) * (b.x - a.x) / (b.y - a.y) + a.x;
            return p.x <= x_inters;
        }
    }
    false
}

/// Ray-casting parity test.
///
/// A point on any edge of the ring is reported as outside.
pub fn point_in_polygon(p: &Point, ring: &[Point]) -> bool {
    point_in_polygon_with_tolerance(p, ring, ON_SEGMENT_TOLERANCE)
}

/// [`point_in_polygon`] with an explicit on-edge tolerance
pub fn point_in_polygon_with_tolerance(p: &Point, ring: &[Point], tolerance: f64) -> bool {
    if ring.len() < 3 || point_on_ring(p, ring, tolerance) {
        return false;
    }
    ring_edges(ring).filter(|(a, b)| crosses_ray(p, a, b)).count() % 2 == 1
}

/// Even-odd test against several rings at once.
///
/// A point on any edge of any ring is outside; otherwise the crossings of all
/// rings are counted together, so a hole inside an outer ring is outside.
pub fn point_in_outline<R: AsRef<[Point]>>(p: &Point, rings: &[R], tolerance: f64) -> bool {
    let rings: Vec<&[Point]> = rings
        .iter()
        .map(|r| r.as_ref())
        .filter(|r| r.len() >= 3)
        .collect();
    if rings.iter().any(|r| point_on_ring(p, r, tolerance)) {
        return false;
    }
    let crossings: usize = rings
        .iter()
        .map(|r| ring_edges(r).filter(|(a, b)| crosses_ray(p, a, b)).count())
        .sum();
    crossings % 2 == 1
}
