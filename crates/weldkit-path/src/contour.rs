//! Contour assembly
//!
//! Rebuilds ordered vertex chains from an unordered segment soup. Matching is
//! greedy: the first pool segment touching the current chain end wins and
//! growth stops at the first end with no match.

use crate::geometry::Segment;
use serde::{Deserialize, Serialize};
use weldkit_core::{GeometryError, Point};

/// Default coincidence tolerance for assembly, in millimetres
pub const DEFAULT_CONTOUR_TOLERANCE: f64 = 1e-4;

/// An ordered sequence of distinct points, open or closed.
///
/// A closed chain does not repeat its first point at the end; the last point
/// connects back to the first implicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexChain {
    points: Vec<Point>,
    closed: bool,
}

impl VertexChain {
    /// Create a chain, rejecting fewer than two points
    pub fn new(points: Vec<Point>, closed: bool) -> Result<Self, GeometryError> {
        if points.len() < 2 {
            return Err(GeometryError::DegenerateChain {
                count: points.len(),
            });
        }
        Ok(Self { points, closed })
    }

    /// Vertices in order
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Whether the last vertex connects back to the first
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a constructed chain
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Edges in walk order, including the wrap edge of a closed chain
    pub fn edges(&self) -> impl Iterator<Item = Segment> + '_ {
        let n = self.points.len();
        let count = if self.closed { n } else { n - 1 };
        (0..count).map(move |i| Segment::new(self.points[i], self.points[(i + 1) % n]))
    }

    /// Total length along the chain
    pub fn length(&self) -> f64 {
        self.edges().map(|e| e.length()).sum()
    }
}

impl AsRef<[Point]> for VertexChain {
    fn as_ref(&self) -> &[Point] {
        &self.points
    }
}

/// Drop degenerate segments, canonicalise endpoint order and remove duplicates.
///
/// The first occurrence of each segment is kept, in input order.
pub fn dedup_segments(segments: &[Segment], tolerance: f64) -> Vec<Segment> {
    let mut kept: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        if segment.is_degenerate(tolerance) {
            continue;
        }
        let canonical = segment.canonical();
        if kept.iter().any(|k| k.same_as(&canonical, tolerance)) {
            continue;
        }
        kept.push(canonical);
    }
    kept
}

/// Remove and return the first pool segment touching `end`, oriented so that
/// its first point is the shared one.
fn take_touching(pool: &mut Vec<Segment>, end: &Point, tolerance: f64) -> Option<Segment> {
    let idx = pool
        .iter()
        .position(|s| s.start.coincides_with(end, tolerance) || s.end.coincides_with(end, tolerance))?;
    let segment = pool.remove(idx);
    if segment.start.coincides_with(end, tolerance) {
        Some(segment)
    } else {
        Some(segment.reversed())
    }
}

fn closes(points: &[Point], tolerance: f64) -> bool {
    match (points.first(), points.last()) {
        (Some(head), Some(tail)) => points.len() >= 4 && head.coincides_with(tail, tolerance),
        _ => false,
    }
}

/// Assemble unordered segments into vertex chains.
///
/// Each segment is used at most once. Chains are emitted in discovery order.
pub fn assemble_contours(segments: &[Segment], tolerance: f64) -> Vec<VertexChain> {
    let mut pool = dedup_segments(segments, tolerance);
    let mut chains = Vec::new();

    while !pool.is_empty() {
        let seed = pool.remove(0);
        let mut points = vec![seed.start, seed.end];
        let mut closed = false;

        while let Some(tail) = points.last().copied() {
            let Some(next) = take_touching(&mut pool, &tail, tolerance) else {
                break;
            };
            points.push(next.end);
            if closes(&points, tolerance) {
                closed = true;
                break;
            }
        }

        if !closed {
            let mut prefix: Vec<Point> = Vec::new();
            loop {
                let head = prefix.last().copied().unwrap_or(points[0]);
                let Some(prev) = take_touching(&mut pool, &head, tolerance) else {
                    break;
                };
                prefix.push(prev.end);
                let tail = points[points.len() - 1];
                if prev.end.coincides_with(&tail, tolerance) && prefix.len() + points.len() >= 4 {
                    closed = true;
                    break;
                }
            }
            if !prefix.is_empty() {
                prefix.reverse();
                prefix.extend(points);
                points = prefix;
            }
        }

        if closed {
            points.pop();
        }

        match VertexChain::new(points, closed) {
            Ok(chain) => chains.push(chain),
            Err(err) => tracing::debug!("Discarding chain: {}", err),
        }
    }

    tracing::debug!(
        "Assembled {} chain(s) ({} closed)",
        chains.len(),
        chains.iter().filter(|c| c.is_closed()).count()
    );
    chains
}
