//! Head placement
//!
//! Oriented rectangular tool footprints along a contour, with a bounded
//! greedy correction that slides a footprint along its tangent until neither
//! tool end lies inside the part outline.

use crate::contour::VertexChain;
use crate::geometry::{point_in_outline, ON_SEGMENT_TOLERANCE};
use crate::points::walk_chain;
use serde::{Deserialize, Serialize};
use weldkit_core::{GeometryError, Point};

/// Tool dimensions and correction parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadGeometry {
    /// Tool length along the path tangent, in mm (default 40)
    pub width: f64,
    /// Tool thickness across the tangent, in mm (default 3)
    pub height: f64,
    /// Overlap between neighbouring heads in per-edge distribution, in mm (default 1)
    pub overlap: f64,
    /// Distance moved per correction step, in mm (default 0.5)
    pub shift_step: f64,
    /// Correction step cap (default 200)
    pub max_iterations: usize,
    /// On-edge tolerance for the inside tests (default 1e-9)
    pub edge_tolerance: f64,
}

impl Default for HeadGeometry {
    fn default() -> Self {
        Self {
            width: 40.0,
            height: 3.0,
            overlap: 1.0,
            shift_step: 0.5,
            max_iterations: 200,
            edge_tolerance: ON_SEGMENT_TOLERANCE,
        }
    }
}

impl HeadGeometry {
    /// Reject dimensions that cannot produce footprints
    pub fn validate(&self) -> Result<(), GeometryError> {
        let usable = self.width.is_finite()
            && self.width > 0.0
            && self.height > 0.0
            && self.overlap >= 0.0
            && self.overlap < self.width
            && self.shift_step > 0.0;
        if usable {
            Ok(())
        } else {
            Err(GeometryError::InvalidHead {
                width: self.width,
                overlap: self.overlap,
            })
        }
    }

    /// Spacing between head centres in per-edge distribution
    pub fn step(&self) -> f64 {
        self.width - self.overlap
    }
}

/// One placed tool footprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadFootprint {
    /// Footprint centre (the weld location)
    pub center: Point,
    /// Tangent direction in degrees
    pub angle_deg: f64,
    /// Rectangle corners, counter-clockwise from the rear-lower corner
    pub corners: [Point; 4],
    /// Tool end ahead of the centre along the tangent
    pub end1: Point,
    /// Tool end behind the centre along the tangent
    pub end2: Point,
    /// Whether `end1` lies inside the outline
    pub end1_inside: bool,
    /// Whether `end2` lies inside the outline
    pub end2_inside: bool,
    /// Correction hit the step cap with an end still inside
    pub correction_limited: bool,
}

impl HeadFootprint {
    /// Build a footprint at `center` and evaluate it against the outline
    pub fn new(center: Point, angle_deg: f64, geometry: &HeadGeometry, outline: &[VertexChain]) -> Self {
        let mut footprint = Self {
            center,
            angle_deg,
            corners: [center; 4],
            end1: center,
            end2: center,
            end1_inside: false,
            end2_inside: false,
            correction_limited: false,
        };
        footprint.refresh(geometry, outline);
        footprint
    }

    fn direction(&self) -> (f64, f64) {
        let rad = self.angle_deg.to_radians();
        (rad.cos(), rad.sin())
    }

    fn refresh(&mut self, geometry: &HeadGeometry, outline: &[VertexChain]) {
        let (cos, sin) = self.direction();
        let w2 = geometry.width / 2.0;
        let h2 = geometry.height / 2.0;
        let c = self.center;

        self.end1 = Point::new(c.x + w2 * cos, c.y + w2 * sin);
        self.end2 = Point::new(c.x - w2 * cos, c.y - w2 * sin);

        let local = [(-w2, -h2), (w2, -h2), (w2, h2), (-w2, h2)];
        for (corner, (lx, ly)) in self.corners.iter_mut().zip(local) {
            *corner = Point::new(c.x + lx * cos - ly * sin, c.y + lx * sin + ly * cos);
        }

        self.end1_inside = point_in_outline(&self.end1, outline, geometry.edge_tolerance);
        self.end2_inside = point_in_outline(&self.end2, outline, geometry.edge_tolerance);
    }

    /// Neither tool end lies inside the outline
    pub fn is_clear(&self) -> bool {
        !self.end1_inside && !self.end2_inside
    }

    /// Slide along the tangent until both ends are clear or the cap is reached.
    ///
    /// The direction is fixed from the starting flags: with `end2` inside the
    /// centre moves towards `end1`, otherwise towards `end2`. Returns whether
    /// the footprint ended clear.
    pub fn correct(&mut self, geometry: &HeadGeometry, outline: &[VertexChain]) -> bool {
        self.correction_limited = false;
        let (cos, sin) = self.direction();
        let sign = if self.end2_inside { 1.0 } else { -1.0 };
        let (dx, dy) = (sign * geometry.shift_step * cos, sign * geometry.shift_step * sin);
        let mut steps = 0;
        while !self.is_clear() && steps < geometry.max_iterations {
            self.center = self.center.offset(dx, dy);
            self.refresh(geometry, outline);
            steps += 1;
        }
        if !self.is_clear() {
            self.correction_limited = true;
            tracing::warn!(
                "Head correction limit reached at {} after {} steps",
                self.center,
                steps
            );
        }
        self.is_clear()
    }

    /// Move the footprint to a new centre and re-evaluate it without correction
    pub fn relocate(&mut self, center: Point, geometry: &HeadGeometry, outline: &[VertexChain]) {
        self.center = center;
        self.correction_limited = false;
        self.refresh(geometry, outline);
    }

    /// Rotate the footprint in place and re-evaluate it without correction
    pub fn rotate_to(&mut self, angle_deg: f64, geometry: &HeadGeometry, outline: &[VertexChain]) {
        self.angle_deg = angle_deg;
        self.refresh(geometry, outline);
    }
}

fn angle_of((dx, dy): (f64, f64)) -> f64 {
    dy.atan2(dx).to_degrees()
}

/// Place a corrected footprint at every pitch station of the chains.
///
/// `outline` is the full part outline the tool ends are tested against.
pub fn place_heads(
    chains: &[VertexChain],
    pitch: f64,
    geometry: &HeadGeometry,
    outline: &[VertexChain],
) -> Result<Vec<HeadFootprint>, GeometryError> {
    geometry.validate()?;
    if !(pitch.is_finite() && pitch > 0.0) {
        return Err(GeometryError::InvalidPitch { pitch });
    }
    let mut footprints = Vec::new();
    for chain in chains {
        walk_chain(chain, pitch, |center, dir| {
            let mut footprint = HeadFootprint::new(center, angle_of(dir), geometry, outline);
            footprint.correct(geometry, outline);
            footprints.push(footprint);
        });
    }
    log_summary(&footprints);
    Ok(footprints)
}

/// Distribute footprints evenly along each edge.
///
/// Every edge gets `ceil(len / (width - overlap))` heads (at least one),
/// centred at `(j + 0.5) * len / n` from the edge start.
pub fn distribute_heads(
    chains: &[VertexChain],
    geometry: &HeadGeometry,
    outline: &[VertexChain],
) -> Result<Vec<HeadFootprint>, GeometryError> {
    geometry.validate()?;
    let step = geometry.step();
    let mut footprints = Vec::new();
    for chain in chains {
        for edge in chain.edges() {
            let len = edge.length();
            let Some(dir) = edge.direction() else {
                continue;
            };
            let count = ((len / step).ceil() as usize).max(1);
            let spacing = len / count as f64;
            for j in 0..count {
                let t = spacing * (j as f64 + 0.5) / len;
                let center = edge.start.lerp(&edge.end, t);
                let mut footprint = HeadFootprint::new(center, angle_of(dir), geometry, outline);
                footprint.correct(geometry, outline);
                footprints.push(footprint);
            }
        }
    }
    log_summary(&footprints);
    Ok(footprints)
}

fn log_summary(footprints: &[HeadFootprint]) {
    let limited = footprints.iter().filter(|f| f.correction_limited).count();
    if limited > 0 {
        tracing::warn!(
            "{} of {} head(s) could not be fully corrected",
            limited,
            footprints.len()
        );
    } else {
        tracing::debug!("Placed {} head(s)", footprints.len());
    }
}
