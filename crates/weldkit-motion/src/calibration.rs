//! Tilt-plane calibration
//!
//! Probe targets spanning the work envelope and the least-squares fit of
//! `z = a·x + b·y + c` through the measured contact heights.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use weldkit_core::{MotionError, Point, TiltPlane};

/// Relative rank threshold below which the samples count as collinear
const RANK_TOLERANCE: f64 = 1e-9;

/// One measured surface height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeSample {
    /// X in mm
    pub x: f64,
    /// Y in mm
    pub y: f64,
    /// Contact height in mm
    pub z: f64,
}

impl ProbeSample {
    /// Create a sample
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Probe targets for a tilt calibration.
///
/// Three points form a triangle over the envelope; sixteen points form a
/// 4×4 grid inset by 10% on each side.
pub fn tilt_targets(count: usize, max_x: f64, max_y: f64) -> Result<Vec<Point>, MotionError> {
    match count {
        3 => Ok(vec![
            Point::new(0.1 * max_x, 0.1 * max_y),
            Point::new(0.9 * max_x, 0.5 * max_y),
            Point::new(0.5 * max_x, 0.9 * max_y),
        ]),
        16 => {
            let step_x = max_x * 0.8 / 3.0;
            let step_y = max_y * 0.8 / 3.0;
            let mut targets = Vec::with_capacity(16);
            for i in 0..4 {
                for j in 0..4 {
                    targets.push(Point::new(
                        step_x * i as f64 + 0.1 * max_x,
                        step_y * j as f64 + 0.1 * max_y,
                    ));
                }
            }
            Ok(targets)
        }
        _ => Err(MotionError::UnsupportedProbeCount { count }),
    }
}

/// Least-squares plane through the samples.
///
/// Solves the normal equations on mean-centred data. No outlier rejection.
pub fn fit_plane(samples: &[ProbeSample]) -> Result<TiltPlane, MotionError> {
    let n = samples.len();
    if n < 3 {
        return Err(MotionError::InsufficientSamples { count: n });
    }

    let inv_n = 1.0 / n as f64;
    let mean_x = samples.iter().map(|s| s.x).sum::<f64>() * inv_n;
    let mean_y = samples.iter().map(|s| s.y).sum::<f64>() * inv_n;
    let mean_z = samples.iter().map(|s| s.z).sum::<f64>() * inv_n;

    let design = DMatrix::from_fn(n, 2, |r, c| {
        if c == 0 {
            samples[r].x - mean_x
        } else {
            samples[r].y - mean_y
        }
    });
    let heights = DVector::from_fn(n, |r, _| samples[r].z - mean_z);

    let singular = design.clone().svd(false, false).singular_values;
    let largest = singular.max();
    if largest <= f64::EPSILON || singular.min() <= largest * RANK_TOLERANCE {
        return Err(MotionError::DegenerateSamples);
    }

    let normal = design.transpose() * &design;
    let rhs = design.transpose() * heights;
    let slopes = normal.lu().solve(&rhs).ok_or(MotionError::DegenerateSamples)?;

    let a = slopes[0];
    let b = slopes[1];
    let c = mean_z - a * mean_x - b * mean_y;
    Ok(TiltPlane::new(a, b, c))
}
