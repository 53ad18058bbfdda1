//! Unit conversion and soft limits

use weldkit_core::MotionError;

/// Millimetre/pulse conversion for one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisConversion {
    /// Pulses per mm
    pub pulses_per_unit: f64,
    /// Pulse value of logical zero
    pub homing_offset: i32,
    /// Mounting orientation (+1 or -1)
    pub direction: i32,
}

impl AxisConversion {
    /// Create a conversion
    pub fn new(pulses_per_unit: f64, homing_offset: i32, direction: i32) -> Self {
        Self {
            pulses_per_unit,
            homing_offset,
            direction,
        }
    }

    /// Logical millimetres to raw pulses
    pub fn to_pulses(&self, mm: f64) -> i32 {
        let steps = (mm * self.pulses_per_unit).round() as i32;
        self.homing_offset + steps * self.direction
    }

    /// Raw pulses to logical millimetres; zero when the scale is unset
    pub fn to_mm(&self, pulses: i32) -> f64 {
        if self.pulses_per_unit == 0.0 {
            return 0.0;
        }
        (pulses - self.homing_offset) as f64 * self.direction as f64 / self.pulses_per_unit
    }

    /// Pulse delta for a relative move of `mm`
    pub fn delta_pulses(&self, mm: f64) -> i32 {
        (mm * self.pulses_per_unit).round() as i32 * self.direction
    }
}

/// Z soft limits in raw pulses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZLimits {
    /// Lowest accepted target
    pub min_pulse: i32,
    /// Highest accepted target
    pub max_pulse: i32,
}

impl ZLimits {
    /// Create limits
    pub fn new(min_pulse: i32, max_pulse: i32) -> Self {
        Self {
            min_pulse,
            max_pulse,
        }
    }

    /// Clamp a target into the limits, warning when it had to move
    pub fn clamp(&self, pulse: i32) -> i32 {
        let clamped = pulse.clamp(self.min_pulse, self.max_pulse);
        if clamped != pulse {
            tracing::warn!(
                "Z target {} outside soft limits [{}, {}], clamped to {}",
                pulse,
                self.min_pulse,
                self.max_pulse,
                clamped
            );
        }
        clamped
    }

    /// Whether a target lies inside the limits
    pub fn contains(&self, pulse: i32) -> bool {
        (self.min_pulse..=self.max_pulse).contains(&pulse)
    }
}

/// Corrected scale after measuring a commanded move.
///
/// A move of `target_mm` that measured `measured_mm` yields
/// `current * target / measured`.
pub fn calibrated_scale(current: f64, target_mm: f64, measured_mm: f64) -> Result<f64, MotionError> {
    if measured_mm == 0.0 || !measured_mm.is_finite() {
        return Err(MotionError::InvalidCalibration {
            reason: format!("measured distance must be non-zero, got {}", measured_mm),
        });
    }
    let scale = current * target_mm / measured_mm;
    if !(scale.is_finite() && scale > 0.0) {
        return Err(MotionError::InvalidCalibration {
            reason: format!("resulting scale {} is not positive", scale),
        });
    }
    Ok(scale)
}
