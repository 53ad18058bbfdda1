//! Weld presets
//!
//! A preset bundles the path pitch, the XY motion profile and the press
//! parameters for one material. Presets are read-only to the machine code.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the preset used for homing and return-to-origin moves
pub const DEFAULT_PRESET_NAME: &str = "default";

/// Weld parameters for one material
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeldPreset {
    /// Spacing between weld points along the path, in mm
    pub weld_pitch: f64,
    /// XY profile velocity in actuator units (0 = actuator maximum)
    pub velocity_xy: u32,
    /// XY profile acceleration in actuator units (0 = actuator maximum)
    pub acceleration_xy: u32,
    /// Press current during the weld, in signed mA
    pub weld_current: i32,
    /// Low current used for contact detection, in signed mA
    pub gentle_current: i32,
    /// Ultrasonic activation time, in seconds
    pub weld_time_s: f64,
}

impl WeldPreset {
    /// Create a preset
    pub fn new(
        weld_pitch: f64,
        velocity_xy: u32,
        acceleration_xy: u32,
        weld_current: i32,
        gentle_current: i32,
        weld_time_s: f64,
    ) -> Self {
        Self {
            weld_pitch,
            velocity_xy,
            acceleration_xy,
            weld_current,
            gentle_current,
            weld_time_s,
        }
    }

    /// Reject presets that cannot drive a weld
    pub fn validate(&self, name: &str) -> ConfigResult<()> {
        let invalid = |reason: &str| ConfigError::InvalidPreset {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        if !(self.weld_pitch.is_finite() && self.weld_pitch > 0.0) {
            return Err(invalid("weld_pitch must be > 0"));
        }
        if !(self.weld_time_s.is_finite() && self.weld_time_s > 0.0) {
            return Err(invalid("weld_time_s must be > 0"));
        }
        Ok(())
    }

    /// Weld time as a duration
    pub fn weld_time(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.weld_time_s.max(0.0))
    }
}

impl Default for WeldPreset {
    fn default() -> Self {
        Self::new(2.0, 0, 0, 30, 30, 2.0)
    }
}

/// The preset library shipped with the machine
pub fn builtin_presets() -> BTreeMap<String, WeldPreset> {
    [
        (DEFAULT_PRESET_NAME, WeldPreset::default()),
        (
            "polyurethane-0.6+0.3",
            WeldPreset::new(2.0, 150, 15, 120, 10, 1.3),
        ),
        (
            "polyurethane-0.3+0.3",
            WeldPreset::new(2.0, 300, 15, 50, 200, 1.2),
        ),
        (
            "polyurethane-strong-0.3+0.3",
            WeldPreset::new(1.8, 15, 15, 70, 200, 1.4),
        ),
        ("test1", WeldPreset::new(2.0, 150, 20, 50, 35, 1.0)),
        ("test2", WeldPreset::new(2.0, 10, 150, 100, 200, 2.0)),
    ]
    .into_iter()
    .map(|(name, preset)| (name.to_string(), preset))
    .collect()
}
