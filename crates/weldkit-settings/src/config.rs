//! Configuration management for WeldKit
//!
//! Provides configuration file handling and validation. Supports JSON and
//! TOML files, chosen by extension, stored in a platform-specific directory.
//!
//! Configuration is organized into logical sections:
//! - Machine envelope, Z soft limits and retract heights
//! - Per-axis scale, mounting direction and homing direction
//! - Homing speeds, backoff and timeouts
//! - Polling intervals, settle windows and move timeouts
//! - Geometry tolerances and weld head dimensions
//! - Weld presets

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
use crate::presets::{builtin_presets, WeldPreset, DEFAULT_PRESET_NAME};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use weldkit_core::Axis;
use weldkit_path::HeadGeometry;

/// File name used inside the config directory
pub const CONFIG_FILE_NAME: &str = "weldkit.toml";

/// Machine envelope and Z heights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineSettings {
    /// X travel from the homed origin, in mm
    pub max_x_mm: f64,
    /// Y travel from the homed origin, in mm
    pub max_y_mm: f64,
    /// Lowest Z pulse target accepted (soft limit)
    pub z_min_pulse: i32,
    /// Highest Z pulse target accepted (soft limit)
    pub z_max_pulse: i32,
    /// Z pulse the head retracts to between points
    pub safe_z_pulse: i32,
    /// Z pulse used before a long XY travel
    pub long_retract_pulse: i32,
    /// Z pulse used before the final return to origin
    pub final_retract_pulse: i32,
    /// Distance to the next point at or above which the long retract is used, in mm
    pub long_retract_threshold_mm: f64,
    /// Z profile velocity in actuator units
    pub z_profile_velocity: u32,
    /// Z profile acceleration in actuator units
    pub z_profile_acceleration: u32,
    /// Slack allowed at the envelope edges, in mm
    pub envelope_tolerance_mm: f64,
    /// Preset used for homing and return-to-origin moves
    pub default_preset: String,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self {
            max_x_mm: 600.0,
            max_y_mm: 400.0,
            z_min_pulse: 0,
            z_max_pulse: 60_000,
            safe_z_pulse: 2_000,
            long_retract_pulse: 500,
            final_retract_pulse: 0,
            long_retract_threshold_mm: 20.0,
            z_profile_velocity: 200,
            z_profile_acceleration: 20,
            envelope_tolerance_mm: 1e-6,
            default_preset: DEFAULT_PRESET_NAME.to_string(),
        }
    }
}

/// Scale and orientation of one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisSettings {
    /// Default pulses per mm, used until a calibrated value is stored
    pub pulses_per_unit: f64,
    /// Mounting orientation (+1 or -1)
    pub direction: i32,
    /// Direction of travel towards the homing sensor (+1 or -1)
    pub homing_sign: i32,
}

impl Default for AxisSettings {
    fn default() -> Self {
        Self {
            pulses_per_unit: 100.0,
            direction: 1,
            homing_sign: -1,
        }
    }
}

/// Per-axis settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxesSettings {
    /// X axis
    pub x: AxisSettings,
    /// Y axis
    pub y: AxisSettings,
    /// Z axis
    pub z: AxisSettings,
}

impl Default for AxesSettings {
    fn default() -> Self {
        Self {
            x: AxisSettings::default(),
            y: AxisSettings::default(),
            z: AxisSettings {
                pulses_per_unit: 1_000.0,
                direction: 1,
                homing_sign: 1,
            },
        }
    }
}

impl AxesSettings {
    /// Settings of one axis
    pub fn get(&self, axis: Axis) -> &AxisSettings {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }
}

/// Sensor homing parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HomingSettings {
    /// Velocity of the first approach (actuator units)
    pub fast_speed: i32,
    /// Velocity of the final approach (actuator units)
    pub slow_speed: i32,
    /// Velocity of the backoff move (actuator units)
    pub backoff_speed: i32,
    /// Backoff acceleration (actuator units)
    pub backoff_acceleration: u32,
    /// Backoff distance, in mm
    pub backoff_distance_mm: f64,
    /// Backoff time limit, in ms
    pub backoff_timeout_ms: u64,
    /// Time limit for each sensor approach, in ms
    pub approach_timeout_ms: u64,
}

impl Default for HomingSettings {
    fn default() -> Self {
        Self {
            fast_speed: 100,
            slow_speed: 10,
            backoff_speed: 30,
            backoff_acceleration: 5,
            backoff_distance_mm: 20.0,
            backoff_timeout_ms: 5_000,
            approach_timeout_ms: 60_000,
        }
    }
}

impl HomingSettings {
    /// Backoff time limit
    pub fn backoff_timeout(&self) -> Duration {
        Duration::from_millis(self.backoff_timeout_ms)
    }

    /// Sensor approach time limit
    pub fn approach_timeout(&self) -> Duration {
        Duration::from_millis(self.approach_timeout_ms)
    }
}

/// Polling intervals, settle windows and timeouts, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// Motion-complete polling interval
    pub poll_interval_ms: u64,
    /// Homing sensor polling interval
    pub sensor_poll_ms: u64,
    /// Backoff position polling interval
    pub backoff_poll_ms: u64,
    /// XY move time limit
    pub move_timeout_ms: u64,
    /// Z position move time limit
    pub z_move_timeout_ms: u64,
    /// Z move counts as done within this many pulses of the target
    pub z_position_threshold: i32,
    /// Gentle-current window before reading the contact position
    pub contact_settle_ms: u64,
    /// Zero-current hold after contact
    pub contact_release_ms: u64,
    /// Press-current ramp before the welder is energized
    pub press_ramp_ms: u64,
    /// Pause after the fast approach stops on the sensor
    pub trigger_settle_ms: u64,
    /// Pause after stopping a continuous move
    pub stop_settle_ms: u64,
    /// Pause after arriving at the first point of a job
    pub first_point_settle_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            sensor_poll_ms: 5,
            backoff_poll_ms: 20,
            move_timeout_ms: 30_000,
            z_move_timeout_ms: 5_000,
            z_position_threshold: 10,
            contact_settle_ms: 300,
            contact_release_ms: 200,
            press_ramp_ms: 500,
            trigger_settle_ms: 300,
            stop_settle_ms: 50,
            first_point_settle_ms: 1_000,
        }
    }
}

/// Geometry tolerances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToleranceSettings {
    /// On-segment tolerance of the boundary predicate
    pub on_segment: f64,
    /// Endpoint coincidence tolerance for contour assembly
    pub contour: f64,
    /// Edges shorter than this are skipped during point generation
    pub min_edge_length: f64,
}

impl Default for ToleranceSettings {
    fn default() -> Self {
        Self {
            on_segment: 1e-9,
            contour: 1e-4,
            min_edge_length: 1e-6,
        }
    }
}

/// Complete machine configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Envelope and Z heights
    pub machine: MachineSettings,
    /// Per-axis scale and orientation
    pub axes: AxesSettings,
    /// Sensor homing
    pub homing: HomingSettings,
    /// Polling and timeouts
    pub timing: TimingSettings,
    /// Geometry tolerances
    pub tolerances: ToleranceSettings,
    /// Weld head dimensions and correction
    pub head: HeadGeometry,
    /// Weld presets by name
    pub presets: BTreeMap<String, WeldPreset>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            machine: MachineSettings::default(),
            axes: AxesSettings::default(),
            homing: HomingSettings::default(),
            timing: TimingSettings::default(),
            tolerances: ToleranceSettings::default(),
            head: HeadGeometry::default(),
            presets: builtin_presets(),
        }
    }
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> ConfigResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform config directory for WeldKit
    pub fn config_dir() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("weldkit"))
            .ok_or(SettingsError::NoConfigDirectory)
    }

    /// Default config file path
    pub fn default_path() -> SettingsResult<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path)
            .map_err(|source| SettingsError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };
        config.validate()?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load the file if it exists, otherwise return defaults
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::info!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;
        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
            .map_err(|source| SettingsError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        let m = &self.machine;
        if !(m.max_x_mm > 0.0) {
            return Err(ConfigError::out_of_range("machine.max_x_mm", m.max_x_mm));
        }
        if !(m.max_y_mm > 0.0) {
            return Err(ConfigError::out_of_range("machine.max_y_mm", m.max_y_mm));
        }
        if m.z_min_pulse >= m.z_max_pulse {
            return Err(ConfigError::out_of_range(
                "machine.z_min_pulse",
                format!("{} (z_max_pulse {})", m.z_min_pulse, m.z_max_pulse),
            ));
        }
        let z_range = m.z_min_pulse..=m.z_max_pulse;
        for (key, value) in [
            ("machine.safe_z_pulse", m.safe_z_pulse),
            ("machine.long_retract_pulse", m.long_retract_pulse),
            ("machine.final_retract_pulse", m.final_retract_pulse),
        ] {
            if !z_range.contains(&value) {
                return Err(ConfigError::out_of_range(key, value));
            }
        }
        if m.long_retract_threshold_mm < 0.0 {
            return Err(ConfigError::out_of_range(
                "machine.long_retract_threshold_mm",
                m.long_retract_threshold_mm,
            ));
        }
        if m.envelope_tolerance_mm < 0.0 {
            return Err(ConfigError::out_of_range(
                "machine.envelope_tolerance_mm",
                m.envelope_tolerance_mm,
            ));
        }

        for axis in Axis::ALL {
            let a = self.axes.get(axis);
            if !(a.pulses_per_unit.is_finite() && a.pulses_per_unit > 0.0) {
                return Err(ConfigError::out_of_range(
                    &format!("axes.{}.pulses_per_unit", axis.key()),
                    a.pulses_per_unit,
                ));
            }
            if a.direction.abs() != 1 {
                return Err(ConfigError::out_of_range(
                    &format!("axes.{}.direction", axis.key()),
                    a.direction,
                ));
            }
            if a.homing_sign.abs() != 1 {
                return Err(ConfigError::out_of_range(
                    &format!("axes.{}.homing_sign", axis.key()),
                    a.homing_sign,
                ));
            }
        }

        let h = &self.homing;
        for (key, value) in [
            ("homing.fast_speed", h.fast_speed),
            ("homing.slow_speed", h.slow_speed),
            ("homing.backoff_speed", h.backoff_speed),
        ] {
            if value <= 0 {
                return Err(ConfigError::out_of_range(key, value));
            }
        }
        if !(h.backoff_distance_mm >= 0.0) {
            return Err(ConfigError::out_of_range(
                "homing.backoff_distance_mm",
                h.backoff_distance_mm,
            ));
        }

        let t = &self.timing;
        for (key, value) in [
            ("timing.poll_interval_ms", t.poll_interval_ms),
            ("timing.sensor_poll_ms", t.sensor_poll_ms),
            ("timing.backoff_poll_ms", t.backoff_poll_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::out_of_range(key, value));
            }
        }
        if self.timing.z_position_threshold < 0 {
            return Err(ConfigError::out_of_range(
                "timing.z_position_threshold",
                self.timing.z_position_threshold,
            ));
        }

        let t = &self.tolerances;
        if !(t.on_segment > 0.0 && t.contour > 0.0 && t.min_edge_length >= 0.0) {
            return Err(ConfigError::out_of_range(
                "tolerances",
                format!("{:?}", t),
            ));
        }

        self.head.validate().map_err(|e| ConfigError::out_of_range("head", e))?;

        for (name, preset) in &self.presets {
            preset.validate(name)?;
        }
        if !self.presets.contains_key(&m.default_preset) {
            return Err(ConfigError::MissingKey(format!(
                "presets.{}",
                m.default_preset
            )));
        }
        Ok(())
    }

    /// Look up a preset by name
    pub fn preset(&self, name: &str) -> Option<&WeldPreset> {
        self.presets.get(name)
    }

    /// The preset used for homing and return-to-origin moves
    pub fn default_preset(&self) -> WeldPreset {
        self.presets
            .get(&self.machine.default_preset)
            .copied()
            .unwrap_or_default()
    }
}
