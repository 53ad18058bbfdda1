//! WeldKit Settings Crate
//!
//! Handles machine configuration, weld presets and persistence of
//! calibrated scale factors.

pub mod config;
pub mod error;
pub mod persistence;
pub mod presets;

pub use config::{
    AxesSettings, AxisSettings, Config, HomingSettings, MachineSettings, TimingSettings,
    ToleranceSettings, CONFIG_FILE_NAME,
};
pub use error::{
    ConfigError, ConfigResult, PersistenceError, PersistenceResult, SettingsError, SettingsResult,
};
pub use persistence::{scale_key, JsonScaleStore, MemoryScaleStore, ScaleStore};
pub use presets::{builtin_presets, WeldPreset, DEFAULT_PRESET_NAME};
