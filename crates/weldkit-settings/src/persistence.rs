//! Scale-factor persistence
//!
//! Calibrated pulses-per-mm values outlive the process. The machine reads
//! them once at start-up and writes them only through an explicit
//! calibration apply.

use crate::error::{PersistenceError, PersistenceResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use weldkit_core::Axis;

/// Key under which an axis scale is stored (`pulses_per_mm_x`, ...)
pub fn scale_key(axis: Axis) -> String {
    format!("pulses_per_mm_{}", axis.key())
}

/// Key-value store for per-axis scale factors
pub trait ScaleStore: Send + Sync {
    /// Stored scale for an axis, if any
    fn load(&self, axis: Axis) -> Option<f64>;

    /// Persist the scale for an axis
    fn save(&self, axis: Axis, pulses_per_unit: f64) -> PersistenceResult<()>;
}

fn check_value(axis: Axis, value: f64) -> PersistenceResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PersistenceError::InvalidValue {
            key: scale_key(axis),
            value,
        })
    }
}

/// Scale store backed by a flat JSON object on disk.
///
/// Other keys already present in the file are preserved on save.
#[derive(Debug)]
pub struct JsonScaleStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonScaleStore {
    /// Create a store for the given file; the file need not exist yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> serde_json::Map<String, serde_json::Value> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Default::default(),
            Err(e) => {
                tracing::warn!("Cannot read {}: {}", self.path.display(), e);
                return Default::default();
            }
        };
        match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(_) => {
                tracing::warn!("{} is not a JSON object; ignoring", self.path.display());
                Default::default()
            }
            Err(e) => {
                tracing::warn!("{} is corrupt ({}); ignoring", self.path.display(), e);
                Default::default()
            }
        }
    }
}

impl ScaleStore for JsonScaleStore {
    fn load(&self, axis: Axis) -> Option<f64> {
        let _guard = self.lock.lock();
        self.read_map()
            .get(&scale_key(axis))
            .and_then(|v| v.as_f64())
            .filter(|v| v.is_finite() && *v > 0.0)
    }

    fn save(&self, axis: Axis, pulses_per_unit: f64) -> PersistenceResult<()> {
        check_value(axis, pulses_per_unit)?;
        let _guard = self.lock.lock();
        let mut map = self.read_map();
        map.insert(scale_key(axis), serde_json::Value::from(pulses_per_unit));
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&serde_json::Value::Object(map))?;
        std::fs::write(&self.path, content)?;
        tracing::info!(
            "Saved {} = {} to {}",
            scale_key(axis),
            pulses_per_unit,
            self.path.display()
        );
        Ok(())
    }
}

/// In-memory scale store for simulation and tests
#[derive(Debug, Default)]
pub struct MemoryScaleStore {
    values: Mutex<BTreeMap<Axis, f64>>,
}

impl MemoryScaleStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with initial values
    pub fn with_values(values: impl IntoIterator<Item = (Axis, f64)>) -> Self {
        Self {
            values: Mutex::new(values.into_iter().collect()),
        }
    }
}

impl ScaleStore for MemoryScaleStore {
    fn load(&self, axis: Axis) -> Option<f64> {
        self.values.lock().get(&axis).copied()
    }

    fn save(&self, axis: Axis, pulses_per_unit: f64) -> PersistenceResult<()> {
        check_value(axis, pulses_per_unit)?;
        self.values.lock().insert(axis, pulses_per_unit);
        Ok(())
    }
}
