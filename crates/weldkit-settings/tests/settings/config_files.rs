//! Tests for loading and saving configuration files

use tempfile::TempDir;
use weldkit_settings::{Config, ConfigError, SettingsError, WeldPreset};

#[test]
fn test_json_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("weldkit.json");

    let mut config = Config::default();
    config.machine.max_x_mm = 450.0;
    config.axes.x.direction = -1;
    config
        .presets
        .insert("nylon".to_string(), WeldPreset::new(1.5, 100, 10, 80, 20, 0.8));
    config.save_to_file(&path).unwrap();

    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_toml_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("weldkit.toml");

    let mut config = Config::default();
    config.homing.backoff_distance_mm = 12.5;
    config.head.width = 30.0;
    config.save_to_file(&path).unwrap();

    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_partial_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("partial.toml");
    std::fs::write(&path, "[machine]\nmax_x_mm = 300.0\n\n[homing]\nslow_speed = 5\n").unwrap();

    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded.machine.max_x_mm, 300.0);
    assert_eq!(loaded.machine.max_y_mm, Config::default().machine.max_y_mm);
    assert_eq!(loaded.homing.slow_speed, 5);
    assert_eq!(loaded.presets, Config::default().presets);
}

#[test]
fn test_invalid_file_is_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"{"machine": {"max_y_mm": -5.0}}"#).unwrap();

    let err = Config::load_from_file(&path).unwrap_err();
    assert!(matches!(
        err,
        SettingsError::Config(ConfigError::ValueOutOfRange { .. })
    ));
}

#[test]
fn test_malformed_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        Config::load_from_file(&path),
        Err(SettingsError::Json(_))
    ));
}

#[test]
fn test_load_or_default_without_file() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_or_default(&dir.path().join("missing.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_unreadable_file_names_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.json");
    match Config::load_from_file(&path) {
        Err(SettingsError::Read { path: failed, .. }) => assert_eq!(failed, path),
        other => panic!("expected a read error, got {other:?}"),
    }
}

#[test]
fn test_unwritable_target_names_path() {
    let dir = TempDir::new().unwrap();
    // A directory in place of the file makes the write fail.
    let path = dir.path().join("taken.toml");
    std::fs::create_dir(&path).unwrap();
    match Config::default().save_to_file(&path) {
        Err(SettingsError::Write { path: failed, .. }) => assert_eq!(failed, path),
        other => panic!("expected a write error, got {other:?}"),
    }
}
