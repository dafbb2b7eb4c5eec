//! Tests for config module

use std::io::Write;

use ringroute::config::{Config, StoreBackend};
use ringroute::schedule::Boundary;
use tempfile::NamedTempFile;

#[test]
fn test_config_file_exists() {
    let config_path = std::path::Path::new("config.toml");
    assert!(
        config_path.exists(),
        "config.toml should exist in project root"
    );
}

#[test]
fn test_sample_config_loads() {
    let config = Config::from_file(std::path::Path::new("config.toml"))
        .expect("Sample config.toml should be valid");
    assert_eq!(config.database.backend, StoreBackend::Sqlite);
    assert_eq!(config.resolution.boundary, Boundary::Open);
    assert_eq!(config.resolution.lookback_hours, 48);
}

#[test]
fn test_partial_file_uses_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[resolution]").unwrap();
    writeln!(file, "boundary = \"closed\"").unwrap();
    writeln!(file, "lookback_hours = 96").unwrap();
    file.flush().unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.resolution.boundary, Boundary::Closed);
    assert_eq!(config.resolution.lookback_hours, 96);
    assert_eq!(config.database, Config::default().database);
    assert_eq!(config.logging.format, "text");
}

#[test]
fn test_invalid_file_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[resolution]").unwrap();
    writeln!(file, "boundary = \"open\"").unwrap();
    writeln!(file, "lookback_hours = 500").unwrap();
    file.flush().unwrap();

    assert!(Config::from_file(file.path()).is_err());
}

#[test]
fn test_missing_file_is_an_error() {
    let err = Config::from_file(std::path::Path::new("does/not/exist.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
