//! Configuration resolution and graceful degradation
//!
//! Tests that touch EPHYS_* environment variables are marked #[serial]
//! so they never race each other.

use std::env;
use std::path::PathBuf;

use ephys_common::config::{
    load_toml_config, resolve, CompiledDefaults, LoggingConfig, Overrides, TomlConfig,
    ENV_CACHE_DIR, ENV_CONFIG, ENV_DATA_DIR, ENV_WORKERS,
};
use serial_test::serial;
use tempfile::TempDir;

fn clear_env() {
    for name in [ENV_DATA_DIR, ENV_CACHE_DIR, ENV_WORKERS, ENV_CONFIG] {
        env::remove_var(name);
    }
}

/// Points the config lookup at a file that does not exist
fn isolated_overrides(temp: &TempDir) -> Overrides {
    Overrides {
        config_file: Some(temp.path().join("absent.toml")),
        ..Default::default()
    }
}

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();
    assert!(defaults.data_dir.ends_with("data"));
    assert!(defaults.cache_dir.ends_with("cache"));
    assert_eq!(defaults.log_level, "info");
}

#[test]
#[serial]
fn test_no_overrides_uses_defaults() {
    clear_env();
    let temp = TempDir::new().unwrap();
    let resolved = resolve(&isolated_overrides(&temp));
    let defaults = CompiledDefaults::for_current_platform();
    assert_eq!(resolved.data_dir, defaults.data_dir);
    assert_eq!(resolved.cache_dir, defaults.cache_dir);
    assert_eq!(resolved.workers, None);
    assert_eq!(resolved.log_level, "info");
}

#[test]
#[serial]
fn test_priority_cli_over_env_over_toml() {
    clear_env();
    let temp = TempDir::new().unwrap();
    let toml_path = temp.path().join("config.toml");
    std::fs::write(
        &toml_path,
        "data_dir = \"/toml/data\"\ncache_dir = \"/toml/cache\"\nworkers = 2\n\n[logging]\nlevel = \"debug\"\n",
    )
    .unwrap();

    let mut overrides = Overrides {
        config_file: Some(toml_path),
        ..Default::default()
    };

    let resolved = resolve(&overrides);
    assert_eq!(resolved.data_dir, PathBuf::from("/toml/data"));
    assert_eq!(resolved.cache_dir, PathBuf::from("/toml/cache"));
    assert_eq!(resolved.workers, Some(2));
    assert_eq!(resolved.log_level, "debug");

    env::set_var(ENV_DATA_DIR, "/env/data");
    env::set_var(ENV_WORKERS, "5");
    let resolved = resolve(&overrides);
    assert_eq!(resolved.data_dir, PathBuf::from("/env/data"));
    assert_eq!(resolved.cache_dir, PathBuf::from("/toml/cache"));
    assert_eq!(resolved.workers, Some(5));

    overrides.data_dir = Some(PathBuf::from("/cli/data"));
    overrides.workers = Some(7);
    let resolved = resolve(&overrides);
    assert_eq!(resolved.data_dir, PathBuf::from("/cli/data"));
    assert_eq!(resolved.workers, Some(7));

    clear_env();
}

#[test]
#[serial]
fn test_malformed_toml_falls_back_to_defaults() {
    clear_env();
    let temp = TempDir::new().unwrap();
    let toml_path = temp.path().join("config.toml");
    std::fs::write(&toml_path, "data_dir = [not toml").unwrap();

    let resolved = resolve(&Overrides {
        config_file: Some(toml_path),
        ..Default::default()
    });
    assert_eq!(
        resolved.data_dir,
        CompiledDefaults::for_current_platform().data_dir
    );
}

#[test]
#[serial]
fn test_bad_worker_env_is_ignored() {
    clear_env();
    let temp = TempDir::new().unwrap();
    env::set_var(ENV_WORKERS, "many");
    assert_eq!(resolve(&isolated_overrides(&temp)).workers, None);
    env::set_var(ENV_WORKERS, "0");
    assert_eq!(resolve(&isolated_overrides(&temp)).workers, None);
    clear_env();
}

#[test]
fn test_toml_logging_section_is_optional() {
    let temp = TempDir::new().unwrap();
    let toml_path = temp.path().join("config.toml");
    std::fs::write(&toml_path, "cache_dir = \"/srv/cache\"\n").unwrap();

    let config = load_toml_config(&toml_path).unwrap();
    assert_eq!(
        config,
        TomlConfig {
            data_dir: None,
            cache_dir: Some(PathBuf::from("/srv/cache")),
            workers: None,
            logging: LoggingConfig::default(),
        }
    );
}
