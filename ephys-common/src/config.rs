//! Configuration loading and directory resolution
//!
//! Every setting is resolved in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file never aborts startup; it is logged and
//! the compiled defaults apply.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Directory name used under the platform config/data folders
pub const APP_DIR: &str = "ephys-atlas";

pub const ENV_DATA_DIR: &str = "EPHYS_DATA_DIR";
pub const ENV_CACHE_DIR: &str = "EPHYS_CACHE_DIR";
pub const ENV_WORKERS: &str = "EPHYS_WORKERS";
pub const ENV_CONFIG: &str = "EPHYS_CONFIG";

/// Compiled fallback values for the current platform
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDefaults {
    pub data_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let base = dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("./ephys_data"));
        Self {
            data_dir: base.join("data"),
            cache_dir: base.join("cache"),
            log_level: "info".to_string(),
        }
    }
}

/// Logging section of the TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub data_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub workers: Option<usize>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Default config file location (`<config_dir>/ephys-atlas/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub workers: Option<usize>,
    pub config_file: Option<PathBuf>,
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub data_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// `None` lets the caller pick its own default
    pub workers: Option<usize>,
    pub log_level: String,
}

/// Resolve settings from overrides, environment, TOML and compiled defaults
pub fn resolve(overrides: &Overrides) -> ResolvedConfig {
    let toml_config = load_optional_toml(overrides);
    let defaults = CompiledDefaults::for_current_platform();

    let data_dir = overrides
        .data_dir
        .clone()
        .or_else(|| env_path(ENV_DATA_DIR))
        .or_else(|| toml_config.data_dir.clone())
        .unwrap_or(defaults.data_dir);

    let cache_dir = overrides
        .cache_dir
        .clone()
        .or_else(|| env_path(ENV_CACHE_DIR))
        .or_else(|| toml_config.cache_dir.clone())
        .unwrap_or(defaults.cache_dir);

    let workers = overrides
        .workers
        .or_else(|| match env_workers() {
            Ok(workers) => workers,
            Err(e) => {
                warn!("{}", e);
                None
            }
        })
        .or(toml_config.workers)
        .filter(|&w| w > 0);

    ResolvedConfig {
        data_dir,
        cache_dir,
        workers,
        log_level: toml_config.logging.level,
    }
}

fn load_optional_toml(overrides: &Overrides) -> TomlConfig {
    let explicit = overrides
        .config_file
        .clone()
        .or_else(|| env_path(ENV_CONFIG));
    let Some(path) = explicit.or_else(default_config_path) else {
        return TomlConfig::default();
    };
    if !path.exists() {
        debug!("No config file at {}", path.display());
        return TomlConfig::default();
    }
    match load_toml_config(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!("Ignoring config file {}: {}", path.display(), e);
            TomlConfig::default()
        }
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn env_workers() -> Result<Option<usize>> {
    match std::env::var(ENV_WORKERS) {
        Ok(value) => value
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|e| Error::Config(format!("{ENV_WORKERS}={value}: {e}"))),
        Err(_) => Ok(None),
    }
}
