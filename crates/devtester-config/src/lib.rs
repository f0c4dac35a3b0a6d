//! Configuration for the devtester CLI.
//!
//! One TOML file layered under `DEVTESTER_*` environment overrides, and
//! translation into the runtime settings `devtester-core` and
//! `devtester-services` take. Neither library reads configuration itself.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use devtester_core::OrchestratorConfig;
use devtester_services::JsonDataProviderConfig;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: Storage,

    #[serde(default)]
    pub data: Data,

    #[serde(default)]
    pub timing: Timing,

    #[serde(default)]
    pub defaults: Defaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Storage {
    /// JSON file holding the device list.
    #[serde(default = "default_devices_file")]
    pub devices_file: PathBuf,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            devices_file: default_devices_file(),
        }
    }
}

/// Payload sources for the file-backed data provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Data {
    #[serde(default = "default_static_file")]
    pub static_file: PathBuf,

    #[serde(default = "default_dynamic_file")]
    pub dynamic_file: PathBuf,

    /// Files cycled by live updates, in order.
    #[serde(default = "default_dynamic_files")]
    pub dynamic_files: Vec<PathBuf>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for Data {
    fn default() -> Self {
        Self {
            static_file: default_static_file(),
            dynamic_file: default_dynamic_file(),
            dynamic_files: default_dynamic_files(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Simulated latencies, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Timing {
    #[serde(default = "default_authenticate_ms")]
    pub authenticate_ms: u64,

    #[serde(default = "default_authenticate_all_ms")]
    pub authenticate_all_ms: u64,

    #[serde(default = "default_static_fetch_ms")]
    pub static_fetch_ms: u64,

    #[serde(default = "default_dynamic_fetch_ms")]
    pub dynamic_fetch_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            authenticate_ms: default_authenticate_ms(),
            authenticate_all_ms: default_authenticate_all_ms(),
            static_fetch_ms: default_static_fetch_ms(),
            dynamic_fetch_ms: default_dynamic_fetch_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_devices_file() -> PathBuf {
    dummy_data_dir().join("devices.json")
}
fn default_static_file() -> PathBuf {
    dummy_data_dir().join("StaticData.json")
}
fn default_dynamic_file() -> PathBuf {
    dummy_data_dir().join("DynamicData1.json")
}
fn default_dynamic_files() -> Vec<PathBuf> {
    let dir = dummy_data_dir();
    [2, 3, 4, 5, 1]
        .iter()
        .map(|n| dir.join(format!("DynamicData{n}.json")))
        .collect()
}
fn default_poll_interval_ms() -> u64 {
    2000
}
fn default_authenticate_ms() -> u64 {
    500
}
fn default_authenticate_all_ms() -> u64 {
    2000
}
fn default_static_fetch_ms() -> u64 {
    2000
}
fn default_dynamic_fetch_ms() -> u64 {
    1000
}
fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

// ── Runtime translation ─────────────────────────────────────────────

impl Config {
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            authenticate_delay: Duration::from_millis(self.timing.authenticate_ms),
            authenticate_all_delay: Duration::from_millis(self.timing.authenticate_all_ms),
            static_fetch_delay: Duration::from_millis(self.timing.static_fetch_ms),
            dynamic_fetch_delay: Duration::from_millis(self.timing.dynamic_fetch_ms),
        }
    }

    /// Provider settings, rejecting values the provider cannot run with.
    pub fn provider_config(&self) -> Result<JsonDataProviderConfig, ConfigError> {
        if self.data.dynamic_files.is_empty() {
            return Err(ConfigError::Validation {
                field: "data.dynamic_files".into(),
                reason: "at least one file is required".into(),
            });
        }
        if self.data.poll_interval_ms == 0 {
            return Err(ConfigError::Validation {
                field: "data.poll_interval_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        Ok(JsonDataProviderConfig {
            static_file: self.data.static_file.clone(),
            dynamic_file: self.data.dynamic_file.clone(),
            dynamic_files: self.data.dynamic_files.clone(),
            interval: Duration::from_millis(self.data.poll_interval_ms),
        })
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "devtester", "devtester")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Platform data directory; payload and device files default under it.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".local/share"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

fn dummy_data_dir() -> PathBuf {
    data_dir().join("DummyData")
}

fn home_fallback(sub: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(sub);
    p.push("devtester");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the default file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file + environment. A missing file only
/// contributes nothing.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("DEVTESTER_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, falling back to defaults on any error.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}
