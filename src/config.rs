use clap::ValueEnum;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::colorize::ColorTable;

pub const DEFAULT_INTERVAL_SECS: f64 = 1.0;

/// Config location relative to `$HOME`.
pub const DEFAULT_CONFIG_REL: &str = ".config/progress.yml";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub interval: Option<f64>,
    #[serde(default)]
    pub thread_name: Option<String>,
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    #[serde(default)]
    pub trace_lock: bool,
    #[serde(default)]
    pub format: ReportFormat,
    #[serde(default)]
    pub colors: Option<ColorTable>,
}

impl Config {
    pub fn interval_secs(&self) -> f64 {
        self.interval.unwrap_or(DEFAULT_INTERVAL_SECS)
    }

    pub fn color_table(&self) -> ColorTable {
        match &self.colors {
            Some(overrides) => ColorTable::with_overrides(overrides),
            None => ColorTable::default(),
        }
    }
}

#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    pub warnings: Vec<String>,
}

pub fn load_config(path: &Path) -> Result<LoadedConfig, String> {
    let content = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read config {}: {}", path.display(), err))?;
    load_config_from_str(&content, &path.display().to_string())
}

pub fn default_config_path() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| PathBuf::from(home).join(DEFAULT_CONFIG_REL))
}

/// An explicit path must exist; the default path is optional.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config, String> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(format!("Missing config file: {}", path.display()));
        }
        return Ok(load_config(path)?.config);
    }
    match default_config_path() {
        Some(path) if path.is_file() => Ok(load_config(&path)?.config),
        _ => Ok(Config::default()),
    }
}

pub fn load_config_from_str(content: &str, origin: &str) -> Result<LoadedConfig, String> {
    let value: Value = serde_yaml::from_str(content)
        .map_err(|err| format!("Failed to parse config {}: {}", origin, err))?;
    let mapping = match value {
        Value::Mapping(mapping) => mapping,
        Value::Null => Mapping::new(),
        _ => return Err(format!("Config {} must be a YAML mapping", origin)),
    };

    let warnings = unknown_top_level_keys(&mapping);
    emit_unknown_key_warnings(&warnings);

    let config: Config = serde_path_to_error::deserialize(Value::Mapping(mapping)).map_err(|err| {
        format!(
            "Failed to parse config {}: {}: {}",
            origin,
            err.path(),
            err.inner()
        )
    })?;
    validate_config(&config)?;

    Ok(LoadedConfig { config, warnings })
}

pub fn validate_config(config: &Config) -> Result<(), String> {
    if let Some(interval) = config.interval {
        validate_interval(interval).map_err(|message| format!("interval {}", message))?;
    }
    if let Some(name) = &config.thread_name {
        if name.trim().is_empty() {
            return Err("thread_name must not be empty".to_string());
        }
    }
    Ok(())
}

pub fn validate_interval(seconds: f64) -> Result<(), String> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(format!(
            "must be a positive number of seconds (got {})",
            seconds
        ));
    }
    Ok(())
}

fn emit_unknown_key_warnings(keys: &[String]) {
    for key in keys {
        eprintln!("Warning: unknown config key: {}", key);
    }
}

fn unknown_top_level_keys(mapping: &Mapping) -> Vec<String> {
    let allowed = [
        "interval",
        "thread_name",
        "log_path",
        "trace_lock",
        "format",
        "colors",
    ];

    mapping
        .keys()
        .filter_map(|key| key.as_str().map(|value| value.to_string()))
        .filter(|key| !allowed.contains(&key.as_str()))
        .collect()
}
