//! Configuration for the navigation service.
//!
//! Layered configuration:
//! - Default values
//! - TOML file at `.auzoom/settings.toml` under the project root
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Variables are prefixed with `AUZOOM_` and use double underscores to
//! separate nested levels:
//! - `AUZOOM_SMALL_FILE_THRESHOLD=500` sets `small_file_threshold`
//! - `AUZOOM_WARMER__DISCOVERY_PRELOAD_LIMIT=20` sets
//!   `warmer.discovery_preload_limit`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Token-estimate threshold below which `read` returns raw content
    /// without parsing.
    #[serde(default = "default_small_file_threshold")]
    pub small_file_threshold: usize,

    /// Use the compact short-key format when the client does not ask for a
    /// format explicitly.
    #[serde(default = "default_false")]
    pub compact_format: bool,

    /// Honour the `fields` projection argument on `read`.
    #[serde(default = "default_false")]
    pub field_selection: bool,

    /// Warm entry points and discovered imports in the background at startup.
    #[serde(default = "default_true")]
    pub auto_warm: bool,

    /// Cache warmer tuning.
    #[serde(default)]
    pub warmer: WarmerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WarmerConfig {
    /// Maximum number of files scanned for a `__main__` guard during entry
    /// point discovery.
    #[serde(default = "default_scan_limit")]
    pub entry_point_scan_limit: usize,

    /// Maximum number of discovered-but-unparsed files preloaded after the
    /// entry point pass.
    #[serde(default = "default_preload_limit")]
    pub discovery_preload_limit: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default log level filter (`error`, `warn`, `info`, `debug`, `trace`).
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `warmer = "debug"`.
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_small_file_threshold() -> usize {
    300
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_scan_limit() -> usize {
    50
}
fn default_preload_limit() -> usize {
    10
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            small_file_threshold: default_small_file_threshold(),
            compact_format: false,
            field_selection: false,
            auto_warm: true,
            warmer: WarmerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WarmerConfig {
    fn default() -> Self {
        Self {
            entry_point_scan_limit: default_scan_limit(),
            discovery_preload_limit: default_preload_limit(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration for a project root, layering defaults, the
    /// project's settings file, and `AUZOOM_` environment variables.
    pub fn load(project_root: &Path) -> Result<Self, figment::Error> {
        let config_path = Self::config_path(project_root);

        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("AUZOOM_").map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
            .extract()
    }

    /// Path of the settings file under a project root.
    pub fn config_path(project_root: &Path) -> PathBuf {
        project_root.join(".auzoom").join("settings.toml")
    }

    /// Write the default settings file. Refuses to overwrite unless `force`.
    pub fn init_config_file(project_root: &Path, force: bool) -> Result<PathBuf, String> {
        let path = Self::config_path(project_root);
        if path.exists() && !force {
            return Err(format!(
                "Configuration file already exists at: {}",
                path.display()
            ));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Cannot create {}: {}", parent.display(), e))?;
        }

        let toml_string = toml::to_string_pretty(&Settings::default())
            .map_err(|e| format!("Cannot serialize defaults: {e}"))?;
        std::fs::write(&path, toml_string)
            .map_err(|e| format!("Cannot write {}: {}", path.display(), e))?;

        Ok(path)
    }
}
