//! Configuration file support for posemark.
//!
//! This module provides serialization and deserialization of application
//! settings, and the logging bootstrap driven by them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKEND_URL, DEFAULT_KEYPOINT_LABEL, HANDLE_HIT_RADIUS_PX, HISTORY_LIMIT,
    KEYPOINT_HIT_RADIUS_PX, MIN_BOX_SIZE_PX, SAVE_DEBOUNCE,
};
use crate::keybindings::KeyBindings;
use crate::persistence::{BackendResult, HttpBackend};

/// Verbosity of the `log` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    /// Includes per-move pointer logging
    Trace,
}

impl LogLevel {
    /// Every level, quietest first.
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Install `env_logger` at the given level.
///
/// `RUST_LOG` still overrides per-module filters. Calling this again only
/// changes the maximum level. Returns `true` if this call installed the
/// logger.
pub fn init_logging(level: LogLevel) -> bool {
    let installed = env_logger::Builder::new()
        .filter_level(level.to_level_filter())
        .parse_default_env()
        .format_timestamp_millis()
        .try_init()
        .is_ok();
    if !installed {
        log::set_max_level(level.to_level_filter());
    }
    log::debug!("Logging at level {}", level.name());
    installed
}

/// Format version written to new config files. Files with a higher
/// version are refused.
pub const CONFIG_VERSION: u32 = 1;

const APP_NAME: &str = "posemark";

/// Where annotations are loaded from and saved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// API root, e.g. `http://localhost:5000/api`
    pub base_url: String,
    /// Project whose images are being annotated
    pub project_id: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            project_id: String::new(),
        }
    }
}

/// Tuning of the interaction engine.
///
/// Pixel thresholds are in display pixels and are converted to natural
/// pixels at the current render scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Drawn boxes must exceed this width and height
    pub min_box_size_px: f64,
    /// Half-size of the corner handle hit square
    pub handle_hit_radius_px: f64,
    /// Keypoint hit radius
    pub keypoint_hit_radius_px: f64,
    /// Snapshots kept by undo history
    pub history_limit: usize,
    /// Quiet period before an auto-save, in milliseconds
    pub save_debounce_ms: u64,
    /// Whether edits are saved automatically
    pub auto_save: bool,
    /// Label given to new keypoints
    pub keypoint_label: String,
}

impl EditorSettings {
    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            min_box_size_px: MIN_BOX_SIZE_PX,
            handle_hit_radius_px: HANDLE_HIT_RADIUS_PX,
            keypoint_hit_radius_px: KEYPOINT_HIT_RADIUS_PX,
            history_limit: HISTORY_LIMIT,
            save_debounce_ms: u64::try_from(SAVE_DEBOUNCE.as_millis()).unwrap_or(1000),
            auto_save: true,
            keypoint_label: DEFAULT_KEYPOINT_LABEL.to_string(),
        }
    }
}

/// Persisted settings: backend location, editor tuning, logging and keys.
///
/// Every section falls back to its defaults when missing, so files written
/// by older versions keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub version: u32,

    #[serde(default = "app_name")]
    pub app_name: String,

    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub editor: EditorSettings,

    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub keybindings: KeyBindings,
}

fn app_name() -> String {
    APP_NAME.to_string()
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            app_name: app_name(),
            backend: BackendSettings::default(),
            editor: EditorSettings::default(),
            log_level: LogLevel::Info,
            keybindings: KeyBindings::default(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a config file, refusing versions newer than [`CONFIG_VERSION`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        match config.version {
            found if found > CONFIG_VERSION => Err(ConfigError::VersionTooNew {
                found,
                supported: CONFIG_VERSION,
            }),
            _ => Ok(config),
        }
    }

    /// Build the HTTP backend described by this configuration.
    pub fn http_backend(&self) -> BackendResult<HttpBackend> {
        HttpBackend::new(&self.backend.base_url, self.backend.project_id.clone())
    }

    pub fn default_filename() -> &'static str {
        "posemark-config.json"
    }

    /// `<config dir>/posemark/posemark-config.json`, with `~/.config` standing
    /// in where the platform has no config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .map(|dir| dir.join(APP_NAME).join(Self::default_filename()))
    }

    /// Load a config file. A missing, unreadable or invalid file gives
    /// `None` and a log line, never an error.
    pub fn load_from_path(path: &Path) -> Option<Self> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {:?}", path);
                return None;
            }
            Err(e) => {
                log::warn!("Cannot read config {:?}: {}", path, e);
                return None;
            }
        };
        match Self::from_json(&json) {
            Ok(config) => {
                log::info!("Config loaded from {:?}", path);
                Some(config)
            }
            Err(e) => {
                log::warn!("Ignoring config {:?}: {}", path, e);
                None
            }
        }
    }

    pub fn load_from_default_path() -> Option<Self> {
        Self::load_from_path(&Self::default_path()?)
    }

    /// Write the config as pretty JSON, creating missing directories.
    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Config saved to {:?}", path);
        Ok(())
    }

    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to_path(&path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config version {found} is newer than supported version {supported}")]
    VersionTooNew { found: u32, supported: u32 },

    #[error("config I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The platform reports neither a config nor a home directory.
    #[error("no config directory available")]
    NoConfigDir,
}
