//! Configuration management for kpiboard
//!
//! This module provides configuration structures and defaults for refresh
//! scheduling, toast notifications, the terminal UI and KPI export.

use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Global configuration for the dashboard
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Metrics refresh configuration
    pub refresh: RefreshConfig,
    /// Toast notification configuration
    pub notifications: NotificationConfig,
    /// UI configuration
    pub ui: UiConfig,
    /// KPI export configuration
    pub export: ExportConfig,
}

/// Configuration for metric refreshes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Background refresh interval in seconds, 0 disables it
    pub auto_refresh_secs: u64,
    /// Simulated latency of the mock metrics source in milliseconds
    pub simulated_latency_ms: u64,
    /// Probability that a mock refresh fails
    pub failure_rate: f64,
    /// Drop refresh results that are not from the latest request
    pub discard_stale: bool,
}

/// Configuration for toast notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Visibility of filter replaced/applied toasts in milliseconds
    pub filter_toast_ms: u64,
    /// Visibility of refresh toasts in milliseconds
    pub refresh_toast_ms: u64,
    /// Maximum number of toasts on screen
    pub max_visible: usize,
}

/// Configuration for the terminal interface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Input poll interval in milliseconds
    pub tick_rate_ms: u64,
    /// Number of KPI tiles per grid row
    pub tiles_per_row: usize,
}

/// Configuration for KPI downloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory KPI files are written to
    pub directory: PathBuf,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            auto_refresh_secs: 30,
            simulated_latency_ms: 1000,
            failure_rate: 0.0,
            discard_stale: false,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            filter_toast_ms: 3000,
            refresh_toast_ms: 2000,
            max_visible: 3,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 100,
            tiles_per_row: 4,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
        }
    }
}

impl RefreshConfig {
    /// Get auto refresh interval, `None` when disabled
    pub fn auto_refresh_interval(&self) -> Option<Duration> {
        (self.auto_refresh_secs > 0).then(|| Duration::from_secs(self.auto_refresh_secs))
    }

    /// Get simulated latency duration
    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }
}

impl NotificationConfig {
    pub fn filter_toast_duration(&self) -> Duration {
        Duration::from_millis(self.filter_toast_ms)
    }

    pub fn refresh_toast_duration(&self) -> Duration {
        Duration::from_millis(self.refresh_toast_ms)
    }
}

impl UiConfig {
    /// Get input poll duration
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }
}

/// Configuration loading and management
impl DashboardConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load from `path` if given, then apply environment overrides
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("KPIBOARD_AUTO_REFRESH_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                self.refresh.auto_refresh_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("KPIBOARD_LATENCY_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                self.refresh.simulated_latency_ms = ms;
            }
        }

        if let Ok(val) = std::env::var("KPIBOARD_DISCARD_STALE") {
            if let Ok(flag) = val.parse::<bool>() {
                self.refresh.discard_stale = flag;
            }
        }

        if let Ok(val) = std::env::var("KPIBOARD_EXPORT_DIR") {
            if !val.is_empty() {
                self.export.directory = PathBuf::from(val);
            }
        }

        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.refresh.failure_rate) {
            return Err(ConfigError::InvalidValue {
                field: "refresh.failure_rate",
                reason: "must be between 0.0 and 1.0".to_string(),
            });
        }

        if self.notifications.max_visible == 0 {
            return Err(ConfigError::InvalidValue {
                field: "notifications.max_visible",
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.ui.tick_rate_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ui.tick_rate_ms",
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.ui.tiles_per_row == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ui.tiles_per_row",
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}
