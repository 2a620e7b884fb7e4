/*!
 * Configuration types for Switchover
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SwitchoverError};

/// Main configuration for a channel manager
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// active_watch_interval_ms = 2000
/// sweep_interval_ms = 15000
///
/// [logging]
/// level = "debug"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Liveness poll period for the active channel
    #[serde(default = "default_active_watch_interval_ms")]
    pub active_watch_interval_ms: u64,

    /// Recovery poll period for unavailable channels
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    /// Extra delay before dropping a failed active channel on a
    /// high-priority request (0 = disabled)
    #[serde(default)]
    pub high_priority_grace_ms: u64,

    /// Diagnostic output
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_active_watch_interval_ms() -> u64 {
    5_000
}

fn default_sweep_interval_ms() -> u64 {
    10_000
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            active_watch_interval_ms: default_active_watch_interval_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
            high_priority_grace_ms: 0,
            logging: LoggingConfig::default(),
        }
    }
}

impl ManagerConfig {
    /// Active-channel watch period
    pub fn active_watch_interval(&self) -> Duration {
        Duration::from_millis(self.active_watch_interval_ms)
    }

    /// Recovery sweep period
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Grace period for high-priority requests, if enabled
    pub fn high_priority_grace(&self) -> Option<Duration> {
        (self.high_priority_grace_ms > 0).then(|| Duration::from_millis(self.high_priority_grace_ms))
    }

    /// Validate the configuration
    ///
    /// Returns an error if either poll interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.active_watch_interval_ms == 0 {
            return Err(SwitchoverError::Config(
                "active_watch_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.sweep_interval_ms == 0 {
            return Err(SwitchoverError::Config(
                "sweep_interval_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: ManagerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level for diagnostic output
    #[serde(default)]
    pub level: LogLevel,

    /// Log file path (None = stdout)
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for level = debug)
    #[serde(default)]
    pub verbose: bool,
}

impl LoggingConfig {
    /// Level actually applied, taking `verbose` into account
    pub fn effective_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else {
            self.level.to_tracing_level()
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_values() {
        let config = ManagerConfig::default();

        assert_eq!(config.active_watch_interval(), Duration::from_secs(5));
        assert_eq!(config.sweep_interval(), Duration::from_secs(10));
        assert_eq!(config.high_priority_grace(), None);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ManagerConfig::from_toml_str(
            r#"
            sweep_interval_ms = 30000
            high_priority_grace_ms = 2000

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.active_watch_interval_ms, 5_000);
        assert_eq!(config.sweep_interval(), Duration::from_secs(30));
        assert_eq!(config.high_priority_grace(), Some(Duration::from_secs(2)));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.file, None);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = ManagerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ManagerConfig::default());
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let result = ManagerConfig::from_toml_str("active_watch_interval_ms = 0");
        assert!(matches!(result, Err(SwitchoverError::Config(_))));

        let config = ManagerConfig {
            sweep_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let result = ManagerConfig::from_toml_str("sweep_interval_ms = \"soon\"");
        assert!(matches!(result, Err(SwitchoverError::TomlParse(_))));
    }

    #[test]
    fn test_file_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let config = ManagerConfig {
            active_watch_interval_ms: 1_000,
            logging: LoggingConfig {
                level: LogLevel::Warn,
                file: Some(PathBuf::from("/var/log/switchover.json")),
                verbose: false,
            },
            ..Default::default()
        };

        config.to_file(file.path()).unwrap();
        let loaded = ManagerConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        let result = ManagerConfig::from_file(Path::new("/nonexistent/switchover.toml"));
        assert!(matches!(result, Err(SwitchoverError::Io(_))));
    }

    #[test]
    fn test_verbose_overrides_level() {
        let logging = LoggingConfig {
            level: LogLevel::Error,
            verbose: true,
            ..Default::default()
        };
        assert_eq!(logging.effective_level(), tracing::Level::DEBUG);

        let quiet = LoggingConfig {
            level: LogLevel::Error,
            ..Default::default()
        };
        assert_eq!(quiet.effective_level(), tracing::Level::ERROR);
    }
}
