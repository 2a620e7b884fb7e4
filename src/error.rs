/*!
 * Error types for Switchover
 *
 * Channel faults never surface here: the manager turns them into status
 * transitions and log lines. These errors cover setup only (configuration,
 * logging, construction).
 */

use switchover_core_resilience::ResilienceError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SwitchoverError>;

#[derive(Debug, Error)]
pub enum SwitchoverError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error while reading or writing configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed TOML configuration
    #[error("Invalid TOML configuration: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Failed to serialize configuration: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Channel registry rejected its input
    #[error("Channel registry error: {0}")]
    Resilience(#[from] ResilienceError),

    /// Logging could not be initialized
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl SwitchoverError {
    /// Whether the error stems from user-supplied configuration
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SwitchoverError::Config(_)
                | SwitchoverError::TomlParse(_)
                | SwitchoverError::TomlSerialize(_)
        )
    }
}
