//! Top-level error type for hub operations

use thiserror::Error;

/// Main error type for sensor hub operations.
///
/// Discarded sensor messages (unknown topic, unparsable payload) are NOT
/// errors and never appear here; they degrade to a debug log and a metrics
/// tick by design of the routing contract.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Transport error: {0}")]
    Transport(#[from] crate::transport::mqtt::MqttError),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl HubError {
    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Result type for hub operations.
pub type HubResult<T> = Result<T, HubError>;
