//! TOML configuration for the sensor hub
//!
//! Credentials never live in the file: the `[mqtt]` section names
//! environment VARIABLES, and values are resolved at connect time.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Top-level hub configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HubConfig {
    pub hub: HubSection,
    pub mqtt: MqttSection,
    #[serde(default)]
    pub channels: ChannelsSection,
}

/// Identity of this hub instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HubSection {
    /// Hub identifier (must match [a-zA-Z0-9._-]+); part of the MQTT
    /// client id.
    pub id: String,
    /// Human description of the deployment
    #[serde(default)]
    pub description: String,
}

/// Broker connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MqttSection {
    /// Broker URL with scheme, host, and optional port
    /// (mqtt:// or mqtts://)
    pub broker_url: String,
    /// Environment variable containing the username
    pub username_env: Option<String>,
    /// Environment variable containing the password
    pub password_env: Option<String>,
    /// Keep-alive interval in seconds (default: 60)
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// How long to wait for the broker acknowledgment (default: 30)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Subscribe to the `sensor/#` wildcard automatically once connected
    /// (default: true). When false, the hub subscribes to the four channel
    /// topics individually.
    #[serde(default = "default_auto_subscribe")]
    pub auto_subscribe: bool,
}

fn default_keep_alive_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_auto_subscribe() -> bool {
    true
}

/// Channel state settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelsSection {
    /// Samples held per chart window (default: 20, must be > 0)
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
}

fn default_window_capacity() -> usize {
    20
}

impl Default for ChannelsSection {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid hub ID format: {0}")]
    InvalidHubId(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl HubConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: HubConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Structural validation beyond what serde enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_hub_id(&self.hub.id)?;
        if self.channels.window_capacity == 0 {
            return Err(ConfigError::InvalidConfig(
                "channels.window_capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// MQTT username resolved from the environment, if configured.
    pub fn mqtt_username(&self) -> Option<String> {
        resolve_env(self.mqtt.username_env.as_ref())
    }

    /// MQTT password resolved from the environment, if configured.
    pub fn mqtt_password(&self) -> Option<String> {
        resolve_env(self.mqtt.password_env.as_ref())
    }

    /// Configuration used by unit tests.
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[hub]
id = "test-hub"
description = "A test hub"

[mqtt]
broker_url = "mqtt://localhost:1883"
"#;
        toml::from_str(toml_content).expect("test config should parse")
    }
}

fn resolve_env(env_var_name: Option<&String>) -> Option<String> {
    env_var_name.and_then(|name| std::env::var(name).ok())
}

/// Hub IDs feed the MQTT client id, so the character set is restricted.
fn validate_hub_id(hub_id: &str) -> Result<(), ConfigError> {
    let valid_chars = hub_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if hub_id.is_empty() || !valid_chars {
        return Err(ConfigError::InvalidHubId(format!(
            "Hub ID '{hub_id}' must match pattern [a-zA-Z0-9._-]+"
        )));
    }

    Ok(())
}
