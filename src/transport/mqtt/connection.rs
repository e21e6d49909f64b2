//! Pure connection state management for the MQTT link
//!
//! Connection state, error taxonomy, and option construction live here so
//! they can be tested without touching the network.

use crate::config::MqttSection;
use rumqttc::v5::MqttOptions;
use rumqttc::Transport as RumqttcTransport;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Connection state for the MQTT link.
///
/// Owned exclusively by the link; transitions are driven solely by transport
/// events. `Closed` and `Errored` are terminal: recovery requires a fresh
/// `connect()` on a new link.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    /// No connection attempt made yet
    Disconnected,
    /// Connection in flight, waiting for the broker acknowledgment
    Connecting,
    /// Ready for publish/subscribe
    Connected,
    /// Torn down, by us or by the broker
    Closed(String),
    /// Torn down by a transport failure
    Errored(String),
}

impl ConnectionState {
    /// Whether publish/subscribe operations are allowed in this state.
    pub fn is_operational(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// MQTT transport errors.
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Publishing failed")]
    PublishFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Subscription failed")]
    SubscriptionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Invalid broker URL: {0}")]
    InvalidBrokerUrl(String),
    #[error("Not connected - current state: {state:?}")]
    NotConnected { state: ConnectionState },
}

/// Build rumqttc options from the `[mqtt]` config section.
///
/// The client id gets a timestamp suffix so repeated connects from the same
/// hub never collide at the broker.
pub fn configure_mqtt_options(link_id: &str, config: &MqttSection) -> Result<MqttOptions, MqttError> {
    let url = Url::parse(&config.broker_url)
        .map_err(|_| MqttError::InvalidBrokerUrl(config.broker_url.clone()))?;

    let host = url
        .host_str()
        .ok_or_else(|| MqttError::InvalidBrokerUrl(config.broker_url.clone()))?;
    let port = url
        .port()
        .unwrap_or(if url.scheme() == "mqtts" { 8883 } else { 1883 });

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let client_id = format!("firewatch-{link_id}-{timestamp}");
    let mut mqtt_options = MqttOptions::new(client_id, host, port);

    // mqtts:// selects TLS with the platform trust roots
    if url.scheme() == "mqtts" {
        mqtt_options.set_transport(RumqttcTransport::tls_with_default_config());
    }

    // Credentials come from the environment, never from the config file
    if let Some(username_env) = &config.username_env {
        if let Ok(username) = std::env::var(username_env) {
            let password = config
                .password_env
                .as_ref()
                .and_then(|env_name| std::env::var(env_name).ok())
                .unwrap_or_default();
            mqtt_options.set_credentials(&username, &password);
        }
    }

    mqtt_options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));

    Ok(mqtt_options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_mqtt_section() -> MqttSection {
        MqttSection {
            broker_url: "mqtt://localhost:1883".to_string(),
            username_env: None,
            password_env: None,
            keep_alive_secs: 60,
            connect_timeout_secs: 30,
            auto_subscribe: true,
        }
    }

    #[test]
    fn test_configure_mqtt_options() {
        let config = test_mqtt_section();
        assert!(configure_mqtt_options("hub-1", &config).is_ok());
    }

    #[test]
    fn test_configure_tls_broker() {
        let mut config = test_mqtt_section();
        config.broker_url = "mqtts://broker.example:8883".to_string();
        assert!(configure_mqtt_options("hub-1", &config).is_ok());
    }

    #[test]
    fn test_invalid_broker_url() {
        let mut config = test_mqtt_section();
        config.broker_url = "not-a-url".to_string();
        let result = configure_mqtt_options("hub-1", &config);
        assert!(matches!(result, Err(MqttError::InvalidBrokerUrl(_))));
    }

    #[test]
    fn test_default_port_by_scheme() {
        // No explicit port: mqtt defaults to 1883, mqtts to 8883. Both must
        // at least produce valid options.
        let mut config = test_mqtt_section();
        config.broker_url = "mqtt://localhost".to_string();
        assert!(configure_mqtt_options("hub-1", &config).is_ok());

        config.broker_url = "mqtts://localhost".to_string();
        assert!(configure_mqtt_options("hub-1", &config).is_ok());
    }

    #[test]
    fn test_state_operational_gate() {
        assert!(ConnectionState::Connected.is_operational());
        assert!(!ConnectionState::Disconnected.is_operational());
        assert!(!ConnectionState::Connecting.is_operational());
        assert!(!ConnectionState::Closed("bye".to_string()).is_operational());
        assert!(!ConnectionState::Errored("io".to_string()).is_operational());
    }

    #[test]
    fn test_mqtt_error_display() {
        let errors = vec![
            MqttError::ConnectionFailed("refused".to_string()),
            MqttError::PublishFailed("boom".to_string().into()),
            MqttError::SubscriptionFailed("boom".to_string().into()),
            MqttError::InvalidBrokerUrl("x".to_string()),
            MqttError::NotConnected {
                state: ConnectionState::Connecting,
            },
        ];
        for error in errors {
            assert!(!error.to_string().is_empty());
        }
    }
}
