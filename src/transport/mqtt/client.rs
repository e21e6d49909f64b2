//! Impure I/O coordination for the MQTT link
//!
//! Owns the rumqttc client and its polling task. All network effects live
//! here; state transitions and event classification are delegated to the
//! pure siblings in this module.

use super::connection::{configure_mqtt_options, ConnectionState, MqttError};
use super::event::{route_broker_event, validate_subscription, EventForwarder, EventRoute};
use crate::config::MqttSection;
use crate::observability::metrics::metrics;
use crate::sensors::channel::SENSOR_WILDCARD;
use crate::transport::{LinkEvent, Transport};
use rumqttc::v5::{mqttbytes::QoS, AsyncClient, EventLoop};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// MQTT transport link for the sensor hub.
///
/// One link covers one connection lifetime. After a transport error or a
/// broker disconnect the link is terminal; recovery is a fresh link and a
/// new `connect()` call, deliberately left to the caller.
pub struct MqttLink {
    link_id: String,
    config: MqttSection,
    client: Arc<Mutex<AsyncClient>>,
    event_loop: Mutex<Option<EventLoop>>,
    event_loop_handle: Option<JoinHandle<()>>,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
    shutdown_tx: Option<watch::Sender<bool>>,
    event_sender: Option<mpsc::Sender<LinkEvent>>,
    subscriptions: Vec<String>,
}

impl MqttLink {
    pub fn new(link_id: &str, config: MqttSection) -> Result<Self, MqttError> {
        let mqtt_options = configure_mqtt_options(link_id, &config)?;
        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        Ok(MqttLink {
            link_id: link_id.to_string(),
            config,
            client: Arc::new(Mutex::new(client)),
            event_loop: Mutex::new(Some(event_loop)),
            event_loop_handle: None,
            state_tx,
            state_rx,
            shutdown_tx: None,
            event_sender: None,
            subscriptions: Vec::new(),
        })
    }

    /// Block until the link reaches `Connected`, or fail on teardown/timeout.
    async fn wait_for_ready(
        mut state_rx: watch::Receiver<ConnectionState>,
        timeout: Duration,
    ) -> Result<(), MqttError> {
        let waited = tokio::time::timeout(timeout, async {
            loop {
                match &*state_rx.borrow() {
                    ConnectionState::Connected => return Ok(()),
                    ConnectionState::Closed(reason) | ConnectionState::Errored(reason) => {
                        return Err(MqttError::ConnectionFailed(reason.clone()));
                    }
                    ConnectionState::Disconnected | ConnectionState::Connecting => {}
                }
                if state_rx.changed().await.is_err() {
                    return Err(MqttError::ConnectionFailed("state channel closed".to_string()));
                }
            }
        })
        .await;

        match waited {
            Ok(result) => result,
            Err(_) => Err(MqttError::ConnectionFailed(
                "no broker acknowledgment before timeout".to_string(),
            )),
        }
    }

    fn check_operational(&self) -> Result<(), MqttError> {
        let state = self.state_rx.borrow().clone();
        if !state.is_operational() {
            return Err(MqttError::NotConnected { state });
        }
        Ok(())
    }

    /// Establish the connection and start the polling task.
    ///
    /// Resolves only once the broker has acknowledged (ConnAck), not on the
    /// first event of any kind. A connection failure surfaces both here and
    /// as a single `LinkEvent::Error` followed by `LinkEvent::Closed`.
    pub async fn connect(&mut self) -> Result<(), MqttError> {
        let mut event_loop = self
            .event_loop
            .lock()
            .await
            .take()
            .ok_or_else(|| MqttError::ConnectionFailed("event loop already started".to_string()))?;

        metrics().record_connection_attempt();
        let _ = self.state_tx.send(ConnectionState::Connecting);

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        self.shutdown_tx = Some(shutdown_tx);

        let mut forwarder = EventForwarder::new();
        if let Some(sender) = &self.event_sender {
            forwarder.set_sender(sender.clone());
        }

        let link_id = self.link_id.clone();
        let state_tx = self.state_tx.clone();
        let shared_client = self.client.clone();
        let auto_subscribe = self.config.auto_subscribe;

        let handle = tokio::spawn(async move {
            info!(link_id = %link_id, "starting MQTT event loop");
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            let _ = state_tx.send(ConnectionState::Closed("link disconnected".to_string()));
                            forwarder.forward(LinkEvent::Closed).await;
                            break;
                        }
                    }

                    polled = event_loop.poll() => match polled {
                        Ok(event) => match route_broker_event(&event) {
                            EventRoute::ConnectionAcknowledged => {
                                info!(link_id = %link_id, "MQTT connection established");
                                let _ = state_tx.send(ConnectionState::Connected);
                                forwarder.forward(LinkEvent::Connected).await;
                                if auto_subscribe {
                                    let client = shared_client.lock().await;
                                    match client.subscribe(SENSOR_WILDCARD, QoS::AtMostOnce).await {
                                        Ok(()) => debug!(topic = SENSOR_WILDCARD, "auto-subscribed"),
                                        Err(e) => error!(error = %e, "wildcard auto-subscribe failed"),
                                    }
                                }
                            }
                            EventRoute::MessageReceived { topic, payload, retain } => {
                                debug!(target: "mqtt_transport", %topic, retain, "message received");
                                forwarder.forward(LinkEvent::Message { topic, payload }).await;
                            }
                            EventRoute::Disconnected => {
                                info!(link_id = %link_id, "broker closed the connection");
                                let _ = state_tx.send(ConnectionState::Closed("broker disconnect".to_string()));
                                forwarder.forward(LinkEvent::Closed).await;
                                break;
                            }
                            EventRoute::SubscriptionConfirmed { return_codes } => {
                                match validate_subscription(&return_codes) {
                                    Ok(()) => debug!(target: "mqtt_transport", "subscription confirmed"),
                                    Err(reason) => warn!(target: "mqtt_transport", %reason, "subscription rejected"),
                                }
                            }
                            EventRoute::Infrastructure(event) => {
                                debug!(target: "mqtt_transport", event, "MQTT event");
                            }
                            EventRoute::Outgoing => {}
                        },
                        Err(e) => {
                            // One error report, then teardown. No retry here:
                            // reconnection is an explicit new connect() by the
                            // caller.
                            error!(link_id = %link_id, error = %e, "MQTT transport error, closing link");
                            metrics().record_connection_failure();
                            let cause = e.to_string();
                            let _ = state_tx.send(ConnectionState::Errored(cause.clone()));
                            forwarder.forward(LinkEvent::Error { cause }).await;
                            forwarder.forward(LinkEvent::Closed).await;
                            break;
                        }
                    }
                }
            }
            info!(link_id = %link_id, "MQTT event loop stopped");
        });

        self.event_loop_handle = Some(handle);

        let timeout = Duration::from_secs(self.config.connect_timeout_secs);
        match Self::wait_for_ready(self.state_rx.clone(), timeout).await {
            Ok(()) => {
                metrics().record_connection_established();
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Tear the connection down and join the polling task.
    pub async fn disconnect(&mut self) -> Result<(), MqttError> {
        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(true);
        }

        {
            let client = self.client.lock().await;
            // Best effort: the broker may already be gone.
            let _ = client.disconnect().await;
        }

        let _ = self
            .state_tx
            .send(ConnectionState::Closed("link disconnected".to_string()));

        if let Some(handle) = self.event_loop_handle.take() {
            match tokio::time::timeout(Duration::from_secs(2), handle).await {
                Ok(Ok(())) => info!(link_id = %self.link_id, "event loop shut down gracefully"),
                Ok(Err(e)) if !e.is_cancelled() => {
                    warn!(link_id = %self.link_id, error = %e, "event loop task ended with error");
                }
                Err(_) => {
                    warn!(link_id = %self.link_id, "event loop did not stop in time, aborting");
                }
                _ => {}
            }
        }

        info!(link_id = %self.link_id, "MQTT link disconnected");
        Ok(())
    }

    /// Fire-and-forget publish. QoS 0, not retained.
    pub async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), MqttError> {
        self.check_operational()?;

        let client = self.client.lock().await;
        client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await
            .map_err(|e| MqttError::PublishFailed(Box::new(e)))?;
        Ok(())
    }

    /// Subscribe to a topic pattern. Tracked for introspection.
    pub async fn subscribe(&mut self, topic: &str) -> Result<(), MqttError> {
        self.check_operational()?;

        let client = self.client.lock().await;
        client
            .subscribe(topic, QoS::AtMostOnce)
            .await
            .map_err(|e| MqttError::SubscriptionFailed(Box::new(e)))?;
        drop(client);

        if !self.subscriptions.iter().any(|t| t == topic) {
            self.subscriptions.push(topic.to_string());
        }
        debug!(link_id = %self.link_id, topic, "subscribed");
        Ok(())
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state().is_operational()
    }

    /// Topics explicitly subscribed through [`subscribe`](Self::subscribe).
    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }
}

#[async_trait::async_trait]
impl Transport for MqttLink {
    type Error = MqttError;

    async fn connect(&mut self) -> Result<(), Self::Error> {
        MqttLink::connect(self).await
    }

    async fn disconnect(&mut self) -> Result<(), Self::Error> {
        MqttLink::disconnect(self).await
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), Self::Error> {
        MqttLink::publish(self, topic, payload).await
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        MqttLink::subscribe(self, topic).await
    }

    fn is_connected(&self) -> bool {
        MqttLink::is_connected(self)
    }

    fn connection_state(&self) -> ConnectionState {
        MqttLink::connection_state(self)
    }

    fn set_event_sender(&mut self, sender: mpsc::Sender<LinkEvent>) {
        self.event_sender = Some(sender);
    }
}

impl Drop for MqttLink {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(true);
        }
        if let Some(handle) = self.event_loop_handle.take() {
            handle.abort();
        }
    }
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
    fn test_link_creation_starts_disconnected() {
        let link = MqttLink::new("test-hub", test_mqtt_section()).unwrap();
        assert_eq!(link.connection_state(), ConnectionState::Disconnected);
        assert!(!link.is_connected());
        assert!(link.subscriptions().is_empty());
    }

    #[test]
    fn test_link_creation_rejects_bad_url() {
        let mut config = test_mqtt_section();
        config.broker_url = "nonsense".to_string();
        assert!(matches!(
            MqttLink::new("test-hub", config),
            Err(MqttError::InvalidBrokerUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_fails_when_not_connected() {
        let link = MqttLink::new("test-hub", test_mqtt_section()).unwrap();
        let result = link.publish("sensor/suhu", b"27.5".to_vec()).await;
        assert!(matches!(result, Err(MqttError::NotConnected { .. })));
    }

    #[tokio::test]
    async fn test_subscribe_fails_when_not_connected() {
        let mut link = MqttLink::new("test-hub", test_mqtt_section()).unwrap();
        let result = link.subscribe("sensor/#").await;
        assert!(matches!(result, Err(MqttError::NotConnected { .. })));
        assert!(link.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_without_connect_is_ok() {
        let mut link = MqttLink::new("test-hub", test_mqtt_section()).unwrap();
        assert!(link.disconnect().await.is_ok());
        assert!(matches!(
            link.connection_state(),
            ConnectionState::Closed(_)
        ));
    }

    #[tokio::test]
    async fn test_wait_for_ready_resolves_on_connected() {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = state_tx.send(ConnectionState::Connected);
        });

        let result = MqttLink::wait_for_ready(state_rx, Duration::from_millis(200)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_wait_for_ready_fails_on_errored() {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = state_tx.send(ConnectionState::Errored("connection refused".to_string()));
        });

        let result = MqttLink::wait_for_ready(state_rx, Duration::from_millis(200)).await;
        match result {
            Err(MqttError::ConnectionFailed(reason)) => {
                assert!(reason.contains("connection refused"));
            }
            other => panic!("expected ConnectionFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wait_for_ready_times_out() {
        // Keep the sender alive so the channel never closes.
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let _keep = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            drop(state_tx);
        });

        let result = MqttLink::wait_for_ready(state_rx, Duration::from_millis(20)).await;
        match result {
            Err(MqttError::ConnectionFailed(reason)) => {
                assert!(reason.contains("timeout"), "got: {reason}");
            }
            other => panic!("expected ConnectionFailed, got {other:?}"),
        }
    }
}
