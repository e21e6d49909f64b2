//! Mock implementations for testing
//!
//! Provides a mock [`Transport`] so the hub and any consumer of link events
//! can be exercised without a broker.

use crate::transport::mqtt::{ConnectionState, MqttError};
use crate::transport::{LinkEvent, Transport};
use async_trait::async_trait;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Injects [`LinkEvent`]s into whatever consumer the mock was wired to.
///
/// The sender only exists once `set_event_sender` has run (the hub does that
/// during construction), so `send` waits briefly for it to appear.
#[derive(Clone, Default)]
pub struct EventInjector {
    sender: Arc<StdMutex<Option<mpsc::Sender<LinkEvent>>>>,
}

impl EventInjector {
    /// Deliver one event to the consumer. Panics if no consumer is wired
    /// within the grace period; that is always a test-setup bug.
    pub async fn send(&self, event: LinkEvent) {
        for _ in 0..100 {
            let sender = self.sender.lock().expect("injector lock poisoned").clone();
            if let Some(sender) = sender {
                sender.send(event).await.expect("event consumer dropped");
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no event sender wired to mock transport");
    }
}

/// Mock transport: records publishes and subscriptions, lets tests inject
/// lifecycle events.
pub struct MockTransport {
    pub published: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    pub subscriptions: Arc<Mutex<Vec<String>>>,
    should_fail_connect: bool,
    state: ConnectionState,
    injector: EventInjector,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            published: Arc::new(Mutex::new(Vec::new())),
            subscriptions: Arc::new(Mutex::new(Vec::new())),
            should_fail_connect: false,
            state: ConnectionState::Disconnected,
            injector: EventInjector::default(),
        }
    }

    /// A mock whose `connect()` always fails.
    pub fn with_failing_connect() -> Self {
        Self {
            should_fail_connect: true,
            ..Self::new()
        }
    }

    /// Handle for injecting events after the mock has been moved into a hub.
    pub fn injector(&self) -> EventInjector {
        self.injector.clone()
    }

    /// Shared handle to the recorded subscriptions.
    pub fn subscriptions_handle(&self) -> Arc<Mutex<Vec<String>>> {
        self.subscriptions.clone()
    }

    /// Shared handle to the recorded publishes.
    pub fn published_handle(&self) -> Arc<Mutex<Vec<(String, Vec<u8>)>>> {
        self.published.clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Error = MqttError;

    async fn connect(&mut self) -> Result<(), Self::Error> {
        if self.should_fail_connect {
            return Err(MqttError::ConnectionFailed(
                "mock connection failure".to_string(),
            ));
        }
        self.state = ConnectionState::Connected;
        self.injector.send(LinkEvent::Connected).await;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.state = ConnectionState::Closed("mock disconnect".to_string());
        self.injector.send(LinkEvent::Closed).await;
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), Self::Error> {
        if !self.state.is_operational() {
            return Err(MqttError::NotConnected {
                state: self.state.clone(),
            });
        }
        self.published
            .lock()
            .await
            .push((topic.to_string(), payload));
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        self.subscriptions.lock().await.push(topic.to_string());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.is_operational()
    }

    fn connection_state(&self) -> ConnectionState {
        self.state.clone()
    }

    fn set_event_sender(&mut self, sender: mpsc::Sender<LinkEvent>) {
        *self
            .injector
            .sender
            .lock()
            .expect("injector lock poisoned") = Some(sender);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_publishes_when_connected() {
        let mut mock = MockTransport::new();
        let (tx, mut rx) = mpsc::channel(8);
        mock.set_event_sender(tx);

        mock.connect().await.unwrap();
        assert_eq!(rx.recv().await, Some(LinkEvent::Connected));
        assert!(mock.is_connected());

        mock.publish("sensor/suhu", b"27.5".to_vec()).await.unwrap();
        let published = mock.published.lock().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "sensor/suhu");
    }

    #[tokio::test]
    async fn test_mock_publish_fails_when_disconnected() {
        let mock = MockTransport::new();
        let result = mock.publish("sensor/suhu", b"1".to_vec()).await;
        assert!(matches!(result, Err(MqttError::NotConnected { .. })));
    }

    #[tokio::test]
    async fn test_failing_mock_rejects_connect() {
        let mut mock = MockTransport::with_failing_connect();
        assert!(mock.connect().await.is_err());
        assert!(!mock.is_connected());
    }
}
