//! Transport layer for broker communication
//!
//! Provides the transport abstraction and the MQTT implementation. Lifecycle
//! notifications are typed event variants delivered over an mpsc channel to
//! one explicit consumer loop, rather than a bag of callbacks.

pub mod mqtt;

use tokio::sync::mpsc;

/// Lifecycle events a transport surfaces to its consumer.
///
/// Exactly four variants exist: connection established, message arrival,
/// transport failure, and connection teardown. Messages are delivered in
/// arrival order with no reordering or deduplication beyond what the
/// underlying transport provides.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Connected,
    Message { topic: String, payload: Vec<u8> },
    Error { cause: String },
    Closed,
}

/// Transport abstraction over broker connections.
///
/// Primarily implemented by [`mqtt::MqttLink`]; the trait exists so the hub
/// can be driven by a mock in tests.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Establish the connection. Resolves once the broker has acknowledged.
    async fn connect(&mut self) -> Result<(), Self::Error>;

    /// Tear the connection down.
    async fn disconnect(&mut self) -> Result<(), Self::Error>;

    /// Fire-and-forget publish to a topic.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), Self::Error>;

    /// Register interest in a topic pattern.
    async fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error>;

    fn is_connected(&self) -> bool;

    fn connection_state(&self) -> mqtt::ConnectionState;

    /// Install the channel that receives [`LinkEvent`]s. Must be called
    /// before `connect()` for events to be observed.
    fn set_event_sender(&mut self, sender: mpsc::Sender<LinkEvent>);
}

/// Type alias for the production transport.
pub type MqttTransport = mqtt::MqttLink;
