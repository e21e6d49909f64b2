//! MQTT implementation of the transport layer
//!
//! Split the way the rest of the crate splits pure logic from I/O:
//!
//! - [`connection`] - connection state, error taxonomy, option construction
//! - [`event`] - pure broker-event classification and consumer forwarding
//! - [`client`] - the rumqttc client and its polling task

pub mod client;
pub mod connection;
pub mod event;

pub use client::MqttLink;
pub use connection::{configure_mqtt_options, ConnectionState, MqttError};
pub use event::{route_broker_event, validate_subscription, EventForwarder, EventRoute};
