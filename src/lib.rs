//! Firewatch - MQTT sensor hub
//!
//! Backend core of a fire-monitoring dashboard. The hub subscribes to four
//! fixed sensor topics, keeps one live value cell and one fixed-length chart
//! window per channel, and derives a qualitative hazard status through a
//! pluggable classifier.
//!
//! # Overview
//!
//! - MQTT transport link with typed lifecycle events
//! - Topic router with silent-discard semantics for foreign or malformed
//!   messages
//! - Shared sensor state store (injected, never a global)
//! - Classifier strategy seam with a closed status enumeration
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use firewatch::classifier::PendingClassifier;
//! use firewatch::config::HubConfig;
//! use firewatch::hub::SensorHub;
//! use firewatch::transport::MqttTransport;
//!
//! # tokio_test::block_on(async {
//! let config = HubConfig::load_from_file("firewatch.toml".as_ref())?;
//! let link = MqttTransport::new(&config.hub.id, config.mqtt.clone())?;
//! let mut hub = SensorHub::new(&config, link, Box::new(PendingClassifier));
//! hub.run().await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod classifier;
pub mod config;
pub mod error;
pub mod hub;
pub mod observability;
pub mod router;
pub mod sensors;
pub mod testing;
pub mod transport;

pub use classifier::{Classification, Classifier, HazardStatus, PendingClassifier, StatusCell};
pub use config::HubConfig;
pub use error::{HubError, HubResult};
pub use hub::SensorHub;
pub use router::{decode_reading, ChartHook, RouteOutcome, SensorRouter};
pub use sensors::{ChannelKind, SampleWindow, SensorSnapshot, SensorStore};
pub use transport::{mqtt::MqttLink, LinkEvent, Transport};
