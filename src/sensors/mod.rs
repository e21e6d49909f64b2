//! Sensor channel model and live state store
//!
//! The module is split by concern: [`channel`] defines the closed channel
//! set and payload parsing, [`window`] the fixed-length chart buffer, and
//! [`store`] the shared live state that ties them together.

pub mod channel;
pub mod store;
pub mod window;

pub use channel::{ChannelKind, NumericClass, SENSOR_WILDCARD};
pub use store::{SensorSnapshot, SensorStore};
pub use window::SampleWindow;
