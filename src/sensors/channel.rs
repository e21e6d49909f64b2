//! The closed set of sensor channels and their topic bindings
//!
//! Exactly four channels exist, each bound to one fixed MQTT topic. The set
//! is known at compile time; no channel is ever created or destroyed at
//! runtime.

use std::fmt;

/// Wildcard subscription covering all four sensor topics.
pub const SENSOR_WILDCARD: &str = "sensor/#";

/// How a channel's payload text is interpreted once parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericClass {
    /// Full decimal precision (temperature, humidity)
    Float,
    /// Truncated toward zero (smoke ppm, raw ADC counts)
    Integer,
}

/// One of the four sensor channels.
///
/// The discriminant order matches the dashboard's fixed display slots:
/// 0 = temperature, 1 = humidity, 2 = smoke, 3 = ADC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Temperature,
    Humidity,
    Smoke,
    Adc,
}

impl ChannelKind {
    /// All channels in display-slot order.
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::Temperature,
        ChannelKind::Humidity,
        ChannelKind::Smoke,
        ChannelKind::Adc,
    ];

    /// Number of channels. Array-backed state is sized with this.
    pub const COUNT: usize = 4;

    /// Fixed MQTT topic for this channel. Case-sensitive, exact match only.
    pub fn topic(&self) -> &'static str {
        match self {
            ChannelKind::Temperature => "sensor/suhu",
            ChannelKind::Humidity => "sensor/kelembapan",
            ChannelKind::Smoke => "sensor/asap",
            ChannelKind::Adc => "sensor/api",
        }
    }

    /// Fixed display-slot index for this channel.
    pub fn index(&self) -> usize {
        match self {
            ChannelKind::Temperature => 0,
            ChannelKind::Humidity => 1,
            ChannelKind::Smoke => 2,
            ChannelKind::Adc => 3,
        }
    }

    /// Resolve an incoming topic to its channel, if it is one of the four
    /// recognized topics. Anything else is a non-match, not an error.
    pub fn from_topic(topic: &str) -> Option<ChannelKind> {
        ChannelKind::ALL.iter().copied().find(|k| k.topic() == topic)
    }

    pub fn numeric_class(&self) -> NumericClass {
        match self {
            ChannelKind::Temperature | ChannelKind::Humidity => NumericClass::Float,
            ChannelKind::Smoke | ChannelKind::Adc => NumericClass::Integer,
        }
    }

    /// Parse a payload string into this channel's value.
    ///
    /// Trims whitespace, requires the whole remainder to be a decimal
    /// number, and rejects non-finite results. Integer channels truncate
    /// toward zero. Returns `None` on any failure; callers discard silently.
    pub fn parse_payload(&self, payload: &str) -> Option<f64> {
        let value: f64 = payload.trim().parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        match self.numeric_class() {
            NumericClass::Float => Some(value),
            NumericClass::Integer => Some(value.trunc()),
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelKind::Temperature => "temperature",
            ChannelKind::Humidity => "humidity",
            ChannelKind::Smoke => "smoke",
            ChannelKind::Adc => "adc",
        };
        write!(f, "{name}")
    }
}
