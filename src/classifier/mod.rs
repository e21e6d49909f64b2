//! Hazard status derivation from current sensor state
//!
//! The classification RULE is an extension point, not a shipped feature: the
//! inference logic (membership functions, thresholds, defuzzification) is
//! intentionally absent. What is fixed is the contract around it: the
//! closed output enumeration, the bounded level range, and the display color
//! mapping the dashboard stub established.
//!
//! Implement [`Classifier`] to plug a real rule in; [`PendingClassifier`]
//! is the shipped default and always reports `Waiting`.

pub use crate::sensors::SensorSnapshot;
use serde::Serialize;
use std::fmt;
use tokio::sync::watch;

/// Upper bound of the fuzzy level range.
pub const LEVEL_MAX: f64 = 100.0;

/// Qualitative hazard status. Closed set; no other outputs exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardStatus {
    /// No classification available yet
    Waiting,
    Safe,
    Alert,
    Danger,
}

/// Display color for a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusColor {
    Gray,
    Green,
    Yellow,
    Red,
}

impl HazardStatus {
    /// Badge color for this status, as the dashboard renders it.
    pub fn color(&self) -> StatusColor {
        match self {
            HazardStatus::Waiting => StatusColor::Gray,
            HazardStatus::Safe => StatusColor::Green,
            HazardStatus::Alert => StatusColor::Yellow,
            HazardStatus::Danger => StatusColor::Red,
        }
    }
}

impl fmt::Display for HazardStatus {
    /// The dashboard's wire labels.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HazardStatus::Waiting => "MENUNGGU",
            HazardStatus::Safe => "AMAN",
            HazardStatus::Alert => "WASPADA",
            HazardStatus::Danger => "BAHAYA",
        };
        write!(f, "{label}")
    }
}

/// A status plus its numeric fuzzy level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub status: HazardStatus,
    /// Fuzzy level, clamped into `0.0..=LEVEL_MAX`.
    pub level: f64,
}

impl Classification {
    pub fn new(status: HazardStatus, level: f64) -> Self {
        Self {
            status,
            level: level.clamp(0.0, LEVEL_MAX),
        }
    }

    /// Initial state before any evaluation has run.
    pub fn waiting() -> Self {
        Self::new(HazardStatus::Waiting, 0.0)
    }
}

impl Default for Classification {
    fn default() -> Self {
        Self::waiting()
    }
}

/// Strategy deriving a [`Classification`] from current sensor values.
///
/// Invoked synchronously by the router once per accepted message. The
/// snapshot is the only input; implementations must not hold hidden state
/// that makes the output depend on message history.
pub trait Classifier: Send + Sync {
    fn classify(&self, snapshot: &SensorSnapshot) -> Classification;
}

/// Default strategy: no rule is configured, so every evaluation reports
/// `Waiting` at level 0. Stands in until a real inference rule is plugged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PendingClassifier;

impl Classifier for PendingClassifier {
    fn classify(&self, _snapshot: &SensorSnapshot) -> Classification {
        Classification::waiting()
    }
}

/// Shared observable classification.
///
/// One writer (the router), any number of subscribers. Built on a `watch`
/// channel so consumers can either poll the latest value or await changes.
/// Constructed explicitly and injected, never a module-level singleton.
#[derive(Debug, Clone)]
pub struct StatusCell {
    tx: std::sync::Arc<watch::Sender<Classification>>,
}

impl StatusCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Classification::waiting());
        Self {
            tx: std::sync::Arc::new(tx),
        }
    }

    /// Publish a new classification to all subscribers.
    pub fn publish(&self, classification: Classification) {
        // send_replace never fails; the cell keeps its own receiver alive
        // through the sender.
        self.tx.send_replace(classification);
    }

    /// Latest published classification.
    pub fn current(&self) -> Classification {
        *self.tx.borrow()
    }

    /// Subscribe for change notifications.
    pub fn subscribe(&self) -> watch::Receiver<Classification> {
        self.tx.subscribe()
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot() -> SensorSnapshot {
        SensorSnapshot {
            temperature: 27.5,
            humidity: 61.0,
            smoke: 120.0,
            adc: 512.0,
            taken_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_colors() {
        assert_eq!(HazardStatus::Waiting.color(), StatusColor::Gray);
        assert_eq!(HazardStatus::Safe.color(), StatusColor::Green);
        assert_eq!(HazardStatus::Alert.color(), StatusColor::Yellow);
        assert_eq!(HazardStatus::Danger.color(), StatusColor::Red);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(HazardStatus::Waiting.to_string(), "MENUNGGU");
        assert_eq!(HazardStatus::Safe.to_string(), "AMAN");
        assert_eq!(HazardStatus::Alert.to_string(), "WASPADA");
        assert_eq!(HazardStatus::Danger.to_string(), "BAHAYA");
    }

    #[test]
    fn test_classification_level_is_clamped() {
        assert_eq!(Classification::new(HazardStatus::Safe, -5.0).level, 0.0);
        assert_eq!(Classification::new(HazardStatus::Safe, 250.0).level, 100.0);
        assert_eq!(Classification::new(HazardStatus::Safe, 42.5).level, 42.5);
    }

    #[test]
    fn test_pending_classifier_always_waits() {
        let classifier = PendingClassifier;
        let result = classifier.classify(&snapshot());
        assert_eq!(result.status, HazardStatus::Waiting);
        assert_eq!(result.level, 0.0);
    }

    #[test]
    fn test_status_cell_starts_waiting() {
        let cell = StatusCell::new();
        assert_eq!(cell.current(), Classification::waiting());
    }

    #[test]
    fn test_status_cell_publish_and_observe() {
        let cell = StatusCell::new();
        let mut rx = cell.subscribe();

        cell.publish(Classification::new(HazardStatus::Alert, 60.0));
        assert_eq!(cell.current().status, HazardStatus::Alert);

        // Subscriber sees the same value without awaiting.
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status, HazardStatus::Alert);
    }
}
