//! Topic routing: from raw broker messages to channel state updates
//!
//! The decode step is a pure function over `(topic, payload)`; the apply
//! step mutates the store, slides the chart window, and synchronously runs
//! the classifier. Discards are silent by contract: a sensor publishing
//! garbage must not degrade the dashboard, so unknown topics and unparsable
//! payloads produce a debug log line and a metrics tick, nothing else.

use crate::classifier::{Classification, Classifier, StatusCell};
use crate::observability::metrics::metrics;
use crate::sensors::{ChannelKind, SensorStore};
use std::sync::Arc;
use tracing::debug;

/// Result of routing one message. Carried for logging and tests; none of the
/// variants is an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RouteOutcome {
    /// Message matched a channel and the update was applied.
    Applied {
        kind: ChannelKind,
        value: f64,
        classification: Classification,
    },
    /// Topic is not one of the four recognized sensor topics.
    UnknownTopic,
    /// Payload did not parse as a finite decimal number.
    Unparsable,
}

/// Pure mapping from an incoming message to a channel reading.
///
/// Returns `None` for unknown topics and unparsable payloads alike; the
/// caller distinguishes the two when it needs to. Payload bytes are decoded
/// as UTF-8 with replacement, matching how the dashboard stringified them.
pub fn decode_reading(topic: &str, payload: &[u8]) -> Option<(ChannelKind, f64)> {
    let kind = ChannelKind::from_topic(topic)?;
    let text = String::from_utf8_lossy(payload);
    let value = kind.parse_payload(&text)?;
    Some((kind, value))
}

/// Seam for an external chart surface.
///
/// Notified once per accepted message, after the channel's window has slid,
/// so the surface can redraw that channel. Discarded messages never reach
/// the hook.
pub trait ChartHook: Send + Sync {
    fn sample_applied(&self, kind: ChannelKind, value: f64);
}

/// Routes accepted readings into the store and drives the classifier.
pub struct SensorRouter {
    store: Arc<SensorStore>,
    classifier: Box<dyn Classifier>,
    status: StatusCell,
    chart_hook: Option<Box<dyn ChartHook>>,
}

impl SensorRouter {
    pub fn new(store: Arc<SensorStore>, classifier: Box<dyn Classifier>, status: StatusCell) -> Self {
        Self {
            store,
            classifier,
            status,
            chart_hook: None,
        }
    }

    /// Attach a chart surface to be notified of accepted samples.
    pub fn set_chart_hook(&mut self, hook: Box<dyn ChartHook>) {
        self.chart_hook = Some(hook);
    }

    /// Handle one incoming message.
    ///
    /// On a match: overwrite the channel value, slide its window, classify
    /// the fresh snapshot, and publish the classification. One classifier
    /// invocation per accepted message, no batching. Everything happens
    /// before this returns, so callers observe fully-applied state.
    pub fn route(&self, topic: &str, payload: &[u8]) -> RouteOutcome {
        metrics().record_message_received();

        let kind = match ChannelKind::from_topic(topic) {
            Some(kind) => kind,
            None => {
                debug!(topic, "discarding message on unrecognized topic");
                metrics().record_message_discarded_unknown_topic();
                return RouteOutcome::UnknownTopic;
            }
        };

        let text = String::from_utf8_lossy(payload);
        let value = match kind.parse_payload(&text) {
            Some(value) => value,
            None => {
                debug!(topic, payload = %text, "discarding unparsable payload");
                metrics().record_message_discarded_unparsable();
                return RouteOutcome::Unparsable;
            }
        };

        self.store.apply(kind, value);
        if let Some(hook) = &self.chart_hook {
            hook.sample_applied(kind, value);
        }
        let classification = self.classifier.classify(&self.store.snapshot());
        self.status.publish(classification);
        metrics().record_message_applied();

        debug!(channel = %kind, value, status = %classification.status, "reading applied");
        RouteOutcome::Applied {
            kind,
            value,
            classification,
        }
    }

    /// Latest classification the router has published.
    pub fn status(&self) -> Classification {
        self.status.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{HazardStatus, PendingClassifier, SensorSnapshot};
    use proptest::prelude::*;

    fn test_router(store: Arc<SensorStore>) -> SensorRouter {
        SensorRouter::new(store, Box::new(PendingClassifier), StatusCell::new())
    }

    #[test]
    fn test_decode_recognized_topics() {
        assert_eq!(
            decode_reading("sensor/suhu", b"27.5"),
            Some((ChannelKind::Temperature, 27.5))
        );
        assert_eq!(
            decode_reading("sensor/kelembapan", b"61.2"),
            Some((ChannelKind::Humidity, 61.2))
        );
        assert_eq!(
            decode_reading("sensor/asap", b"142"),
            Some((ChannelKind::Smoke, 142.0))
        );
        assert_eq!(
            decode_reading("sensor/api", b"512"),
            Some((ChannelKind::Adc, 512.0))
        );
    }

    #[test]
    fn test_decode_rejects_unknown_topic_and_garbage() {
        assert_eq!(decode_reading("sensor/unknown", b"10"), None);
        assert_eq!(decode_reading("sensor/suhu", b"abc"), None);
        assert_eq!(decode_reading("sensor/suhu", b""), None);
    }

    #[test]
    fn test_route_applies_matching_channel_only() {
        let store = Arc::new(SensorStore::new(4));
        let router = test_router(store.clone());

        let outcome = router.route("sensor/suhu", b"27.5");
        assert!(matches!(
            outcome,
            RouteOutcome::Applied {
                kind: ChannelKind::Temperature,
                value,
                ..
            } if value == 27.5
        ));

        assert_eq!(store.value(ChannelKind::Temperature), 27.5);
        assert_eq!(store.value(ChannelKind::Humidity), 0.0);
        assert_eq!(store.value(ChannelKind::Smoke), 0.0);
        assert_eq!(store.value(ChannelKind::Adc), 0.0);

        // Newest window sample is the reading, oldest zero evicted.
        let window = store.window(ChannelKind::Temperature);
        assert_eq!(*window.last().unwrap(), 27.5);
        assert_eq!(window.len(), 4);
    }

    #[test]
    fn test_route_unknown_topic_is_noop() {
        let store = Arc::new(SensorStore::new(4));
        let router = test_router(store.clone());
        let before: Vec<Vec<f64>> = ChannelKind::ALL.iter().map(|k| store.window(*k)).collect();

        assert_eq!(router.route("sensor/unknown", b"10"), RouteOutcome::UnknownTopic);

        for (kind, window) in ChannelKind::ALL.iter().zip(before) {
            assert_eq!(store.value(*kind), 0.0);
            assert_eq!(store.window(*kind), window, "window must be untouched");
        }
    }

    #[test]
    fn test_route_parse_failure_is_noop() {
        let store = Arc::new(SensorStore::new(4));
        let router = test_router(store.clone());
        router.route("sensor/asap", b"130");

        assert_eq!(router.route("sensor/asap", b"abc"), RouteOutcome::Unparsable);
        assert_eq!(store.value(ChannelKind::Smoke), 130.0);
        assert_eq!(*store.window(ChannelKind::Smoke).last().unwrap(), 130.0);
    }

    #[test]
    fn test_route_is_idempotent_on_replay() {
        let store = Arc::new(SensorStore::new(4));
        let router = test_router(store.clone());

        router.route("sensor/kelembapan", b"55.5");
        let once = store.value(ChannelKind::Humidity);
        router.route("sensor/kelembapan", b"55.5");

        assert_eq!(store.value(ChannelKind::Humidity), once);
        assert_eq!(once, 55.5);
    }

    #[test]
    fn test_chart_hook_fires_once_per_accepted_message() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct CountingHook(Arc<AtomicUsize>);
        impl ChartHook for CountingHook {
            fn sample_applied(&self, _kind: ChannelKind, _value: f64) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let redraws = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(SensorStore::new(4));
        let mut router = test_router(store);
        router.set_chart_hook(Box::new(CountingHook(redraws.clone())));

        router.route("sensor/suhu", b"27.5");
        router.route("sensor/asap", b"120");
        router.route("sensor/asap", b"not-a-number"); // discarded, no redraw
        router.route("sensor/other", b"1"); // discarded, no redraw

        assert_eq!(redraws.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_route_invokes_classifier_per_accepted_message() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct CountingClassifier(Arc<AtomicUsize>);
        impl Classifier for CountingClassifier {
            fn classify(&self, _snapshot: &SensorSnapshot) -> Classification {
                self.0.fetch_add(1, Ordering::SeqCst);
                Classification::new(HazardStatus::Safe, 10.0)
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(SensorStore::new(4));
        let router = SensorRouter::new(
            store,
            Box::new(CountingClassifier(calls.clone())),
            StatusCell::new(),
        );

        router.route("sensor/suhu", b"20.0");
        router.route("sensor/suhu", b"21.0");
        router.route("sensor/unknown", b"1"); // discarded, no invocation
        router.route("sensor/suhu", b"oops"); // discarded, no invocation

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(router.status().status, HazardStatus::Safe);
    }

    proptest! {
        #[test]
        fn decode_only_accepts_the_four_topics(topic in ".*", payload in ".*") {
            if let Some((kind, _)) = decode_reading(&topic, payload.as_bytes()) {
                prop_assert_eq!(kind.topic(), topic.as_str());
            }
        }

        #[test]
        fn decoded_values_are_finite(payload in ".*") {
            for topic in ["sensor/suhu", "sensor/kelembapan", "sensor/asap", "sensor/api"] {
                if let Some((_, value)) = decode_reading(topic, payload.as_bytes()) {
                    prop_assert!(value.is_finite());
                }
            }
        }

        #[test]
        fn integer_channels_decode_to_integral_values(value in -1e6f64..1e6f64) {
            let payload = format!("{value}");
            for topic in ["sensor/asap", "sensor/api"] {
                if let Some((_, decoded)) = decode_reading(topic, payload.as_bytes()) {
                    prop_assert_eq!(decoded, decoded.trunc());
                }
            }
        }

        #[test]
        fn window_length_survives_any_message_sequence(
            messages in prop::collection::vec(("(sensor/(suhu|kelembapan|asap|api|unknown))", ".*"), 0..64)
        ) {
            let store = Arc::new(SensorStore::new(5));
            let router = test_router(store.clone());
            for (topic, payload) in &messages {
                router.route(topic, payload.as_bytes());
                for kind in ChannelKind::ALL {
                    prop_assert_eq!(store.window(kind).len(), 5);
                }
            }
        }
    }
}
