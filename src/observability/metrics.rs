//! Thread-safe operational counters
//!
//! Atomic counters for message routing and connection lifecycle, cheap
//! enough to tick on every message. The discard counters are the only
//! visibility the silent-discard contract allows: a payload that fails to
//! parse never produces an error, but it does show up here.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics collector instance
pub static METRICS: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::new);

/// Get reference to global metrics collector
pub fn metrics() -> &'static MetricsCollector {
    &METRICS
}

/// Counter set for the hub process.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    // Message routing (ticked once per incoming message)
    messages_received: AtomicU64,
    messages_applied: AtomicU64,
    messages_discarded_unknown_topic: AtomicU64,
    messages_discarded_unparsable: AtomicU64,

    // Connection lifecycle
    connection_attempts: AtomicU64,
    connections_established: AtomicU64,
    connection_failures: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message_applied(&self) {
        self.messages_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message_discarded_unknown_topic(&self) {
        self.messages_discarded_unknown_topic
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message_discarded_unparsable(&self) {
        self.messages_discarded_unparsable
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_attempt(&self) {
        self.connection_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_established(&self) {
        self.connections_established.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_failure(&self) {
        self.connection_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Consistent-enough snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_applied: self.messages_applied.load(Ordering::Relaxed),
            messages_discarded_unknown_topic: self
                .messages_discarded_unknown_topic
                .load(Ordering::Relaxed),
            messages_discarded_unparsable: self
                .messages_discarded_unparsable
                .load(Ordering::Relaxed),
            connection_attempts: self.connection_attempts.load(Ordering::Relaxed),
            connections_established: self.connections_established.load(Ordering::Relaxed),
            connection_failures: self.connection_failures.load(Ordering::Relaxed),
        }
    }
}

/// Serializable view of the counters.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub messages_applied: u64,
    pub messages_discarded_unknown_topic: u64,
    pub messages_discarded_unparsable: u64,
    pub connection_attempts: u64,
    pub connections_established: u64,
    pub connection_failures: u64,
}
