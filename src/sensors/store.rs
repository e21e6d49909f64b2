//! Shared live state for the four sensor channels
//!
//! The store is the single owner of every channel cell. It is created once
//! at startup and handed to consumers behind an `Arc`: there is no hidden
//! process-global state. Only the router writes to it in production wiring;
//! readers (hub, classifier, future UI surfaces) take snapshots.

use super::channel::ChannelKind;
use super::window::SampleWindow;
use chrono::{DateTime, Utc};
use std::sync::RwLock;

/// One channel's live state: current value, freshness, and chart window.
#[derive(Debug, Clone)]
struct ChannelCell {
    value: f64,
    updated_at: Option<DateTime<Utc>>,
    window: SampleWindow,
}

impl ChannelCell {
    fn new(window_capacity: usize) -> Self {
        Self {
            value: 0.0,
            updated_at: None,
            window: SampleWindow::new(window_capacity),
        }
    }
}

/// Point-in-time copy of all four channel values.
///
/// This is what the classifier sees. `updated_at` of the individual cells is
/// deliberately not included; the classifier contract is a function of the
/// most recent values only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    pub temperature: f64,
    pub humidity: f64,
    pub smoke: f64,
    pub adc: f64,
    pub taken_at: DateTime<Utc>,
}

impl SensorSnapshot {
    /// Value for a channel by kind, mirroring the fixed slot layout.
    pub fn value(&self, kind: ChannelKind) -> f64 {
        match kind {
            ChannelKind::Temperature => self.temperature,
            ChannelKind::Humidity => self.humidity,
            ChannelKind::Smoke => self.smoke,
            ChannelKind::Adc => self.adc,
        }
    }
}

/// The four channel cells behind one lock.
///
/// Writes happen on the hub's single consumer loop, so the lock is
/// uncontended in practice; it exists so a multi-threaded host stays sound.
#[derive(Debug)]
pub struct SensorStore {
    cells: RwLock<[ChannelCell; ChannelKind::COUNT]>,
}

impl SensorStore {
    /// Create the store with all values at 0.0 and zero-filled windows.
    pub fn new(window_capacity: usize) -> Self {
        let cell = ChannelCell::new(window_capacity);
        Self {
            cells: RwLock::new([cell.clone(), cell.clone(), cell.clone(), cell]),
        }
    }

    /// Overwrite a channel's value and record it into the chart window.
    ///
    /// Last write wins; replaying the same value is a no-op on the cell
    /// value and one more slide of the window.
    pub fn apply(&self, kind: ChannelKind, value: f64) {
        let mut cells = self.cells.write().expect("sensor store lock poisoned");
        let cell = &mut cells[kind.index()];
        cell.value = value;
        cell.updated_at = Some(Utc::now());
        cell.window.record(value);
    }

    /// Current value of one channel.
    pub fn value(&self, kind: ChannelKind) -> f64 {
        self.cells.read().expect("sensor store lock poisoned")[kind.index()].value
    }

    /// When a channel last accepted a message, `None` if it never has.
    pub fn updated_at(&self, kind: ChannelKind) -> Option<DateTime<Utc>> {
        self.cells.read().expect("sensor store lock poisoned")[kind.index()].updated_at
    }

    /// Owned copy of a channel's chart window, oldest-first.
    pub fn window(&self, kind: ChannelKind) -> Vec<f64> {
        self.cells.read().expect("sensor store lock poisoned")[kind.index()]
            .window
            .to_vec()
    }

    /// Consistent snapshot of all four values.
    pub fn snapshot(&self) -> SensorSnapshot {
        let cells = self.cells.read().expect("sensor store lock poisoned");
        SensorSnapshot {
            temperature: cells[ChannelKind::Temperature.index()].value,
            humidity: cells[ChannelKind::Humidity.index()].value,
            smoke: cells[ChannelKind::Smoke.index()].value,
            adc: cells[ChannelKind::Adc.index()].value,
            taken_at: Utc::now(),
        }
    }
}
