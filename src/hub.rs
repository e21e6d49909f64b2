//! The sensor hub: wiring from transport events to channel state
//!
//! One consumer loop owns the whole message path. Events arrive over an
//! mpsc channel in arrival order and each message is fully routed (store,
//! window, classifier) before the next one is looked at, so no
//! synchronization is needed beyond what the store already carries.

use crate::classifier::{Classification, Classifier, StatusCell};
use crate::config::HubConfig;
use crate::error::{HubError, HubResult};
use crate::router::SensorRouter;
use crate::sensors::{ChannelKind, SensorStore};
use crate::transport::{LinkEvent, Transport};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Buffered events between the transport task and the consumer loop.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Sensor hub service: transport in, channel state and status out.
pub struct SensorHub<T: Transport> {
    transport: T,
    router: SensorRouter,
    store: Arc<SensorStore>,
    status: StatusCell,
    events: mpsc::Receiver<LinkEvent>,
    auto_subscribe: bool,
}

impl<T> SensorHub<T>
where
    T: Transport,
    HubError: From<T::Error>,
{
    /// Wire up the hub. The store and status cell are created here and
    /// shared with the router; callers keep handles via [`store`](Self::store)
    /// and [`status`](Self::status).
    pub fn new(config: &HubConfig, mut transport: T, classifier: Box<dyn Classifier>) -> Self {
        let store = Arc::new(SensorStore::new(config.channels.window_capacity));
        let status = StatusCell::new();
        let router = SensorRouter::new(store.clone(), classifier, status.clone());

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        transport.set_event_sender(event_tx);

        Self {
            transport,
            router,
            store,
            status,
            events: event_rx,
            auto_subscribe: config.mqtt.auto_subscribe,
        }
    }

    /// Shared handle to the live channel state.
    pub fn store(&self) -> Arc<SensorStore> {
        self.store.clone()
    }

    /// Shared handle to the observable classification.
    pub fn status(&self) -> StatusCell {
        self.status.clone()
    }

    /// Latest classification.
    pub fn current_status(&self) -> Classification {
        self.status.current()
    }

    /// Attach a chart surface to the router.
    pub fn set_chart_hook(&mut self, hook: Box<dyn crate::router::ChartHook>) {
        self.router.set_chart_hook(hook);
    }

    /// Connect, subscribe, and consume events until the link closes.
    ///
    /// With `auto_subscribe` the transport covers all channels through the
    /// wildcard on its own; otherwise the four channel topics are subscribed
    /// individually here. Returns when the link reports `Closed`: after a
    /// transport error, a broker disconnect, or an interrupt-triggered
    /// shutdown. There is no automatic reconnect; the caller decides whether
    /// to build a fresh hub.
    pub async fn run(&mut self) -> HubResult<()> {
        self.transport.connect().await?;

        if !self.auto_subscribe {
            for kind in ChannelKind::ALL {
                self.transport.subscribe(kind.topic()).await?;
            }
        }

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut shutdown_requested = false;

        loop {
            tokio::select! {
                _ = &mut ctrl_c, if !shutdown_requested => {
                    info!("shutdown signal received, disconnecting");
                    shutdown_requested = true;
                    self.transport.disconnect().await?;
                    // The transport confirms with a Closed event; keep
                    // draining until it arrives.
                }

                maybe_event = self.events.recv() => match maybe_event {
                    Some(LinkEvent::Connected) => {
                        info!("link established, sensor feed live");
                    }
                    Some(LinkEvent::Message { topic, payload }) => {
                        self.router.route(&topic, &payload);
                    }
                    Some(LinkEvent::Error { cause }) => {
                        warn!(%cause, "transport failed, link is going down");
                    }
                    Some(LinkEvent::Closed) => {
                        info!("link closed");
                        break;
                    }
                    None => {
                        warn!("event channel closed without a Closed event");
                        break;
                    }
                },
            }
        }

        Ok(())
    }
}
