use tokio::sync::{broadcast, mpsc};

use crate::config::Config;
use crate::models::notification::Notification;
use crate::models::route::RouteEvent;
use crate::observability::metrics::Metrics;
use crate::store::Store;

pub struct AppState {
    pub store: Store,
    pub notification_tx: mpsc::Sender<Notification>,
    pub route_events_tx: broadcast::Sender<RouteEvent>,
    pub metrics: Metrics,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> (Self, mpsc::Receiver<Notification>) {
        let (notification_tx, notification_rx) = mpsc::channel(config.notification_queue_size);
        let (route_events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        (
            Self {
                store: Store::new(config.store_tx_timeout),
                notification_tx,
                route_events_tx,
                metrics: Metrics::new(),
                config,
            },
            notification_rx,
        )
    }
}
