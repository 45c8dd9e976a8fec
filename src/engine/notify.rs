//! Best-effort courier notifications.
//!
//! Operations publish onto a bounded outbox only after their transaction
//! has committed; a background dispatcher drains it. Neither a full outbox
//! nor a failing notifier ever surfaces as an operation error.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::models::notification::Notification;
use crate::models::route::{Route, RouteEvent};
use crate::state::AppState;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), String>;
}

/// Writes notifications to the log; the default when no gateway is wired in.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), String> {
        info!(
            recipient = %notification.recipient,
            kind = notification.kind.as_str(),
            priority = ?notification.priority,
            message = %notification.message,
            "notification sent"
        );
        Ok(())
    }
}

pub fn publish(state: &AppState, notification: Notification) {
    if let Err(err) = state.notification_tx.try_send(notification) {
        state
            .metrics
            .notifications_total
            .with_label_values(&["dropped"])
            .inc();
        warn!(error = %err, "notification outbox rejected message");
    }
}

pub fn broadcast_route(state: &AppState, route: &Route, kind: &'static str) {
    // no subscribers is fine
    let _ = state.route_events_tx.send(RouteEvent::from_route(route, kind));
}

pub async fn run_notification_dispatcher(
    state: Arc<AppState>,
    notifier: Arc<dyn Notifier>,
    mut notification_rx: mpsc::Receiver<Notification>,
) {
    info!("notification dispatcher started");

    while let Some(notification) = notification_rx.recv().await {
        match notifier.notify(&notification).await {
            Ok(()) => {
                state
                    .metrics
                    .notifications_total
                    .with_label_values(&["sent"])
                    .inc();
            }
            Err(err) => {
                state
                    .metrics
                    .notifications_total
                    .with_label_values(&["failed"])
                    .inc();
                warn!(
                    recipient = %notification.recipient,
                    kind = notification.kind.as_str(),
                    error = %err,
                    "notification delivery failed"
                );
            }
        }
    }

    warn!("notification dispatcher stopped: outbox channel closed");
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::{publish, run_notification_dispatcher, Notifier};
    use crate::config::Config;
    use crate::models::notification::{Notification, NotificationKind};
    use crate::state::AppState;

    struct FlakyNotifier {
        seen: Mutex<Vec<Uuid>>,
    }

    #[async_trait]
    impl Notifier for FlakyNotifier {
        async fn notify(&self, notification: &Notification) -> Result<(), String> {
            self.seen.lock().unwrap().push(notification.recipient);
            Err("gateway down".to_string())
        }
    }

    #[tokio::test]
    async fn dispatcher_swallows_notifier_failures() {
        let (state, rx) = AppState::new(Config::default());
        let state = Arc::new(state);
        let notifier = Arc::new(FlakyNotifier {
            seen: Mutex::new(Vec::new()),
        });

        let recipient = Uuid::new_v4();
        publish(
            &state,
            Notification::new(recipient, NotificationKind::RouteAssigned, "new route"),
        );
        publish(
            &state,
            Notification::new(recipient, NotificationKind::RouteCancelled, "route cancelled"),
        );

        let handle = tokio::spawn(run_notification_dispatcher(
            state.clone(),
            notifier.clone(),
            rx,
        ));
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        handle.abort();

        assert_eq!(notifier.seen.lock().unwrap().len(), 2);
        assert_eq!(
            state
                .metrics
                .notifications_total
                .with_label_values(&["failed"])
                .get(),
            2
        );
    }

    #[tokio::test]
    async fn full_outbox_drops_instead_of_blocking() {
        let config = Config {
            notification_queue_size: 1,
            ..Config::default()
        };
        let (state, _rx) = AppState::new(config);
        let recipient = Uuid::new_v4();

        publish(
            &state,
            Notification::new(recipient, NotificationKind::RouteAssigned, "first"),
        );
        publish(
            &state,
            Notification::new(recipient, NotificationKind::RouteAssigned, "second"),
        );

        assert_eq!(
            state
                .metrics
                .notifications_total
                .with_label_values(&["dropped"])
                .get(),
            1
        );
    }
}
