//! Route status machine: `planned -> active -> completed`, with
//! `cancelled` reachable from either open state.
//!
//! Each transition runs in one store transaction together with the courier
//! availability flip it implies. Activation claims the courier with a
//! compare-and-set, so two routes can never both hold the same courier.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::engine::notify::{broadcast_route, publish};
use crate::error::AppError;
use crate::models::notification::{Notification, NotificationKind, NotificationPriority};
use crate::models::order::OrderStatus;
use crate::models::route::{Route, RouteStatus};
use crate::state::AppState;
use crate::store::Transaction;

/// Loads a route, hiding it entirely when it belongs to another courier.
pub(crate) fn load_scoped(
    tx: &Transaction<'_>,
    route_id: Uuid,
    courier_scope: Option<Uuid>,
) -> Result<Route, AppError> {
    tx.route(route_id)
        .filter(|route| courier_scope.is_none_or(|courier_id| route.courier_id == courier_id))
        .ok_or(AppError::RouteNotFound(route_id))
}

pub async fn transition_route(
    state: &AppState,
    route_id: Uuid,
    target: RouteStatus,
    courier_scope: Option<Uuid>,
) -> Result<Route, AppError> {
    let mut tx = state.store.begin().await?;
    let mut route = load_scoped(&tx, route_id, courier_scope)?;
    let from = route.status;

    if !from.can_transition_to(target) {
        return Err(AppError::InvalidTransition { from, to: target });
    }

    let now = Utc::now();
    match target {
        RouteStatus::Active => {
            tx.claim_courier(route.courier_id)?;
            route.activated_at = Some(now);
        }
        RouteStatus::Completed => {
            let pending: Vec<Uuid> = route
                .order_ids()
                .filter(|order_id| {
                    !tx.order(*order_id)
                        .is_some_and(|order| order.status.is_terminal())
                })
                .collect();
            if !pending.is_empty() {
                return Err(AppError::IncompleteOrders { route_id, pending });
            }
            tx.release_courier(route.courier_id)?;
            close_route(&mut tx, &mut route, now);
        }
        RouteStatus::Cancelled => {
            // a planned route never took the courier's flag
            if from == RouteStatus::Active {
                tx.release_courier(route.courier_id)?;
            }
            close_route(&mut tx, &mut route, now);
        }
        RouteStatus::Planned => return Err(AppError::InvalidTransition { from, to: target }),
    }

    route.status = target;
    route.updated_at = now;
    tx.put_route(route.clone());
    tx.commit();

    state
        .metrics
        .route_transitions_total
        .with_label_values(&[target.as_str()])
        .inc();
    info!(
        route_id = %route.id,
        courier_id = %route.courier_id,
        from = %from,
        to = %target,
        "route transitioned"
    );

    if target == RouteStatus::Cancelled {
        publish(
            state,
            Notification::new(
                route.courier_id,
                NotificationKind::RouteCancelled,
                format!("Route for {} was cancelled", route.route_date),
            )
            .with_priority(NotificationPriority::High),
        );
    }
    broadcast_route(state, &route, target.as_str());

    Ok(route)
}

fn close_route(tx: &mut Transaction<'_>, route: &mut Route, now: chrono::DateTime<Utc>) {
    for order_id in route.order_ids() {
        tx.release_order(order_id);
    }
    route.finished_at = Some(now);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegEvent {
    PickedUp,
    Delivered,
}

/// Stamps the actual pickup or delivery time on one leg of an active route
/// and moves the referenced order along with it.
pub async fn record_leg_event(
    state: &AppState,
    route_id: Uuid,
    order_id: Uuid,
    event: LegEvent,
    courier_scope: Option<Uuid>,
) -> Result<Route, AppError> {
    let mut tx = state.store.begin().await?;
    let mut route = load_scoped(&tx, route_id, courier_scope)?;

    if route.status != RouteStatus::Active {
        return Err(AppError::Conflict(format!(
            "route {route_id} is {}, not active",
            route.status
        )));
    }

    let mut order = tx
        .order(order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
    if order.status.is_terminal() {
        return Err(AppError::Conflict(format!(
            "order {order_id} is already finished"
        )));
    }

    let now = Utc::now();
    let leg = route
        .leg_mut(order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} is not on route {route_id}")))?;

    match event {
        LegEvent::PickedUp => {
            if leg.picked_up_at.is_some() {
                return Err(AppError::Conflict(format!("order {order_id} already picked up")));
            }
            leg.picked_up_at = Some(now);
            order.status = OrderStatus::Picked;
        }
        LegEvent::Delivered => {
            if leg.picked_up_at.is_none() {
                return Err(AppError::Conflict(format!(
                    "order {order_id} has not been picked up"
                )));
            }
            leg.delivered_at = Some(now);
            order.status = OrderStatus::Delivered;
        }
    }

    route.updated_at = now;
    tx.put_order(order);
    tx.put_route(route.clone());
    tx.commit();

    info!(
        route_id = %route_id,
        order_id = %order_id,
        event = ?event,
        "leg progress recorded"
    );
    broadcast_route(state, &route, "leg_progress");

    Ok(route)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::{record_leg_event, transition_route, LegEvent};
    use crate::config::Config;
    use crate::engine::builder::RoutePlan;
    use crate::engine::persist::{persist_plan, PersistParams};
    use crate::error::AppError;
    use crate::models::courier::{Courier, GeoPoint};
    use crate::models::order::{DeliveryOrder, OrderStatus};
    use crate::models::route::{Route, RouteStatus};
    use crate::state::AppState;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 2).unwrap()
    }

    async fn planned_route(state: &AppState, legs: usize) -> Route {
        let courier = state
            .store
            .insert_courier(Courier::new("Juma", GeoPoint::new(-3.38, 36.68), 4.4))
            .await
            .unwrap();
        let mut orders = Vec::new();
        for i in 0..legs {
            let offset = i as f64 * 0.004;
            let order = DeliveryOrder::confirmed(
                GeoPoint::new(-3.38 + offset, 36.68),
                GeoPoint::new(-3.37 + offset, 36.69),
                "kaloleni",
                date(),
            );
            orders.push(state.store.insert_order(order).await.unwrap());
        }
        let plan = RoutePlan {
            courier,
            orders,
            total_distance_km: 3.0,
            estimated_minutes: 7,
        };
        let params = PersistParams {
            route_date: date(),
            vehicle_class: "motorcycle".to_string(),
            district: Some("kaloleni".to_string()),
        };
        persist_plan(state, &plan, &params).await.unwrap()
    }

    #[tokio::test]
    async fn activation_takes_the_courier() {
        let (state, _rx) = AppState::new(Config::default());
        let route = planned_route(&state, 2).await;

        let active = transition_route(&state, route.id, RouteStatus::Active, None)
            .await
            .unwrap();

        assert_eq!(active.status, RouteStatus::Active);
        assert!(active.activated_at.is_some());
        assert!(!state.store.courier(route.courier_id).unwrap().available);
    }

    #[tokio::test]
    async fn repeating_a_transition_is_rejected() {
        let (state, _rx) = AppState::new(Config::default());
        let route = planned_route(&state, 1).await;

        transition_route(&state, route.id, RouteStatus::Active, None)
            .await
            .unwrap();
        let err = transition_route(&state, route.id, RouteStatus::Active, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::InvalidTransition {
                from: RouteStatus::Active,
                to: RouteStatus::Active
            }
        ));
    }

    #[tokio::test]
    async fn completing_with_open_orders_fails_and_changes_nothing() {
        let (state, _rx) = AppState::new(Config::default());
        let route = planned_route(&state, 3).await;
        transition_route(&state, route.id, RouteStatus::Active, None)
            .await
            .unwrap();

        for leg in &route.legs[..2] {
            record_leg_event(&state, route.id, leg.order_id, LegEvent::PickedUp, None)
                .await
                .unwrap();
            record_leg_event(&state, route.id, leg.order_id, LegEvent::Delivered, None)
                .await
                .unwrap();
        }

        let err = transition_route(&state, route.id, RouteStatus::Completed, None)
            .await
            .unwrap_err();

        match err {
            AppError::IncompleteOrders { pending, .. } => {
                assert_eq!(pending, vec![route.legs[2].order_id]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            state.store.route(route.id).unwrap().status,
            RouteStatus::Active
        );
        assert!(!state.store.courier(route.courier_id).unwrap().available);
    }

    #[tokio::test]
    async fn completion_releases_the_courier() {
        let (state, _rx) = AppState::new(Config::default());
        let route = planned_route(&state, 2).await;
        transition_route(&state, route.id, RouteStatus::Active, None)
            .await
            .unwrap();

        record_leg_event(&state, route.id, route.legs[0].order_id, LegEvent::PickedUp, None)
            .await
            .unwrap();
        record_leg_event(&state, route.id, route.legs[0].order_id, LegEvent::Delivered, None)
            .await
            .unwrap();
        state
            .store
            .set_order_status(route.legs[1].order_id, OrderStatus::Cancelled)
            .await
            .unwrap();

        let done = transition_route(&state, route.id, RouteStatus::Completed, None)
            .await
            .unwrap();

        assert_eq!(done.status, RouteStatus::Completed);
        assert!(done.finished_at.is_some());
        assert!(state.store.courier(route.courier_id).unwrap().available);
    }

    #[tokio::test]
    async fn cancelling_returns_orders_to_the_pool() {
        let (state, _rx) = AppState::new(Config::default());
        let route = planned_route(&state, 2).await;
        transition_route(&state, route.id, RouteStatus::Active, None)
            .await
            .unwrap();

        transition_route(&state, route.id, RouteStatus::Cancelled, None)
            .await
            .unwrap();

        assert!(state.store.courier(route.courier_id).unwrap().available);
        assert_eq!(state.store.find_unassigned_confirmed(date(), None).len(), 2);
        assert!(matches!(
            transition_route(&state, route.id, RouteStatus::Active, None).await,
            Err(AppError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn foreign_courier_scope_looks_like_missing_route() {
        let (state, _rx) = AppState::new(Config::default());
        let route = planned_route(&state, 1).await;

        let err = transition_route(&state, route.id, RouteStatus::Active, Some(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RouteNotFound(id) if id == route.id));

        transition_route(&state, route.id, RouteStatus::Active, Some(route.courier_id))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn courier_cannot_run_two_routes_at_once() {
        let (state, _rx) = AppState::new(Config::default());
        let first = planned_route(&state, 1).await;
        let mut second = planned_route(&state, 1).await;

        // point the second route at the first route's courier
        let mut tx = state.store.begin().await.unwrap();
        second.courier_id = first.courier_id;
        tx.put_route(second.clone());
        tx.commit();

        transition_route(&state, first.id, RouteStatus::Active, None)
            .await
            .unwrap();
        let err = transition_route(&state, second.id, RouteStatus::Active, None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::CourierUnavailable(id) if id == first.courier_id));
    }

    #[tokio::test]
    async fn delivery_before_pickup_conflicts() {
        let (state, _rx) = AppState::new(Config::default());
        let route = planned_route(&state, 1).await;
        let order_id = route.legs[0].order_id;

        assert!(matches!(
            record_leg_event(&state, route.id, order_id, LegEvent::PickedUp, None).await,
            Err(AppError::Conflict(_))
        ));

        transition_route(&state, route.id, RouteStatus::Active, None)
            .await
            .unwrap();
        assert!(matches!(
            record_leg_event(&state, route.id, order_id, LegEvent::Delivered, None).await,
            Err(AppError::Conflict(_))
        ));

        let route = record_leg_event(&state, route.id, order_id, LegEvent::PickedUp, None)
            .await
            .unwrap();
        assert!(route.legs[0].picked_up_at.is_some());
        assert_eq!(
            state.store.order(order_id).unwrap().status,
            OrderStatus::Picked
        );
    }
}
