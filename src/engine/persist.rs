use chrono::{Duration, NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

use crate::engine::builder::RoutePlan;
use crate::engine::notify::{broadcast_route, publish};
use crate::error::AppError;
use crate::models::notification::{Notification, NotificationKind};
use crate::models::order::{DeliveryOrder, OrderStatus};
use crate::models::route::{Route, RouteLeg, RouteStatus};
use crate::state::AppState;

/// Spacing between consecutive pickups.
const PICKUP_INTERVAL_MIN: i64 = 30;
/// Fixed service time from pickup to delivery.
const DELIVERY_AFTER_PICKUP_MIN: i64 = 20;

#[derive(Debug, Clone)]
pub struct PersistParams {
    pub route_date: NaiveDate,
    pub vehicle_class: String,
    pub district: Option<String>,
}

/// Writes the route and all of its legs in one transaction.
///
/// Every order is re-validated against the committed store first; if any is
/// gone, no longer confirmed or already referenced by an open route, nothing
/// from this plan is written. Courier availability and order status are left
/// untouched.
pub async fn persist_plan(
    state: &AppState,
    plan: &RoutePlan,
    params: &PersistParams,
) -> Result<Route, AppError> {
    let now = Utc::now();
    let route_id = Uuid::new_v4();
    let courier_id = plan.courier.id;

    let mut tx = state.store.begin().await?;

    if tx.courier(courier_id).is_none() {
        return Err(AppError::NotFound(format!("courier {courier_id} not found")));
    }

    let mut legs = Vec::with_capacity(plan.orders.len());
    for (index, planned) in plan.orders.iter().enumerate() {
        let order = tx
            .order(planned.id)
            .ok_or_else(|| AppError::NotFound(format!("order {} not found", planned.id)))?;

        if order.status != OrderStatus::Confirmed {
            return Err(AppError::Conflict(format!(
                "order {} is no longer confirmed",
                order.id
            )));
        }
        // also catches the same order twice in one plan
        if tx.claimed_by(order.id).is_some() {
            return Err(AppError::OrderAlreadyRouted(order.id));
        }
        tx.claim_order(order.id, route_id)?;

        let sequence = index as u32 + 1;
        let pickup_eta = now + Duration::minutes(PICKUP_INTERVAL_MIN * i64::from(sequence));
        legs.push(RouteLeg {
            route_id,
            order_id: order.id,
            sequence,
            pickup_eta,
            delivery_eta: pickup_eta + Duration::minutes(DELIVERY_AFTER_PICKUP_MIN),
            picked_up_at: None,
            delivered_at: None,
        });
    }

    let route = Route {
        id: route_id,
        courier_id,
        route_date: params.route_date,
        district: params
            .district
            .clone()
            .or_else(|| shared_district(&plan.orders)),
        vehicle_class: params.vehicle_class.clone(),
        legs,
        total_distance_km: plan.total_distance_km,
        estimated_duration_min: plan.estimated_minutes,
        status: RouteStatus::Planned,
        reassignments: Vec::new(),
        created_at: now,
        updated_at: now,
        activated_at: None,
        finished_at: None,
    };

    tx.put_route(route.clone());
    tx.commit();

    info!(
        route_id = %route.id,
        courier_id = %courier_id,
        legs = route.legs.len(),
        distance_km = route.total_distance_km,
        "route persisted"
    );

    publish(
        state,
        Notification::new(
            courier_id,
            NotificationKind::RouteAssigned,
            format!(
                "New route for {} with {} stop(s), about {} min",
                route.route_date,
                route.legs.len(),
                route.estimated_duration_min
            ),
        ),
    );
    broadcast_route(state, &route, "assigned");

    Ok(route)
}

/// The district every order agrees on, if any.
fn shared_district(orders: &[DeliveryOrder]) -> Option<String> {
    let (first, rest) = orders.split_first()?;
    rest.iter()
        .all(|order| order.district == first.district)
        .then(|| first.district.clone())
}
