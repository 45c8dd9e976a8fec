use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::notify::{broadcast_route, publish};
use crate::error::AppError;
use crate::models::notification::{Notification, NotificationKind, NotificationPriority};
use crate::models::route::{Reassignment, Route, RouteStatus};
use crate::state::AppState;

/// Hands an active route to another courier. Legs, sequence and ETAs are kept.
///
/// The availability flags swap in the same transaction: the new courier is
/// claimed (compare-and-set), the old one released. Planned routes are not
/// reassignable; cancel and re-plan them instead.
pub async fn reassign_route(
    state: &AppState,
    route_id: Uuid,
    new_courier_id: Uuid,
    reason: Option<String>,
) -> Result<Route, AppError> {
    match swap_courier(state, route_id, new_courier_id, reason).await {
        Ok((route, previous)) => {
            state
                .metrics
                .reassignments_total
                .with_label_values(&["success"])
                .inc();
            info!(
                route_id = %route.id,
                from_courier = %previous,
                to_courier = %new_courier_id,
                "route reassigned"
            );

            publish(
                state,
                Notification::new(
                    previous,
                    NotificationKind::RouteReassignedFrom,
                    format!("Route for {} was moved to another courier", route.route_date),
                ),
            );
            publish(
                state,
                Notification::new(
                    new_courier_id,
                    NotificationKind::RouteReassignedTo,
                    format!(
                        "You have been given a route for {} with {} stop(s)",
                        route.route_date,
                        route.legs.len()
                    ),
                )
                .with_priority(NotificationPriority::High),
            );
            broadcast_route(state, &route, "reassigned");

            Ok(route)
        }
        Err(err) => {
            state
                .metrics
                .reassignments_total
                .with_label_values(&["error"])
                .inc();
            warn!(route_id = %route_id, to_courier = %new_courier_id, error = %err, "reassignment rejected");
            Err(err)
        }
    }
}

async fn swap_courier(
    state: &AppState,
    route_id: Uuid,
    new_courier_id: Uuid,
    reason: Option<String>,
) -> Result<(Route, Uuid), AppError> {
    let mut tx = state.store.begin().await?;
    let mut route = tx
        .route(route_id)
        .ok_or(AppError::RouteNotFound(route_id))?;

    if route.status != RouteStatus::Active {
        return Err(AppError::InvalidTransition {
            from: route.status,
            to: RouteStatus::Active,
        });
    }

    let previous = route.courier_id;
    if previous == new_courier_id {
        return Err(AppError::BadRequest(format!(
            "route {route_id} is already assigned to courier {new_courier_id}"
        )));
    }

    tx.claim_courier(new_courier_id).map_err(|err| match err {
        AppError::NotFound(_) => AppError::CourierUnavailable(new_courier_id),
        other => other,
    })?;
    tx.release_courier(previous)?;

    let now = Utc::now();
    route.courier_id = new_courier_id;
    route.reassignments.push(Reassignment {
        from_courier: previous,
        to_courier: new_courier_id,
        reason,
        at: now,
    });
    route.updated_at = now;

    tx.put_route(route.clone());
    tx.commit();

    Ok((route, previous))
}
