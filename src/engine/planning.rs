use std::time::Instant;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::builder::{build, RoutePlan};
use crate::engine::persist::{persist_plan, PersistParams};
use crate::error::AppError;
use crate::models::route::RouteSummary;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct PlanRequest {
    pub date: NaiveDate,
    pub district: Option<String>,
    pub max_orders_per_courier: Option<usize>,
    pub vehicle_class: Option<String>,
    /// Plan for this courier only.
    pub courier_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanFailure {
    pub courier_id: Uuid,
    pub order_ids: Vec<Uuid>,
    pub code: &'static str,
    pub error: String,
}

impl PlanFailure {
    fn new(plan: &RoutePlan, err: &AppError) -> Self {
        Self {
            courier_id: plan.courier.id,
            order_ids: plan.orders.iter().map(|order| order.id).collect(),
            code: err.code(),
            error: err.to_string(),
        }
    }

    fn skipped(plan: &RoutePlan) -> Self {
        Self {
            courier_id: plan.courier.id,
            order_ids: plan.orders.iter().map(|order| order.id).collect(),
            code: "SKIPPED",
            error: "not attempted after an earlier storage failure".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub routes: Vec<RouteSummary>,
    pub failures: Vec<PlanFailure>,
    pub unassigned_orders: usize,
}

/// Plans routes from the current snapshot and persists each plan on its own.
///
/// The snapshot may be stale by the time a plan is written. Conflicts caught
/// at commit time fail only that plan and are reported in `failures`. A
/// storage error stops the run: that plan and every later one land in
/// `failures`, and routes already committed are still reported.
pub async fn plan_and_persist_routes(
    state: &AppState,
    request: &PlanRequest,
) -> Result<PlanReport, AppError> {
    let started = Instant::now();

    let orders = state
        .store
        .find_unassigned_confirmed(request.date, request.district.as_deref());
    if orders.is_empty() {
        return Err(AppError::NoOrdersAvailable);
    }

    let couriers = state.store.find_available(request.courier_id);
    if couriers.is_empty() {
        return Err(AppError::NoCouriersAvailable);
    }

    let max_orders = request
        .max_orders_per_courier
        .unwrap_or(state.config.max_orders_per_courier);
    let outcome = build(orders, couriers, max_orders)?;

    let params = PersistParams {
        route_date: request.date,
        vehicle_class: request
            .vehicle_class
            .clone()
            .unwrap_or_else(|| state.config.default_vehicle_class.clone()),
        district: request.district.clone(),
    };

    let mut routes = Vec::with_capacity(outcome.plans.len());
    let mut failures = Vec::new();
    let mut aborted = false;

    for plan in &outcome.plans {
        if aborted {
            failures.push(PlanFailure::skipped(plan));
            continue;
        }
        match persist_plan(state, plan, &params).await {
            Ok(route) => {
                state
                    .metrics
                    .routes_planned_total
                    .with_label_values(&["success"])
                    .inc();
                routes.push(route.summary());
            }
            Err(
                err @ (AppError::OrderAlreadyRouted(_)
                | AppError::Conflict(_)
                | AppError::NotFound(_)),
            ) => {
                state
                    .metrics
                    .routes_planned_total
                    .with_label_values(&["conflict"])
                    .inc();
                warn!(courier_id = %plan.courier.id, error = %err, "route plan rejected at commit");
                failures.push(PlanFailure::new(plan, &err));
            }
            Err(err) => {
                state
                    .metrics
                    .routes_planned_total
                    .with_label_values(&["error"])
                    .inc();
                error!(courier_id = %plan.courier.id, error = %err, "route planning aborted");
                failures.push(PlanFailure::new(plan, &err));
                aborted = true;
            }
        }
    }

    state
        .metrics
        .unassigned_orders
        .set(i64::try_from(outcome.unassigned).unwrap_or(i64::MAX));
    state
        .metrics
        .plan_latency_seconds
        .observe(started.elapsed().as_secs_f64());

    info!(
        date = %request.date,
        routes = routes.len(),
        failures = failures.len(),
        unassigned = outcome.unassigned,
        "route planning finished"
    );

    Ok(PlanReport {
        routes,
        failures,
        unassigned_orders: outcome.unassigned,
    })
}
