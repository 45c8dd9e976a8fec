use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::lifecycle::{record_leg_event, transition_route, LegEvent};
use crate::engine::planning::{plan_and_persist_routes, PlanReport, PlanRequest};
use crate::engine::reassignment::reassign_route;
use crate::error::AppError;
use crate::models::route::{Route, RouteStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/routes", get(list_routes))
        .route("/routes/plan", post(plan_routes))
        .route("/routes/:id", get(get_route))
        .route("/routes/:id/transition", post(transition))
        .route("/routes/:id/reassign", post(reassign))
        .route("/routes/:id/legs/:order_id/pickup", post(record_pickup))
        .route("/routes/:id/legs/:order_id/delivery", post(record_delivery))
}

#[derive(Deserialize)]
pub struct ListRoutesQuery {
    pub date: Option<NaiveDate>,
    pub courier_id: Option<Uuid>,
    pub status: Option<RouteStatus>,
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub status: RouteStatus,
    /// When set, the route is only visible to this courier.
    pub courier_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct ReassignRequest {
    pub courier_id: Uuid,
    pub reason: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct LegEventRequest {
    pub courier_id: Option<Uuid>,
}

async fn plan_routes(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PlanRequest>,
) -> Result<Json<PlanReport>, AppError> {
    if payload.max_orders_per_courier == Some(0) {
        return Err(AppError::BadRequest(
            "max_orders_per_courier must be > 0".to_string(),
        ));
    }

    let report = plan_and_persist_routes(&state, &payload).await?;
    Ok(Json(report))
}

async fn list_routes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListRoutesQuery>,
) -> Json<Vec<Route>> {
    let routes = state
        .store
        .routes()
        .into_iter()
        .filter(|route| query.date.is_none_or(|date| route.route_date == date))
        .filter(|route| query.courier_id.is_none_or(|id| route.courier_id == id))
        .filter(|route| query.status.is_none_or(|status| route.status == status))
        .collect();

    Json(routes)
}

async fn get_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Route>, AppError> {
    let route = state.store.route(id).ok_or(AppError::RouteNotFound(id))?;
    Ok(Json(route))
}

async fn transition(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> Result<Json<Route>, AppError> {
    let route = transition_route(&state, id, payload.status, payload.courier_id).await?;
    Ok(Json(route))
}

async fn reassign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReassignRequest>,
) -> Result<Json<Route>, AppError> {
    let route = reassign_route(&state, id, payload.courier_id, payload.reason).await?;
    Ok(Json(route))
}

async fn record_pickup(
    State(state): State<Arc<AppState>>,
    Path((id, order_id)): Path<(Uuid, Uuid)>,
    payload: Option<Json<LegEventRequest>>,
) -> Result<Json<Route>, AppError> {
    let scope = payload.and_then(|Json(body)| body.courier_id);
    let route = record_leg_event(&state, id, order_id, LegEvent::PickedUp, scope).await?;
    Ok(Json(route))
}

async fn record_delivery(
    State(state): State<Arc<AppState>>,
    Path((id, order_id)): Path<(Uuid, Uuid)>,
    payload: Option<Json<LegEventRequest>>,
) -> Result<Json<Route>, AppError> {
    let scope = payload.and_then(|Json(body)| body.courier_id);
    let route = record_leg_event(&state, id, order_id, LegEvent::Delivered, scope).await?;
    Ok(Json(route))
}
