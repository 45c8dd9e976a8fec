use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::courier::{Courier, GeoPoint};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/couriers", post(create_courier).get(list_couriers))
}

#[derive(Deserialize)]
pub struct CreateCourierRequest {
    pub name: String,
    pub location: GeoPoint,
    pub rating: f64,
}

async fn create_courier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateCourierRequest>,
) -> Result<Json<Courier>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    let courier = state
        .store
        .insert_courier(Courier::new(payload.name, payload.location, payload.rating))
        .await?;
    Ok(Json(courier))
}

async fn list_couriers(State(state): State<Arc<AppState>>) -> Json<Vec<Courier>> {
    Json(state.store.couriers())
}
