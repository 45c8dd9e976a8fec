use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Json;
use axum::Router;

use crate::engine::analytics::{get_analytics, get_suggestions};
use crate::error::AppError;
use crate::models::analytics::{AnalyticsFilter, AnalyticsSummary, Suggestion, SuggestionQuery};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analytics", get(analytics))
        .route("/suggestions", get(suggestions))
}

async fn analytics(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<AnalyticsFilter>,
) -> Result<Json<AnalyticsSummary>, AppError> {
    if filter.from > filter.to {
        return Err(AppError::BadRequest("from must not be after to".to_string()));
    }

    Ok(Json(get_analytics(&state, &filter)))
}

async fn suggestions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SuggestionQuery>,
) -> Result<Json<Vec<Suggestion>>, AppError> {
    if query.max_distance_km.is_nan() || query.max_distance_km <= 0.0 {
        return Err(AppError::BadRequest(
            "max_distance_km must be > 0".to_string(),
        ));
    }
    if query.max_duration_min == 0 {
        return Err(AppError::BadRequest(
            "max_duration_min must be > 0".to_string(),
        ));
    }

    Ok(Json(get_suggestions(&state, &query)))
}
