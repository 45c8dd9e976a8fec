use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::route::RouteStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("no confirmed orders available for routing")]
    NoOrdersAvailable,

    #[error("no couriers available")]
    NoCouriersAvailable,

    #[error("courier {0} is not available")]
    CourierUnavailable(Uuid),

    #[error("route {route_id} has {} order(s) not yet delivered or cancelled", .pending.len())]
    IncompleteOrders { route_id: Uuid, pending: Vec<Uuid> },

    #[error("order {0} is already referenced by an open route")]
    OrderAlreadyRouted(Uuid),

    #[error("route {0} not found")]
    RouteNotFound(Uuid),

    #[error("cannot transition route from {from} to {to}")]
    InvalidTransition { from: RouteStatus, to: RouteStatus },

    #[error("invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NoOrdersAvailable => "NO_ORDERS_AVAILABLE",
            AppError::NoCouriersAvailable => "NO_COURIERS_AVAILABLE",
            AppError::CourierUnavailable(_) => "COURIER_UNAVAILABLE",
            AppError::IncompleteOrders { .. } => "INCOMPLETE_ORDERS",
            AppError::OrderAlreadyRouted(_) => "ORDER_ALREADY_ROUTED",
            AppError::RouteNotFound(_) => "ROUTE_NOT_FOUND",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::InvalidCoordinate { .. } => "INVALID_COORDINATE",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NoOrdersAvailable => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NoCouriersAvailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::CourierUnavailable(_)
            | AppError::IncompleteOrders { .. }
            | AppError::OrderAlreadyRouted(_)
            | AppError::InvalidTransition { .. }
            | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RouteNotFound(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidCoordinate { .. } | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });

        if let AppError::IncompleteOrders { pending, .. } = &self {
            body["pending_orders"] = json!(pending);
        }

        (status, Json(body)).into_response()
    }
}
