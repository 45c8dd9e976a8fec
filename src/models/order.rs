use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::courier::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Picked,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// No further lifecycle action happens once an order is delivered or cancelled.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryOrder {
    pub id: Uuid,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub district: String,
    pub delivery_date: NaiveDate,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl DeliveryOrder {
    pub fn confirmed(
        pickup: GeoPoint,
        dropoff: GeoPoint,
        district: impl Into<String>,
        delivery_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            pickup,
            dropoff,
            district: district.into(),
            delivery_date,
            status: OrderStatus::Confirmed,
            created_at: Utc::now(),
        }
    }
}
