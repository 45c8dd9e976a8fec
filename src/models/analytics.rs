use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsFilter {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub district: Option<String>,
    pub courier_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusCounts {
    pub planned: usize,
    pub active: usize,
    pub completed: usize,
    pub cancelled: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub routes: usize,
    pub completed: usize,
    pub orders: usize,
    pub total_distance_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourierPerformance {
    pub courier_id: Uuid,
    pub routes: usize,
    pub completed: usize,
    pub orders: usize,
    pub total_distance_km: f64,
    pub avg_delivery_delay_min: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsSummary {
    pub total_routes: usize,
    pub status_counts: StatusCounts,
    /// completed / (routes that reached a terminal state); 0 when none did.
    pub completion_rate: f64,
    pub total_orders: usize,
    pub avg_orders_per_route: f64,
    pub avg_distance_km: f64,
    pub avg_duration_min: f64,
    pub avg_pickup_delay_min: f64,
    pub avg_delivery_delay_min: f64,
    pub on_time_delivery_rate: f64,
    pub daily_trend: Vec<DailyTrend>,
    pub courier_leaderboard: Vec<CourierPerformance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionQuery {
    pub date: NaiveDate,
    pub district: Option<String>,
    pub max_distance_km: f64,
    pub max_duration_min: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    LongDistance,
    LongDuration,
    Underutilized,
    UnassignedOrders,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub route_id: Option<Uuid>,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
}
