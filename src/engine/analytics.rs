//! Read-only rollups over persisted routes. Empty selections produce zeroed
//! aggregates, never errors.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::analytics::{
    AnalyticsFilter, AnalyticsSummary, CourierPerformance, DailyTrend, StatusCounts, Suggestion,
    SuggestionKind, SuggestionQuery,
};
use crate::models::route::{Route, RouteStatus};
use crate::state::AppState;

pub fn get_analytics(state: &AppState, filter: &AnalyticsFilter) -> AnalyticsSummary {
    summarize(&state.store.routes(), filter)
}

pub fn get_suggestions(state: &AppState, query: &SuggestionQuery) -> Vec<Suggestion> {
    let unassigned = state
        .store
        .find_unassigned_confirmed(query.date, query.district.as_deref())
        .len();
    suggest(
        &state.store.routes(),
        unassigned,
        query,
        state.config.min_orders_per_route,
    )
}

fn in_scope(route: &Route, filter: &AnalyticsFilter) -> bool {
    route.route_date >= filter.from
        && route.route_date <= filter.to
        && filter
            .district
            .as_deref()
            .is_none_or(|district| route.district.as_deref() == Some(district))
        && filter
            .courier_id
            .is_none_or(|courier_id| route.courier_id == courier_id)
}

fn delay_min(actual: DateTime<Utc>, eta: DateTime<Utc>) -> f64 {
    (actual - eta).num_seconds() as f64 / 60.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[derive(Default)]
struct CourierTally {
    routes: usize,
    completed: usize,
    orders: usize,
    distance_km: f64,
    delivery_delays: Vec<f64>,
}

pub fn summarize(routes: &[Route], filter: &AnalyticsFilter) -> AnalyticsSummary {
    let selected: Vec<&Route> = routes.iter().filter(|route| in_scope(route, filter)).collect();
    if selected.is_empty() {
        return AnalyticsSummary::default();
    }

    let mut counts = StatusCounts::default();
    let mut pickup_delays = Vec::new();
    let mut delivery_delays = Vec::new();
    let mut on_time = 0usize;
    let mut daily: BTreeMap<_, DailyTrend> = BTreeMap::new();
    let mut couriers: HashMap<Uuid, CourierTally> = HashMap::new();
    let mut total_orders = 0usize;
    let mut total_distance = 0.0;
    let mut total_duration = 0.0;

    for route in &selected {
        match route.status {
            RouteStatus::Planned => counts.planned += 1,
            RouteStatus::Active => counts.active += 1,
            RouteStatus::Completed => counts.completed += 1,
            RouteStatus::Cancelled => counts.cancelled += 1,
        }
        let completed = route.status == RouteStatus::Completed;

        total_orders += route.legs.len();
        total_distance += route.total_distance_km;
        total_duration += f64::from(route.estimated_duration_min);

        let tally = couriers.entry(route.courier_id).or_default();
        tally.routes += 1;
        tally.orders += route.legs.len();
        tally.distance_km += route.total_distance_km;
        if completed {
            tally.completed += 1;
        }

        for leg in &route.legs {
            if let Some(picked) = leg.picked_up_at {
                pickup_delays.push(delay_min(picked, leg.pickup_eta));
            }
            if let Some(delivered) = leg.delivered_at {
                let delay = delay_min(delivered, leg.delivery_eta);
                if delivered <= leg.delivery_eta {
                    on_time += 1;
                }
                delivery_delays.push(delay);
                tally.delivery_delays.push(delay);
            }
        }

        let day = daily.entry(route.route_date).or_insert_with(|| DailyTrend {
            date: route.route_date,
            routes: 0,
            completed: 0,
            orders: 0,
            total_distance_km: 0.0,
        });
        day.routes += 1;
        day.orders += route.legs.len();
        day.total_distance_km += route.total_distance_km;
        if completed {
            day.completed += 1;
        }
    }

    let mut leaderboard: Vec<CourierPerformance> = couriers
        .into_iter()
        .map(|(courier_id, tally)| CourierPerformance {
            courier_id,
            routes: tally.routes,
            completed: tally.completed,
            orders: tally.orders,
            total_distance_km: tally.distance_km,
            avg_delivery_delay_min: mean(&tally.delivery_delays),
        })
        .collect();
    leaderboard.sort_by(|a, b| {
        b.completed
            .cmp(&a.completed)
            .then(b.orders.cmp(&a.orders))
            .then(a.courier_id.cmp(&b.courier_id))
    });

    let total_routes = selected.len();
    AnalyticsSummary {
        total_routes,
        completion_rate: ratio(counts.completed, counts.completed + counts.cancelled),
        status_counts: counts,
        total_orders,
        avg_orders_per_route: total_orders as f64 / total_routes as f64,
        avg_distance_km: total_distance / total_routes as f64,
        avg_duration_min: total_duration / total_routes as f64,
        avg_pickup_delay_min: mean(&pickup_delays),
        avg_delivery_delay_min: mean(&delivery_delays),
        on_time_delivery_rate: ratio(on_time, delivery_delays.len()),
        daily_trend: daily.into_values().collect(),
        courier_leaderboard: leaderboard,
    }
}

pub fn suggest(
    routes: &[Route],
    unassigned_orders: usize,
    query: &SuggestionQuery,
    min_orders_per_route: usize,
) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    let candidates = routes.iter().filter(|route| {
        route.route_date == query.date
            && route.status != RouteStatus::Cancelled
            && query
                .district
                .as_deref()
                .is_none_or(|district| route.district.as_deref() == Some(district))
    });

    for route in candidates {
        if route.total_distance_km > query.max_distance_km {
            suggestions.push(Suggestion {
                kind: SuggestionKind::LongDistance,
                route_id: Some(route.id),
                value: route.total_distance_km,
                threshold: query.max_distance_km,
                message: format!(
                    "Route covers {:.1} km, above the {:.1} km limit; consider splitting it",
                    route.total_distance_km, query.max_distance_km
                ),
            });
        }
        if route.estimated_duration_min > query.max_duration_min {
            suggestions.push(Suggestion {
                kind: SuggestionKind::LongDuration,
                route_id: Some(route.id),
                value: f64::from(route.estimated_duration_min),
                threshold: f64::from(query.max_duration_min),
                message: format!(
                    "Route is estimated at {} min, above the {} min limit",
                    route.estimated_duration_min, query.max_duration_min
                ),
            });
        }
        if route.legs.len() < min_orders_per_route {
            suggestions.push(Suggestion {
                kind: SuggestionKind::Underutilized,
                route_id: Some(route.id),
                value: route.legs.len() as f64,
                threshold: min_orders_per_route as f64,
                message: format!(
                    "Route carries only {} order(s); consider merging it with a nearby route",
                    route.legs.len()
                ),
            });
        }
    }

    if unassigned_orders > 0 {
        suggestions.push(Suggestion {
            kind: SuggestionKind::UnassignedOrders,
            route_id: None,
            value: unassigned_orders as f64,
            threshold: 0.0,
            message: format!("{unassigned_orders} confirmed order(s) still have no route"),
        });
    }

    suggestions
}
