//! Greedy nearest-neighbor sequencing of a courier's batch.
//!
//! This is a heuristic, not a TSP optimum. From the current position it
//! always visits the closest remaining pickup next, then continues from that
//! order's dropoff. Ties go to the order that came first in the input, so the
//! output is a deterministic permutation of the input.

use crate::error::AppError;
use crate::geo::distance_m;
use crate::models::courier::GeoPoint;
use crate::models::order::DeliveryOrder;

/// Speed proxy of 0.5 km/min.
const MINUTES_PER_KM: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct SequencedBatch {
    pub orders: Vec<DeliveryOrder>,
    pub total_distance_km: f64,
    pub estimated_minutes: u32,
}

pub fn sequence(orders: Vec<DeliveryOrder>, start: &GeoPoint) -> Result<SequencedBatch, AppError> {
    let mut remaining = orders;
    let mut ordered = Vec::with_capacity(remaining.len());
    let mut current = *start;
    let mut total_distance_km = 0.0;
    let mut estimated_minutes = 0u32;

    while !remaining.is_empty() {
        let mut best_index = 0;
        let mut best_distance_m = f64::INFINITY;

        for (index, order) in remaining.iter().enumerate() {
            let candidate = distance_m(&current, &order.pickup)?;
            // strict: earlier index wins ties
            if candidate < best_distance_m {
                best_index = index;
                best_distance_m = candidate;
            }
        }

        let next = remaining.remove(best_index);
        let delivery_m = distance_m(&next.pickup, &next.dropoff)?;
        let leg_km = (best_distance_m + delivery_m) / 1000.0;

        total_distance_km += leg_km;
        estimated_minutes += leg_minutes(leg_km);
        current = next.dropoff;
        ordered.push(next);
    }

    Ok(SequencedBatch {
        orders: ordered,
        total_distance_km,
        estimated_minutes,
    })
}

/// Rounded up per leg, not on the route total.
fn leg_minutes(leg_km: f64) -> u32 {
    (leg_km * MINUTES_PER_KM).ceil() as u32
}
