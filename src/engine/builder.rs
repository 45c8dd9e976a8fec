use tracing::debug;

use crate::engine::sequencer::sequence;
use crate::error::AppError;
use crate::models::courier::Courier;
use crate::models::order::DeliveryOrder;

#[derive(Debug, Clone)]
pub struct RoutePlan {
    pub courier: Courier,
    pub orders: Vec<DeliveryOrder>,
    pub total_distance_km: f64,
    pub estimated_minutes: u32,
}

#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub plans: Vec<RoutePlan>,
    pub unassigned: usize,
}

/// Splits the order pool across couriers, best-rated first.
///
/// `orders` is expected oldest-first; each courier takes the next
/// `max_orders_per_courier` orders from the front of what is left. Planning
/// only, nothing is written.
pub fn build(
    orders: Vec<DeliveryOrder>,
    mut couriers: Vec<Courier>,
    max_orders_per_courier: usize,
) -> Result<BuildOutcome, AppError> {
    if orders.is_empty() {
        return Err(AppError::NoOrdersAvailable);
    }
    if couriers.is_empty() {
        return Err(AppError::NoCouriersAvailable);
    }
    if max_orders_per_courier == 0 {
        return Err(AppError::BadRequest(
            "max_orders_per_courier must be > 0".to_string(),
        ));
    }

    // stable: equal ratings keep their input order
    couriers.sort_by(|a, b| b.rating.total_cmp(&a.rating));

    let mut remaining = orders.into_iter();
    let mut plans = Vec::new();

    for courier in couriers {
        let batch: Vec<DeliveryOrder> = remaining.by_ref().take(max_orders_per_courier).collect();
        if batch.is_empty() {
            break;
        }

        let sequenced = sequence(batch, &courier.location)?;
        debug!(
            courier_id = %courier.id,
            orders = sequenced.orders.len(),
            distance_km = sequenced.total_distance_km,
            "courier batch sequenced"
        );

        plans.push(RoutePlan {
            courier,
            orders: sequenced.orders,
            total_distance_km: sequenced.total_distance_km,
            estimated_minutes: sequenced.estimated_minutes,
        });
    }

    Ok(BuildOutcome {
        plans,
        unassigned: remaining.count(),
    })
}
