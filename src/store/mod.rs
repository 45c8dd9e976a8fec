//! In-memory transactional record store.
//!
//! Committed records live in `DashMap`s so readers never block. Writers go
//! through [`Transaction`], which holds the store-wide write lock, stages
//! every change locally and applies them only on [`Transaction::commit`].
//! Dropping a transaction without committing discards its staged writes.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::courier::Courier;
use crate::models::order::{DeliveryOrder, OrderStatus};
use crate::models::route::Route;

pub struct Store {
    couriers: DashMap<Uuid, Courier>,
    orders: DashMap<Uuid, DeliveryOrder>,
    routes: DashMap<Uuid, Route>,
    /// order id -> id of the non-terminal route whose leg references it
    open_claims: DashMap<Uuid, Uuid>,
    write_lock: Mutex<()>,
    tx_timeout: Duration,
}

impl Store {
    pub fn new(tx_timeout: Duration) -> Self {
        Self {
            couriers: DashMap::new(),
            orders: DashMap::new(),
            routes: DashMap::new(),
            open_claims: DashMap::new(),
            write_lock: Mutex::new(()),
            tx_timeout,
        }
    }

    pub async fn begin(&self) -> Result<Transaction<'_>, AppError> {
        let guard = tokio::time::timeout(self.tx_timeout, self.write_lock.lock())
            .await
            .map_err(|_| {
                AppError::Storage(format!(
                    "timed out after {:?} waiting for transaction lock",
                    self.tx_timeout
                ))
            })?;

        Ok(Transaction {
            store: self,
            _guard: guard,
            couriers: HashMap::new(),
            orders: HashMap::new(),
            routes: HashMap::new(),
            claims: HashMap::new(),
        })
    }

    pub async fn insert_courier(&self, courier: Courier) -> Result<Courier, AppError> {
        courier.location.validate()?;
        let mut tx = self.begin().await?;
        tx.put_courier(courier.clone());
        tx.commit();
        Ok(courier)
    }

    pub async fn insert_order(&self, order: DeliveryOrder) -> Result<DeliveryOrder, AppError> {
        order.pickup.validate()?;
        order.dropoff.validate()?;
        let mut tx = self.begin().await?;
        tx.put_order(order.clone());
        tx.commit();
        Ok(order)
    }

    /// Status changes driven by the order system (delivery, cancellation).
    pub async fn set_order_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<DeliveryOrder, AppError> {
        let mut tx = self.begin().await?;
        let mut order = tx
            .order(order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        order.status = status;
        tx.put_order(order.clone());
        tx.commit();
        Ok(order)
    }

    pub fn courier(&self, id: Uuid) -> Option<Courier> {
        self.couriers.get(&id).map(|entry| entry.value().clone())
    }

    pub fn order(&self, id: Uuid) -> Option<DeliveryOrder> {
        self.orders.get(&id).map(|entry| entry.value().clone())
    }

    pub fn route(&self, id: Uuid) -> Option<Route> {
        self.routes.get(&id).map(|entry| entry.value().clone())
    }

    pub fn couriers(&self) -> Vec<Courier> {
        let mut couriers: Vec<Courier> = self
            .couriers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        couriers.sort_by_key(|courier| courier.id);
        couriers
    }

    pub fn routes(&self) -> Vec<Route> {
        let mut routes: Vec<Route> = self
            .routes
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        routes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        routes
    }

    /// Confirmed orders for `date` not referenced by any open route, oldest first.
    pub fn find_unassigned_confirmed(
        &self,
        date: NaiveDate,
        district: Option<&str>,
    ) -> Vec<DeliveryOrder> {
        let mut orders: Vec<DeliveryOrder> = self
            .orders
            .iter()
            .filter(|entry| {
                let order = entry.value();
                order.status == OrderStatus::Confirmed
                    && order.delivery_date == date
                    && district.is_none_or(|d| order.district == d)
                    && !self.open_claims.contains_key(&order.id)
            })
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        orders
    }

    /// Available couriers, optionally narrowed to a single id.
    pub fn find_available(&self, courier_id: Option<Uuid>) -> Vec<Courier> {
        self.couriers()
            .into_iter()
            .filter(|courier| courier.available)
            .filter(|courier| courier_id.is_none_or(|id| courier.id == id))
            .collect()
    }

    pub fn courier_count(&self) -> usize {
        self.couriers.len()
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

pub struct Transaction<'a> {
    store: &'a Store,
    _guard: MutexGuard<'a, ()>,
    couriers: HashMap<Uuid, Courier>,
    orders: HashMap<Uuid, DeliveryOrder>,
    routes: HashMap<Uuid, Route>,
    /// `Some(route)` claims the order, `None` releases it.
    claims: HashMap<Uuid, Option<Uuid>>,
}

impl Transaction<'_> {
    pub fn courier(&self, id: Uuid) -> Option<Courier> {
        self.couriers
            .get(&id)
            .cloned()
            .or_else(|| self.store.courier(id))
    }

    pub fn order(&self, id: Uuid) -> Option<DeliveryOrder> {
        self.orders.get(&id).cloned().or_else(|| self.store.order(id))
    }

    pub fn route(&self, id: Uuid) -> Option<Route> {
        self.routes.get(&id).cloned().or_else(|| self.store.route(id))
    }

    pub fn claimed_by(&self, order_id: Uuid) -> Option<Uuid> {
        match self.claims.get(&order_id) {
            Some(staged) => *staged,
            None => self
                .store
                .open_claims
                .get(&order_id)
                .map(|entry| *entry.value()),
        }
    }

    pub fn put_courier(&mut self, courier: Courier) {
        self.couriers.insert(courier.id, courier);
    }

    pub fn put_order(&mut self, order: DeliveryOrder) {
        self.orders.insert(order.id, order);
    }

    pub fn put_route(&mut self, route: Route) {
        self.routes.insert(route.id, route);
    }

    /// Compare-and-set on the availability flag: fails with
    /// `CourierUnavailable` when claiming a courier that is already taken.
    pub fn claim_courier(&mut self, courier_id: Uuid) -> Result<Courier, AppError> {
        let mut courier = self
            .courier(courier_id)
            .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;
        if !courier.available {
            return Err(AppError::CourierUnavailable(courier_id));
        }
        courier.available = false;
        courier.updated_at = Utc::now();
        self.put_courier(courier.clone());
        Ok(courier)
    }

    pub fn release_courier(&mut self, courier_id: Uuid) -> Result<Courier, AppError> {
        let mut courier = self
            .courier(courier_id)
            .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;
        courier.available = true;
        courier.updated_at = Utc::now();
        self.put_courier(courier.clone());
        Ok(courier)
    }

    pub fn claim_order(&mut self, order_id: Uuid, route_id: Uuid) -> Result<(), AppError> {
        match self.claimed_by(order_id) {
            Some(owner) if owner != route_id => Err(AppError::OrderAlreadyRouted(order_id)),
            _ => {
                self.claims.insert(order_id, Some(route_id));
                Ok(())
            }
        }
    }

    pub fn release_order(&mut self, order_id: Uuid) {
        self.claims.insert(order_id, None);
    }

    pub fn commit(self) {
        let Transaction {
            store,
            _guard,
            couriers,
            orders,
            routes,
            claims,
        } = self;

        debug!(
            couriers = couriers.len(),
            orders = orders.len(),
            routes = routes.len(),
            claims = claims.len(),
            "committing transaction"
        );

        for (order_id, claim) in claims {
            match claim {
                Some(route_id) => {
                    store.open_claims.insert(order_id, route_id);
                }
                None => {
                    store.open_claims.remove(&order_id);
                }
            }
        }
        for (id, courier) in couriers {
            store.couriers.insert(id, courier);
        }
        for (id, order) in orders {
            store.orders.insert(id, order);
        }
        for (id, route) in routes {
            store.routes.insert(id, route);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::Store;
    use crate::error::AppError;
    use crate::models::courier::{Courier, GeoPoint};
    use crate::models::order::DeliveryOrder;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn order(district: &str) -> DeliveryOrder {
        DeliveryOrder::confirmed(
            GeoPoint::new(-1.28, 36.82),
            GeoPoint::new(-1.29, 36.83),
            district,
            date(),
        )
    }

    #[tokio::test]
    async fn dropped_transaction_leaves_no_trace() {
        let store = Store::new(Duration::from_secs(1));
        let courier = store
            .insert_courier(Courier::new("Amina", GeoPoint::new(-1.28, 36.82), 4.5))
            .await
            .unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.claim_courier(courier.id).unwrap();
            tx.put_order(order("westlands"));
        }

        assert!(store.courier(courier.id).unwrap().available);
        assert_eq!(store.order_count(), 0);
    }

    #[tokio::test]
    async fn committed_claims_hide_orders_from_unassigned_pool() {
        let store = Store::new(Duration::from_secs(1));
        let first = store.insert_order(order("westlands")).await.unwrap();
        let second = store.insert_order(order("westlands")).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.claim_order(first.id, Uuid::new_v4()).unwrap();
        tx.commit();

        let pool = store.find_unassigned_confirmed(date(), Some("westlands"));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].id, second.id);
    }

    #[tokio::test]
    async fn claiming_an_order_held_by_another_route_conflicts() {
        let store = Store::new(Duration::from_secs(1));
        let o = store.insert_order(order("kilimani")).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.claim_order(o.id, Uuid::new_v4()).unwrap();
        tx.commit();

        let mut tx = store.begin().await.unwrap();
        assert!(matches!(
            tx.claim_order(o.id, Uuid::new_v4()),
            Err(AppError::OrderAlreadyRouted(id)) if id == o.id
        ));
    }

    #[tokio::test]
    async fn claiming_unavailable_courier_fails() {
        let store = Store::new(Duration::from_secs(1));
        let courier = store
            .insert_courier(Courier::new("Baraka", GeoPoint::new(-1.28, 36.82), 4.0))
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.claim_courier(courier.id).unwrap();
        assert!(matches!(
            tx.claim_courier(courier.id),
            Err(AppError::CourierUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn lock_wait_times_out_as_storage_error() {
        let store = Store::new(Duration::from_millis(20));
        let _held = store.begin().await.unwrap();

        assert!(matches!(store.begin().await, Err(AppError::Storage(_))));
    }

    #[tokio::test]
    async fn district_filter_narrows_pool() {
        let store = Store::new(Duration::from_secs(1));
        store.insert_order(order("westlands")).await.unwrap();
        store.insert_order(order("karen")).await.unwrap();

        assert_eq!(store.find_unassigned_confirmed(date(), None).len(), 2);
        assert_eq!(
            store.find_unassigned_confirmed(date(), Some("karen")).len(),
            1
        );
    }
}
