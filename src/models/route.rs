use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Planned,
    Active,
    Completed,
    Cancelled,
}

impl RouteStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RouteStatus::Completed | RouteStatus::Cancelled)
    }

    pub fn can_transition_to(self, target: RouteStatus) -> bool {
        matches!(
            (self, target),
            (RouteStatus::Planned, RouteStatus::Active)
                | (RouteStatus::Active, RouteStatus::Completed)
                | (RouteStatus::Planned, RouteStatus::Cancelled)
                | (RouteStatus::Active, RouteStatus::Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RouteStatus::Planned => "planned",
            RouteStatus::Active => "active",
            RouteStatus::Completed => "completed",
            RouteStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteLeg {
    pub route_id: Uuid,
    pub order_id: Uuid,
    /// 1-based, dense within the route.
    pub sequence: u32,
    pub pickup_eta: DateTime<Utc>,
    pub delivery_eta: DateTime<Utc>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reassignment {
    pub from_courier: Uuid,
    pub to_courier: Uuid,
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: Uuid,
    pub courier_id: Uuid,
    pub route_date: NaiveDate,
    pub district: Option<String>,
    pub vehicle_class: String,
    pub legs: Vec<RouteLeg>,
    pub total_distance_km: f64,
    pub estimated_duration_min: u32,
    pub status: RouteStatus,
    pub reassignments: Vec<Reassignment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Route {
    pub fn leg_mut(&mut self, order_id: Uuid) -> Option<&mut RouteLeg> {
        self.legs.iter_mut().find(|leg| leg.order_id == order_id)
    }

    pub fn order_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.legs.iter().map(|leg| leg.order_id)
    }

    pub fn summary(&self) -> RouteSummary {
        RouteSummary {
            id: self.id,
            courier_id: self.courier_id,
            status: self.status,
            order_count: self.legs.len(),
            total_distance_km: self.total_distance_km,
            estimated_duration_min: self.estimated_duration_min,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSummary {
    pub id: Uuid,
    pub courier_id: Uuid,
    pub status: RouteStatus,
    pub order_count: usize,
    pub total_distance_km: f64,
    pub estimated_duration_min: u32,
}

/// Broadcast to websocket subscribers after every committed route change.
#[derive(Debug, Clone, Serialize)]
pub struct RouteEvent {
    pub route_id: Uuid,
    pub courier_id: Uuid,
    pub status: RouteStatus,
    pub kind: &'static str,
    pub at: DateTime<Utc>,
}

impl RouteEvent {
    pub fn from_route(route: &Route, kind: &'static str) -> Self {
        Self {
            route_id: route.id,
            courier_id: route.courier_id,
            status: route.status,
            kind,
            at: route.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RouteStatus::*;

    #[test]
    fn terminal_states_have_no_exits() {
        for target in [Planned, Active, Completed, Cancelled] {
            assert!(!Completed.can_transition_to(target));
            assert!(!Cancelled.can_transition_to(target));
        }
    }

    #[test]
    fn self_transitions_are_rejected() {
        assert!(!Planned.can_transition_to(Planned));
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn planned_cannot_skip_to_completed() {
        assert!(!Planned.can_transition_to(Completed));
        assert!(Planned.can_transition_to(Active));
        assert!(Active.can_transition_to(Completed));
        assert!(Planned.can_transition_to(Cancelled));
        assert!(Active.can_transition_to(Cancelled));
    }
}
