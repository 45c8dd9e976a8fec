use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RouteAssigned,
    RouteReassignedFrom,
    RouteReassignedTo,
    RouteCancelled,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::RouteAssigned => "route_assigned",
            NotificationKind::RouteReassignedFrom => "route_reassigned_from",
            NotificationKind::RouteReassignedTo => "route_reassigned_to",
            NotificationKind::RouteCancelled => "route_cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Low,
    #[default]
    Normal,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: Uuid,
    pub message: String,
    pub kind: NotificationKind,
    pub priority: NotificationPriority,
}

impl Notification {
    pub fn new(recipient: Uuid, kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            recipient,
            message: message.into(),
            kind,
            priority: NotificationPriority::Normal,
        }
    }

    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }
}
