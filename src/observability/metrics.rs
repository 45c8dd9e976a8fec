use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub routes_planned_total: IntCounterVec,
    pub plan_latency_seconds: Histogram,
    pub route_transitions_total: IntCounterVec,
    pub reassignments_total: IntCounterVec,
    pub notifications_total: IntCounterVec,
    pub unassigned_orders: IntGauge,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let routes_planned_total = IntCounterVec::new(
            Opts::new("routes_planned_total", "Route plans persisted, by outcome"),
            &["outcome"],
        )
        .expect("valid routes_planned_total metric");

        let plan_latency_seconds = Histogram::with_opts(HistogramOpts::new(
            "plan_latency_seconds",
            "Latency of plan-and-persist runs in seconds",
        ))
        .expect("valid plan_latency_seconds metric");

        let route_transitions_total = IntCounterVec::new(
            Opts::new("route_transitions_total", "Route status transitions, by target"),
            &["status"],
        )
        .expect("valid route_transitions_total metric");

        let reassignments_total = IntCounterVec::new(
            Opts::new("reassignments_total", "Route reassignments, by outcome"),
            &["outcome"],
        )
        .expect("valid reassignments_total metric");

        let notifications_total = IntCounterVec::new(
            Opts::new("notifications_total", "Courier notifications, by outcome"),
            &["outcome"],
        )
        .expect("valid notifications_total metric");

        let unassigned_orders = IntGauge::new(
            "unassigned_orders",
            "Confirmed orders left without a route by the last planning run",
        )
        .expect("valid unassigned_orders metric");

        registry
            .register(Box::new(routes_planned_total.clone()))
            .expect("register routes_planned_total");
        registry
            .register(Box::new(plan_latency_seconds.clone()))
            .expect("register plan_latency_seconds");
        registry
            .register(Box::new(route_transitions_total.clone()))
            .expect("register route_transitions_total");
        registry
            .register(Box::new(reassignments_total.clone()))
            .expect("register reassignments_total");
        registry
            .register(Box::new(notifications_total.clone()))
            .expect("register notifications_total");
        registry
            .register(Box::new(unassigned_orders.clone()))
            .expect("register unassigned_orders");

        Self {
            registry,
            routes_planned_total,
            plan_latency_seconds,
            route_transitions_total,
            reassignments_total,
            notifications_total,
            unassigned_orders,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
