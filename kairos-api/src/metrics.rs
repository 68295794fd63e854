use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

/// Counters exposed on /metrics. Cloning shares the underlying atomics.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub holds_created: IntCounter,
    pub hold_conflicts: IntCounter,
    pub bookings_committed: IntCounter,
    pub holds_swept: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let holds_created = IntCounter::new(
            "kairos_holds_created_total",
            "Slot holds successfully created",
        )
        .expect("valid metric definition");
        let hold_conflicts = IntCounter::new(
            "kairos_hold_conflicts_total",
            "Hold attempts rejected because the slot was taken",
        )
        .expect("valid metric definition");
        let bookings_committed = IntCounter::new(
            "kairos_bookings_committed_total",
            "Holds promoted to durable bookings",
        )
        .expect("valid metric definition");
        let holds_swept = IntCounter::new(
            "kairos_holds_swept_total",
            "Expired hold entries removed by the background sweeper",
        )
        .expect("valid metric definition");

        registry
            .register(Box::new(holds_created.clone()))
            .expect("metric registers once");
        registry
            .register(Box::new(hold_conflicts.clone()))
            .expect("metric registers once");
        registry
            .register(Box::new(bookings_committed.clone()))
            .expect("metric registers once");
        registry
            .register(Box::new(holds_swept.clone()))
            .expect("metric registers once");

        Self {
            registry,
            holds_created,
            hold_conflicts,
            bookings_committed,
            holds_swept,
        }
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
