use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub requests_created_total: IntCounter,
    pub requests_stored: IntGauge,
    pub transitions_total: IntCounterVec,
    pub access_denied_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_created_total =
            IntCounter::new("requests_created_total", "Service requests submitted")?;

        let requests_stored = IntGauge::new(
            "requests_stored",
            "Service requests currently held in the store",
        )?;

        let transitions_total = IntCounterVec::new(
            Opts::new(
                "transitions_total",
                "Lifecycle transitions attempted, by event and outcome",
            ),
            &["event", "outcome"],
        )?;

        let access_denied_total = IntCounterVec::new(
            Opts::new("access_denied_total", "Calls refused by the access gate"),
            &["operation"],
        )?;

        registry.register(Box::new(requests_created_total.clone()))?;
        registry.register(Box::new(requests_stored.clone()))?;
        registry.register(Box::new(transitions_total.clone()))?;
        registry.register(Box::new(access_denied_total.clone()))?;

        Ok(Self {
            registry,
            requests_created_total,
            requests_stored,
            transitions_total,
            access_denied_total,
        })
    }

    pub fn record_transition(&self, event: &str, succeeded: bool) {
        let outcome = if succeeded { "success" } else { "rejected" };
        self.transitions_total
            .with_label_values(&[event, outcome])
            .inc();
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
