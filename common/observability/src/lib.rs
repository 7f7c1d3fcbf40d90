use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters for token issuance and per-request gate decisions.
#[derive(Clone)]
pub struct AuthMetrics {
    pub registry: Registry,
    pub tokens_issued: IntCounter,
    pub gate_decisions: IntCounterVec,
    pub validation_failures: IntCounterVec,
}

impl AuthMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let tokens_issued = IntCounter::new(
            "auth_tokens_issued_total",
            "Signed access tokens issued",
        )?;
        let gate_decisions = IntCounterVec::new(
            Opts::new(
                "auth_gate_decisions_total",
                "Authorization gate decisions grouped by outcome",
            ),
            &["outcome"],
        )?;
        let validation_failures = IntCounterVec::new(
            Opts::new(
                "auth_validation_failures_total",
                "Rejected requests grouped by rejection reason",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(tokens_issued.clone()))?;
        registry.register(Box::new(gate_decisions.clone()))?;
        registry.register(Box::new(validation_failures.clone()))?;
        Ok(Self { registry, tokens_issued, gate_decisions, validation_failures })
    }

    pub fn token_issued(&self) {
        self.tokens_issued.inc();
    }

    pub fn authorized(&self) {
        self.gate_decisions.with_label_values(&["authorized"]).inc();
    }

    pub fn rejected(&self, reason: &str) {
        self.gate_decisions.with_label_values(&["rejected"]).inc();
        self.validation_failures.with_label_values(&[reason]).inc();
    }

    /// Prometheus text exposition of every registered counter.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }
}
