//! Prometheus metrics for the HTTP API.
//!
//! [`RpcMetrics`] owns a dedicated [`Registry`] that the `/metrics` endpoint
//! encodes into the Prometheus text exposition format.

use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry, Encoder,
    IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

pub struct RpcMetrics {
    pub registry: Registry,
    /// Sessions created.
    pub challenges_issued: IntCounter,
    /// Verification attempts, labelled by outcome.
    pub verifications: IntCounterVec,
}

impl RpcMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let challenges_issued = register_int_counter_with_registry!(
            Opts::new(
                "tokengate_challenges_issued_total",
                "Verification sessions created"
            ),
            registry
        )
        .expect("failed to register challenges_issued counter");

        let verifications = register_int_counter_vec_with_registry!(
            Opts::new(
                "tokengate_verifications_total",
                "Signature verification attempts by outcome"
            ),
            &["outcome"],
            registry
        )
        .expect("failed to register verifications counter");

        Self {
            registry,
            challenges_issued,
            verifications,
        }
    }

    /// Encode every metric in the text exposition format.
    pub fn encode(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for RpcMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_labelled_counters() {
        let metrics = RpcMetrics::new();
        metrics.challenges_issued.inc();
        metrics.verifications.with_label_values(&["verified"]).inc();

        let text = metrics.encode();
        assert!(text.contains("tokengate_challenges_issued_total 1"));
        assert!(text.contains("tokengate_verifications_total{outcome=\"verified\"} 1"));
    }
}
