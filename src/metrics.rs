//! Prometheus metrics for admission decisions

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabel, EncodeLabelSet, LabelSetEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;

/// Outcome of a validated operation
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Outcome {
    /// Passed every rule and was handed to the next handler
    Admitted,
    /// A rule rejected the request
    Rejected,
    /// Validation could not complete (lookup or probe failure)
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Admitted => "admitted",
            Outcome::Rejected => "rejected",
            Outcome::Failed => "failed",
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ValidationLabels {
    pub operation: &'static str,
    pub outcome: Outcome,
}

impl EncodeLabelSet for ValidationLabels {
    fn encode(&self, encoder: &mut LabelSetEncoder) -> Result<(), std::fmt::Error> {
        ("operation", self.operation).encode(encoder.encode_label())?;
        ("outcome", self.outcome.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ReasonLabels {
    pub reason: &'static str,
}

impl EncodeLabelSet for ReasonLabels {
    fn encode(&self, encoder: &mut LabelSetEncoder) -> Result<(), std::fmt::Error> {
        ("reason", self.reason).encode(encoder.encode_label())?;
        Ok(())
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct OperationLabels {
    pub operation: &'static str,
}

impl EncodeLabelSet for OperationLabels {
    fn encode(&self, encoder: &mut LabelSetEncoder) -> Result<(), std::fmt::Error> {
        ("operation", self.operation).encode(encoder.encode_label())?;
        Ok(())
    }
}

pub struct Metrics {
    /// Validated requests by operation and outcome
    pub validations_total: Family<ValidationLabels, Counter>,
    /// Rejections by machine readable reason
    pub rejections_total: Family<ReasonLabels, Counter>,
    /// Time spent evaluating rules, including state reads and probes
    pub validation_duration_seconds: Family<OperationLabels, Histogram>,

    registry: Registry,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let validations_total = Family::<ValidationLabels, Counter>::default();
        registry.register(
            "dbaas_policy_validations",
            "Total number of validated requests",
            validations_total.clone(),
        );

        let rejections_total = Family::<ReasonLabels, Counter>::default();
        registry.register(
            "dbaas_policy_rejections",
            "Total number of rejected requests by reason",
            rejections_total.clone(),
        );

        let validation_duration_seconds =
            Family::<OperationLabels, Histogram>::new_with_constructor(|| {
                Histogram::new(exponential_buckets(0.001, 2.0, 15))
            });
        registry.register(
            "dbaas_policy_validation_duration_seconds",
            "Duration of request validation in seconds",
            validation_duration_seconds.clone(),
        );

        Self {
            validations_total,
            rejections_total,
            validation_duration_seconds,
            registry,
        }
    }

    pub fn record(&self, operation: &'static str, outcome: Outcome, duration_secs: f64) {
        self.validations_total
            .get_or_create(&ValidationLabels { operation, outcome })
            .inc();
        self.validation_duration_seconds
            .get_or_create(&OperationLabels { operation })
            .observe(duration_secs);
    }

    pub fn record_rejection(&self, reason: &'static str) {
        self.rejections_total
            .get_or_create(&ReasonLabels { reason })
            .inc();
    }

    /// Encode metrics to Prometheus text format
    ///
    /// Returns an empty string if encoding fails.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if let Err(e) = encode(&mut buffer, &self.registry) {
            tracing::error!(error = %e, "failed to encode metrics");
            return String::new();
        }
        buffer
    }
}
