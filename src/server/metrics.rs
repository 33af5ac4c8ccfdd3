//! Prometheus metrics for the relay.

use std::time::Duration;

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};

use crate::relay::RelayError;

/// Per-process metric set with its own registry.
pub struct Metrics {
    registry: Registry,
    requests_total: IntCounterVec,
    provider_errors_total: IntCounterVec,
    request_duration: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("relay_requests_total", "Total generate-question requests"),
            &["outcome"], // ok, invalid, provider_error, body_rejected
        )?;

        let provider_errors_total = IntCounterVec::new(
            Opts::new("relay_provider_errors_total", "Total completion provider failures"),
            &["kind"],
        )?;

        let request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "relay_request_duration_seconds",
                "generate-question latency in seconds",
            )
            .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(provider_errors_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            provider_errors_total,
            request_duration,
        })
    }

    /// Record the outcome of one generate-question call.
    pub fn observe<T>(&self, outcome: &Result<T, RelayError>, elapsed: Duration) {
        self.request_duration.observe(elapsed.as_secs_f64());

        let label = match outcome {
            Ok(_) => "ok",
            Err(RelayError::Validation) => "invalid",
            Err(RelayError::Provider(e)) => {
                self.provider_errors_total.with_label_values(&[e.kind()]).inc();
                "provider_error"
            }
        };
        self.requests_total.with_label_values(&[label]).inc();
    }

    /// Record a request whose body could not be read.
    pub fn observe_body_rejection(&self, elapsed: Duration) {
        self.request_duration.observe(elapsed.as_secs_f64());
        self.requests_total.with_label_values(&["body_rejected"]).inc();
    }

    /// Render the registry in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
