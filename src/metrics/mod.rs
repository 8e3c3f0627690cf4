//! Self-metrics
//!
//! Counters and latency histograms about the requests kromgo serves,
//! exposed on the health listener's `/metrics` path.

use std::time::Duration;

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::{Error, Result};

const NAMESPACE: &str = "kromgo";

/// Self-metrics held in a private registry.
pub struct ServeMetrics {
    registry: Registry,
    served: IntCounterVec,
    duration: HistogramVec,
    not_found: IntCounterVec,
    errors: IntCounterVec,
}

impl ServeMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let served = IntCounterVec::new(
            Opts::new("metrics_served_total", "Total number of metrics served").namespace(NAMESPACE),
            &["metric", "format", "style", "status"],
        )
        .map_err(metrics_error)?;
        let duration = HistogramVec::new(
            HistogramOpts::new("metric_duration_seconds", "Time taken to serve a metric")
                .namespace(NAMESPACE),
            &["metric", "format", "style"],
        )
        .map_err(metrics_error)?;
        let not_found = IntCounterVec::new(
            Opts::new("metrics_not_found_total", "Requests for metrics missing from the configuration")
                .namespace(NAMESPACE),
            &["metric"],
        )
        .map_err(metrics_error)?;
        let errors = IntCounterVec::new(
            Opts::new("metric_errors_total", "Errors encountered while serving metrics")
                .namespace(NAMESPACE),
            &["metric", "error"],
        )
        .map_err(metrics_error)?;

        registry.register(Box::new(served.clone())).map_err(metrics_error)?;
        registry.register(Box::new(duration.clone())).map_err(metrics_error)?;
        registry.register(Box::new(not_found.clone())).map_err(metrics_error)?;
        registry.register(Box::new(errors.clone())).map_err(metrics_error)?;

        Ok(Self {
            registry,
            served,
            duration,
            not_found,
            errors,
        })
    }

    /// Record a finished request.
    pub fn observe_request(&self, metric: &str, format: &str, style: &str, status: u16, elapsed: Duration) {
        let status = status.to_string();
        self.served
            .with_label_values(&[metric, format, style, status.as_str()])
            .inc();
        self.duration
            .with_label_values(&[metric, format, style])
            .observe(elapsed.as_secs_f64());
    }

    pub fn inc_not_found(&self, metric: &str) {
        self.not_found.with_label_values(&[metric]).inc();
    }

    pub fn inc_error(&self, metric: &str, kind: &str) {
        self.errors.with_label_values(&[metric, kind]).inc();
    }

    /// Prometheus text exposition and its content type.
    pub fn encode(&self) -> Result<(String, Vec<u8>)> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        Ok((encoder.format_type().to_string(), buffer))
    }
}

impl std::fmt::Debug for ServeMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServeMetrics").finish_non_exhaustive()
    }
}

fn metrics_error(err: prometheus::Error) -> Error {
    Error::Internal(format!("metrics: {}", err))
}
