//! Error types for kromgo

use hyper::StatusCode;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading configuration or serving a metric
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metric definition violates an invariant
    #[error("Invalid metric definition at index {index}: {reason}")]
    InvalidMetric { index: usize, reason: String },

    /// Two metric definitions share a name and duplicates are rejected
    #[error("Duplicate metric name: {0}")]
    DuplicateMetric(String),

    // =========================================================================
    // Request Errors
    // =========================================================================
    /// Requested metric has no catalog entry
    #[error("Metric not configured: {0}")]
    MetricNotConfigured(String),

    /// Prometheus connection error
    #[error("Prometheus connection error: {0}")]
    PrometheusConnection(#[source] reqwest::Error),

    /// Prometheus query error
    #[error("Prometheus query error: {0}")]
    PrometheusQuery(String),

    /// Prometheus response parse error
    #[error("Failed to parse Prometheus response: {0}")]
    PrometheusResponseParse(String),

    /// Configured label is absent from the first series
    #[error("label '{label}' not found in the query result")]
    LabelNotFound { label: String },

    /// Response could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Badge format requested without a badge renderer
    #[error("Badge rendering is not configured")]
    BadgeRendererMissing,

    /// Badge renderer failed
    #[error("Badge rendering failed: {0}")]
    BadgeRender(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status code a request failure is downgraded to.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::MetricNotConfigured(_) => StatusCode::NOT_FOUND,
            Error::LabelNotFound { .. } => StatusCode::OK,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the response body. Never carries upstream detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            Error::MetricNotConfigured(_) => "Not Found",
            Error::PrometheusConnection(_)
            | Error::PrometheusQuery(_)
            | Error::PrometheusResponseParse(_) => "Query Error",
            Error::LabelNotFound { .. } => "label not found",
            Error::Serialization(_) => "Serialization Error",
            Error::BadgeRendererMissing | Error::BadgeRender(_) => "Badge Generation Error",
            _ => "Internal Error",
        }
    }

    /// Error kind recorded in the `kromgo_metric_errors_total` counter.
    pub fn metric_kind(&self) -> &'static str {
        match self {
            Error::MetricNotConfigured(_) => "Not Found",
            Error::BadgeRendererMissing | Error::BadgeRender(_) => "Badge Generation Error",
            _ => "Processing Error",
        }
    }
}
