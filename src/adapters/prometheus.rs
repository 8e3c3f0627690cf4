//! Prometheus Query Adapter
//!
//! Implements the `QueryBackend` port against the Prometheus HTTP API
//! (`/api/v1/query`).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::value::RawValue;
use tracing::{debug, instrument};

use crate::domain::ports::QueryBackend;
use crate::domain::query::{QueryOutcome, QueryResult};
use crate::error::{Error, Result};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Prometheus client
#[derive(Debug, Clone)]
pub struct PrometheusConfig {
    /// Prometheus server URL
    pub prometheus_url: String,

    /// Query timeout
    pub query_timeout: Duration,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            prometheus_url: "http://localhost:9090".to_string(),
            query_timeout: Duration::from_secs(30),
        }
    }
}

// =============================================================================
// Prometheus Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct PrometheusResponse {
    status: String,
    #[serde(default)]
    data: Option<PrometheusData>,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PrometheusData {
    #[serde(rename = "resultType")]
    result_type: String,
    #[serde(default)]
    result: Option<Box<RawValue>>,
}

impl PrometheusResponse {
    fn error_message(&self) -> String {
        match (&self.error_type, &self.error) {
            (Some(kind), Some(msg)) => format!("{}: {}", kind, msg),
            (None, Some(msg)) => msg.clone(),
            (Some(kind), None) => kind.clone(),
            (None, None) => format!("Prometheus returned status: {}", self.status),
        }
    }

    fn into_outcome(self) -> Result<QueryOutcome> {
        if self.status != "success" {
            return Err(Error::PrometheusQuery(self.error_message()));
        }

        let outcome = match self.data {
            Some(PrometheusData {
                result_type,
                result: Some(raw),
            }) => QueryOutcome::new(QueryResult::from_prometheus(&result_type, raw.get())?)
                .with_raw(raw.get().to_owned()),
            _ => QueryOutcome::new(QueryResult::Empty),
        };

        Ok(outcome.with_warnings(self.warnings))
    }
}

// =============================================================================
// Prometheus Client
// =============================================================================

/// Runs instant queries against Prometheus
pub struct PrometheusClient {
    config: PrometheusConfig,
    client: Client,
}

impl PrometheusClient {
    /// Create a new Prometheus client
    pub fn new(config: PrometheusConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.query_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Check if Prometheus is reachable
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/-/healthy", self.config.prometheus_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Error::PrometheusConnection)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::PrometheusQuery(format!(
                "Health check failed: {}",
                response.status()
            )))
        }
    }

    fn query_url(&self, query: &str, at: DateTime<Utc>) -> String {
        format!(
            "{}/api/v1/query?query={}&time={}",
            self.config.prometheus_url,
            urlencoding::encode(query),
            format_timestamp(at)
        )
    }
}

impl std::fmt::Debug for PrometheusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusClient")
            .field("prometheus_url", &self.config.prometheus_url)
            .field("query_timeout", &self.config.query_timeout)
            .finish()
    }
}

#[async_trait]
impl QueryBackend for PrometheusClient {
    async fn execute(&self, query: &str, at: DateTime<Utc>) -> Result<QueryOutcome> {
        let url = self.query_url(query, at);

        debug!("Querying Prometheus: {}", query);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Error::PrometheusConnection)?;

        let status = response.status();
        let body = response.bytes().await.map_err(Error::PrometheusConnection)?;

        // Prometheus reports query errors (400/422/503) with a JSON envelope.
        match serde_json::from_slice::<PrometheusResponse>(&body) {
            Ok(envelope) => envelope.into_outcome(),
            Err(_) if !status.is_success() => Err(Error::PrometheusQuery(format!(
                "Query failed with status: {}",
                status
            ))),
            Err(e) => Err(Error::PrometheusResponseParse(e.to_string())),
        }
    }
}

/// Unix seconds with millisecond precision, as Prometheus expects.
fn format_timestamp(at: DateTime<Utc>) -> String {
    format!("{}.{:03}", at.timestamp(), at.timestamp_subsec_millis())
}
