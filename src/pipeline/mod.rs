//! Request Pipeline
//!
//! Resolves one metric request to a rendered response.
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌────────────┐   ┌────────┐
//! │ResolveMetric │──▶│ ExecuteQuery │──▶│ ExtractValue │──▶│ MatchColor │──▶│ Render │
//! └──────┬───────┘   └──────┬───────┘   └──────┬───────┘   └─────┬──────┘   └───┬────┘
//!        │                  │                  │                 │              │
//!        └──────────────────┴────────┬─────────┴─────────────────┴──────────────┘
//!                                    ▼
//!                         ┌─────────────────────┐
//!                         │ Error (JSON body)   │
//!                         └─────────────────────┘
//! ```
//!
//! One backend call per request, no retries. No data and a missing label
//! are successful responses, everything else that fails ends in a
//! structured error body.

pub mod colors;
pub mod extract;
pub mod render;
pub mod threshold;

mod proptest;

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, warn};

use crate::catalog::MetricCatalog;
use crate::domain::ports::{BadgeRenderer, BadgeStyle, QueryBackend};
use crate::error::{Error, Result};
use crate::metrics::ServeMetrics;

pub use render::{
    EndpointResponse, RenderedResponse, ResolvedDisplay, ResponseFormat, ResponseRenderer,
    CONTENT_TYPE_JSON, CONTENT_TYPE_SVG, LABEL_NOT_FOUND_MESSAGE, NO_DATA_MESSAGE,
};

/// Label used in self-metrics for names missing from the catalog.
pub const UNKNOWN_METRIC: &str = "unknown";

// =============================================================================
// Request
// =============================================================================

/// A parsed metric request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRequest {
    pub metric: String,
    pub format: ResponseFormat,
    pub style: BadgeStyle,
}

impl MetricRequest {
    /// Build from raw `format` and `style` parameter values.
    pub fn new(metric: impl Into<String>, format: &str, style: &str) -> Self {
        Self {
            metric: metric.into(),
            format: ResponseFormat::parse(format),
            style: BadgeStyle::parse(style),
        }
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Serves metric requests against a catalog and a query backend.
pub struct MetricPipeline {
    catalog: Arc<MetricCatalog>,
    backend: Arc<dyn QueryBackend>,
    renderer: ResponseRenderer,
    metrics: Arc<ServeMetrics>,
}

impl MetricPipeline {
    pub fn new(
        catalog: Arc<MetricCatalog>,
        backend: Arc<dyn QueryBackend>,
        badge_renderer: Option<Arc<dyn BadgeRenderer>>,
        metrics: Arc<ServeMetrics>,
    ) -> Self {
        Self {
            catalog,
            backend,
            renderer: ResponseRenderer::new(badge_renderer),
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<ServeMetrics> {
        &self.metrics
    }

    /// Name to use as a self-metric label for `metric`.
    pub fn metric_label<'a>(&self, metric: &'a str) -> &'a str {
        if self.catalog.contains(metric) {
            metric
        } else {
            UNKNOWN_METRIC
        }
    }

    /// Run the pipeline. Never fails: errors become error bodies.
    pub async fn handle(&self, request: &MetricRequest) -> RenderedResponse {
        match self.process(request).await {
            Ok(response) => response,
            Err(err) => self.fail(request, err),
        }
    }

    async fn process(&self, request: &MetricRequest) -> Result<RenderedResponse> {
        let metric = self
            .catalog
            .get(&request.metric)
            .ok_or_else(|| Error::MetricNotConfigured(request.metric.clone()))?;

        let outcome = self.backend.execute(&metric.query, Utc::now()).await?;

        for warning in &outcome.warnings {
            warn!(warning = %warning, "Encountered warnings while executing metric query");
        }
        debug!(
            result_type = outcome.result.result_type(),
            series = outcome.result.series_count(),
            "Query result received"
        );

        if request.format == ResponseFormat::Raw {
            return self.renderer.raw(&outcome);
        }

        let display = match render::resolve_display(metric, &outcome.result) {
            Ok(display) => display,
            Err(Error::LabelNotFound { label }) => {
                warn!(label = %label, "Label not found in query result");
                ResolvedDisplay::label_not_found()
            }
            Err(err) => return Err(err),
        };

        self.renderer
            .display(metric, &display, request.format, request.style)
    }

    fn fail(&self, request: &MetricRequest, err: Error) -> RenderedResponse {
        match &err {
            Error::MetricNotConfigured(_) => {
                warn!("Metric not found");
                self.metrics.inc_not_found(&request.metric);
            }
            _ => error!(error = %err, "Failed to serve metric"),
        }

        self.metrics
            .inc_error(self.metric_label(&request.metric), err.metric_kind());

        RenderedResponse::error(&request.metric, err.public_message(), err.status())
    }
}

impl std::fmt::Debug for MetricPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricPipeline")
            .field("metrics", &self.catalog.len())
            .field("renderer", &self.renderer)
            .finish()
    }
}
