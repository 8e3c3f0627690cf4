//! Response rendering
//!
//! Turns a resolved display message into one of the three response shapes:
//! the shields.io endpoint JSON, the raw query result, or an SVG badge.

use std::sync::Arc;

use bytes::Bytes;
use hyper::StatusCode;
use serde::Serialize;

use crate::catalog::MetricDefinition;
use crate::domain::ports::{BadgeRenderer, BadgeSpec, BadgeStyle};
use crate::domain::query::{format_sample_value, QueryOutcome, QueryResult};
use crate::error::{Error, Result};
use crate::pipeline::colors::resolve_hex;
use crate::pipeline::extract::{extract_label, extract_scalar};
use crate::pipeline::threshold::match_color;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_SVG: &str = "image/svg+xml";

/// Message shown when the query returned zero series.
pub const NO_DATA_MESSAGE: &str = "metric returned no data";

/// Message shown when the configured label is missing from the first series.
pub const LABEL_NOT_FOUND_MESSAGE: &str = "label not found";

// =============================================================================
// Request Shape
// =============================================================================

/// Requested response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Endpoint,
    Raw,
    Badge,
}

impl ResponseFormat {
    /// Parse the `format` query parameter. Unknown values mean endpoint.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "raw" => ResponseFormat::Raw,
            "badge" => ResponseFormat::Badge,
            _ => ResponseFormat::Endpoint,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::Endpoint => "endpoint",
            ResponseFormat::Raw => "raw",
            ResponseFormat::Badge => "badge",
        }
    }
}

impl std::fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Response Bodies
// =============================================================================

/// shields.io endpoint schema, also used for error bodies.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointResponse {
    pub schema_version: u8,
    pub label: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl EndpointResponse {
    pub fn new(label: impl Into<String>, message: impl Into<String>, color: &str) -> Self {
        Self {
            schema_version: 1,
            label: label.into(),
            message: message.into(),
            color: (!color.is_empty()).then(|| color.to_string()),
            is_error: false,
        }
    }

    pub fn error(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            schema_version: 1,
            label: label.into(),
            message: message.into(),
            color: None,
            is_error: true,
        }
    }
}

/// Bytes ready to be written as an HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Bytes,
}

impl RenderedResponse {
    pub fn ok(content_type: &'static str, body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            content_type,
            body: body.into(),
        }
    }

    /// Structured error body. Falls back to a static body if serialization fails.
    pub fn error(label: &str, message: &str, status: StatusCode) -> Self {
        let body = serde_json::to_vec(&EndpointResponse::error(label, message))
            .map(Bytes::from)
            .unwrap_or_else(|_| {
                Bytes::from_static(br#"{"schemaVersion":1,"label":"","message":"Internal Error","isError":true}"#)
            });
        Self {
            status,
            content_type: CONTENT_TYPE_JSON,
            body,
        }
    }
}

// =============================================================================
// Display Resolution
// =============================================================================

/// The message and symbolic color a metric resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDisplay {
    pub message: String,
    /// Empty when no threshold matched
    pub color: String,
}

impl ResolvedDisplay {
    pub fn no_data() -> Self {
        Self {
            message: NO_DATA_MESSAGE.to_string(),
            color: String::new(),
        }
    }

    pub fn label_not_found() -> Self {
        Self {
            message: LABEL_NOT_FOUND_MESSAGE.to_string(),
            color: String::new(),
        }
    }
}

/// Resolve the displayed message for `metric` from `result`.
///
/// Later steps override earlier ones: numeric value, configured label,
/// matched value override. Prefix and suffix wrap the final value.
///
/// A result with zero series short-circuits before any of these steps and
/// resolves to the bare [`NO_DATA_MESSAGE`]: no prefix, no suffix, no color,
/// and a configured label is not consulted.
pub fn resolve_display(metric: &MetricDefinition, result: &QueryResult) -> Result<ResolvedDisplay> {
    let value = extract_scalar(result);

    let mut display = match (value, result) {
        (Some(v), _) => format_sample_value(v),
        (None, QueryResult::String(sample)) => sample.1.clone(),
        (None, _) => return Ok(ResolvedDisplay::no_data()),
    };

    if let Some(label) = metric.display_label() {
        display = extract_label(result, label)?;
    }

    let matched = value.map(|v| match_color(&metric.colors, v));
    let color = match matched {
        Some(range) => {
            if !range.value_override.is_empty() {
                display = range.value_override;
            }
            range.color
        }
        None => String::new(),
    };

    Ok(ResolvedDisplay {
        message: format!("{}{}{}", metric.prefix, display, metric.suffix),
        color,
    })
}

// =============================================================================
// Renderer
// =============================================================================

/// Produces response bodies for each format.
#[derive(Clone, Default)]
pub struct ResponseRenderer {
    badge: Option<Arc<dyn BadgeRenderer>>,
}

impl ResponseRenderer {
    pub fn new(badge: Option<Arc<dyn BadgeRenderer>>) -> Self {
        Self { badge }
    }

    /// The backend's `data.result` byte for byte.
    pub fn raw(&self, outcome: &QueryOutcome) -> Result<RenderedResponse> {
        Ok(RenderedResponse::ok(CONTENT_TYPE_JSON, outcome.raw_json()?))
    }

    /// Endpoint JSON or SVG badge for a resolved display.
    pub fn display(
        &self,
        metric: &MetricDefinition,
        display: &ResolvedDisplay,
        format: ResponseFormat,
        style: BadgeStyle,
    ) -> Result<RenderedResponse> {
        let title = metric.display_title();

        match format {
            ResponseFormat::Badge => {
                let renderer = self.badge.as_ref().ok_or(Error::BadgeRendererMissing)?;
                let svg = renderer.render(&BadgeSpec {
                    title,
                    message: &display.message,
                    color: resolve_hex(&display.color),
                    style,
                })?;
                Ok(RenderedResponse::ok(CONTENT_TYPE_SVG, svg))
            }
            ResponseFormat::Endpoint | ResponseFormat::Raw => {
                let body = serde_json::to_vec(&EndpointResponse::new(
                    title,
                    display.message.as_str(),
                    &display.color,
                ))?;
                Ok(RenderedResponse::ok(CONTENT_TYPE_JSON, body))
            }
        }
    }
}

impl std::fmt::Debug for ResponseRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseRenderer")
            .field("badge", &self.badge.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::SvgBadgeRenderer;
    use crate::catalog::ColorRange;
    use crate::domain::query::{HistogramPair, Sample, SampleHistogram, SamplePair, StringSample};
    use assert_matches::assert_matches;

    fn vector(value: f64, labels: &[(&str, &str)]) -> QueryResult {
        QueryResult::Vector(vec![Sample::new(
            labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            SamplePair::new(1700000000.0, value),
        )])
    }

    fn cpu() -> MetricDefinition {
        MetricDefinition::new("cpu", "up").with_colors(vec![
            ColorRange::new(0.0, 50.0, "green"),
            ColorRange::new(51.0, 100.0, "red"),
        ])
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(ResponseFormat::parse(""), ResponseFormat::Endpoint);
        assert_eq!(ResponseFormat::parse("endpoint"), ResponseFormat::Endpoint);
        assert_eq!(ResponseFormat::parse("raw"), ResponseFormat::Raw);
        assert_eq!(ResponseFormat::parse("badge"), ResponseFormat::Badge);
        assert_eq!(ResponseFormat::parse("json"), ResponseFormat::Endpoint);
    }

    #[test]
    fn test_resolve_numeric_with_color() {
        let display = resolve_display(&cpu(), &vector(42.0, &[])).unwrap();
        assert_eq!(display.message, "42");
        assert_eq!(display.color, "green");
    }

    #[test]
    fn test_resolve_prefix_suffix() {
        let metric = cpu().with_prefix("~").with_suffix("%");
        let display = resolve_display(&metric, &vector(0.5, &[])).unwrap();
        assert_eq!(display.message, "~0.5%");
    }

    #[test]
    fn test_resolve_override_wins_over_label() {
        let metric = MetricDefinition::new("version", "up")
            .with_label("version")
            .with_colors(vec![ColorRange::new(0.0, 1.0, "blue").with_override("pinned")]);
        let display = resolve_display(&metric, &vector(1.0, &[("version", "v1.2")])).unwrap();
        assert_eq!(display.message, "pinned");
        assert_eq!(display.color, "blue");
    }

    #[test]
    fn test_resolve_label_replaces_value() {
        let metric = MetricDefinition::new("version", "up")
            .with_label("version")
            .with_prefix("v");
        let display = resolve_display(&metric, &vector(1.0, &[("version", "1.30.2")])).unwrap();
        assert_eq!(display.message, "v1.30.2");
        assert_eq!(display.color, "");
    }

    #[test]
    fn test_resolve_missing_label_is_error() {
        let metric = MetricDefinition::new("version", "up").with_label("version");
        let result = resolve_display(&metric, &vector(1.0, &[("other", "x")]));
        assert_matches!(result, Err(Error::LabelNotFound { .. }));
    }

    #[test]
    fn test_resolve_no_data() {
        let metric = cpu().with_suffix("%").with_label("instance");
        let display = resolve_display(&metric, &QueryResult::Vector(vec![])).unwrap();
        assert_eq!(display, ResolvedDisplay::no_data());
    }

    #[test]
    fn test_resolve_no_data_skips_prefix_and_suffix() {
        let metric = cpu().with_prefix("~").with_suffix("%");
        let display = resolve_display(&metric, &QueryResult::Empty).unwrap();
        assert_eq!(display.message, NO_DATA_MESSAGE);
        assert_eq!(display.color, "");
    }

    #[test]
    fn test_resolve_histogram_count() {
        let histogram = HistogramPair(
            1700000000.0,
            SampleHistogram {
                count: "12".into(),
                sum: "3.5".into(),
                buckets: vec![],
            },
        );
        let result = QueryResult::Vector(vec![Sample::histogram(Default::default(), histogram)]);
        let display = resolve_display(&cpu(), &result).unwrap();
        assert_eq!(display.message, "12");
        assert_eq!(display.color, "green");
    }

    #[test]
    fn test_raw_body_is_backend_bytes() {
        let text = r#"[{"metric":{"job":"node"},"value":[1700000000,"42"]}]"#;
        let outcome = QueryOutcome::new(QueryResult::from_prometheus("vector", text).unwrap())
            .with_raw(text.to_string());

        let response = ResponseRenderer::default().raw(&outcome).unwrap();

        assert_eq!(response.content_type, CONTENT_TYPE_JSON);
        assert_eq!(response.body, Bytes::from_static(text.as_bytes()));
    }

    #[test]
    fn test_resolve_string_result() {
        let metric = MetricDefinition::new("release", "up").with_suffix("!");
        let result = QueryResult::String(StringSample(1.0, "stable".into()));
        let display = resolve_display(&metric, &result).unwrap();
        assert_eq!(display.message, "stable!");
        assert_eq!(display.color, "");
    }

    #[test]
    fn test_endpoint_body_omits_empty_color() {
        let renderer = ResponseRenderer::default();
        let display = ResolvedDisplay {
            message: "42".into(),
            color: String::new(),
        };
        let response = renderer
            .display(&cpu(), &display, ResponseFormat::Endpoint, BadgeStyle::Flat)
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type, CONTENT_TYPE_JSON);
        assert_eq!(
            response.body,
            Bytes::from_static(br#"{"schemaVersion":1,"label":"cpu","message":"42"}"#)
        );
    }

    #[test]
    fn test_badge_without_renderer_fails() {
        let renderer = ResponseRenderer::default();
        let result = renderer.display(
            &cpu(),
            &ResolvedDisplay::no_data(),
            ResponseFormat::Badge,
            BadgeStyle::Flat,
        );
        assert_matches!(result, Err(Error::BadgeRendererMissing));
    }

    #[test]
    fn test_badge_resolves_hex_color() {
        let renderer = ResponseRenderer::new(Some(Arc::new(SvgBadgeRenderer::default())));
        let display = ResolvedDisplay {
            message: "42".into(),
            color: "green".into(),
        };
        let response = renderer
            .display(&cpu(), &display, ResponseFormat::Badge, BadgeStyle::Flat)
            .unwrap();

        assert_eq!(response.content_type, CONTENT_TYPE_SVG);
        let svg = String::from_utf8(response.body.to_vec()).unwrap();
        assert!(svg.contains("#97ca00"));
    }

    #[test]
    fn test_error_body() {
        let response = RenderedResponse::error("cpu", "Not Found", StatusCode::NOT_FOUND);
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(
            response.body,
            Bytes::from_static(
                br#"{"schemaVersion":1,"label":"cpu","message":"Not Found","isError":true}"#
            )
        );
    }
}
