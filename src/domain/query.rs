//! Query Result Model
//!
//! Typed representation of the result of an instant query. Prometheus
//! returns one of four result shapes; each gets its own variant so that
//! extraction never has to inspect JSON at runtime.
//!
//! Every type serializes back into the JSON shape Prometheus uses for
//! `data.result`. Outcomes decoded from a live backend additionally keep the
//! original `data.result` text, which is what the raw format emits.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Error, Result};

/// Label set of a single series.
pub type LabelSet = BTreeMap<String, String>;

// =============================================================================
// Sample Values
// =============================================================================

/// A `[timestamp, "value"]` pair as returned by Prometheus.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "(f64, String)", into = "(f64, String)")]
pub struct SamplePair {
    /// Unix timestamp in seconds
    pub timestamp: f64,
    /// Sample value
    pub value: f64,
}

impl SamplePair {
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

impl TryFrom<(f64, String)> for SamplePair {
    type Error = String;

    fn try_from((timestamp, raw): (f64, String)) -> std::result::Result<Self, Self::Error> {
        let value = parse_sample_value(&raw).ok_or_else(|| format!("invalid sample value {:?}", raw))?;
        Ok(Self { timestamp, value })
    }
}

impl From<SamplePair> for (f64, String) {
    fn from(pair: SamplePair) -> Self {
        (pair.timestamp, format_sample_value(pair.value))
    }
}

/// Parse a Prometheus sample value string.
pub fn parse_sample_value(raw: &str) -> Option<f64> {
    match raw {
        "NaN" => Some(f64::NAN),
        "+Inf" | "Inf" => Some(f64::INFINITY),
        "-Inf" => Some(f64::NEG_INFINITY),
        _ => raw.parse().ok(),
    }
}

/// Format a sample value the way Prometheus does: shortest round-trip
/// decimal, never in exponent notation.
pub fn format_sample_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

// =============================================================================
// Series Shapes
// =============================================================================

/// Native histogram snapshot. Counts and bounds stay in their wire form.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SampleHistogram {
    pub count: String,
    pub sum: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buckets: Vec<HistogramBucket>,
}

impl SampleHistogram {
    /// Observation count as a number.
    pub fn count_value(&self) -> Option<f64> {
        parse_sample_value(&self.count)
    }
}

/// `[boundaryRule, "lower", "upper", "count"]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HistogramBucket(pub i64, pub String, pub String, pub String);

/// A `[timestamp, {histogram}]` pair.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HistogramPair(pub f64, pub SampleHistogram);

/// One element of an instant vector. Float samples carry `value`, native
/// histogram samples carry `histogram`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Sample {
    #[serde(default)]
    pub metric: LabelSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<SamplePair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histogram: Option<HistogramPair>,
}

impl Sample {
    pub fn new(metric: LabelSet, value: SamplePair) -> Self {
        Self {
            metric,
            value: Some(value),
            histogram: None,
        }
    }

    pub fn histogram(metric: LabelSet, histogram: HistogramPair) -> Self {
        Self {
            metric,
            value: None,
            histogram: Some(histogram),
        }
    }

    /// Float value, or the observation count of a histogram sample.
    pub fn scalar(&self) -> Option<f64> {
        match (&self.value, &self.histogram) {
            (Some(pair), _) => Some(pair.value),
            (None, Some(HistogramPair(_, histogram))) => histogram.count_value(),
            (None, None) => None,
        }
    }
}

/// One element of a range vector.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Series {
    #[serde(default)]
    pub metric: LabelSet,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<SamplePair>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub histograms: Vec<HistogramPair>,
}

impl Series {
    /// Most recent float point, falling back to the latest histogram count.
    pub fn latest(&self) -> Option<f64> {
        match (self.values.last(), self.histograms.last()) {
            (Some(pair), _) => Some(pair.value),
            (None, Some(HistogramPair(_, histogram))) => histogram.count_value(),
            (None, None) => None,
        }
    }
}

/// A string result: `[timestamp, "text"]`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StringSample(pub f64, pub String);

// =============================================================================
// Query Result
// =============================================================================

/// Result of an instant query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Scalar(SamplePair),
    Vector(Vec<Sample>),
    Matrix(Vec<Series>),
    String(StringSample),
    /// The backend returned no result payload at all
    Empty,
}

impl QueryResult {
    /// Decode the JSON text of `data.result` given its `data.resultType`.
    pub fn from_prometheus(result_type: &str, result: &str) -> Result<Self> {
        if result.trim() == "null" {
            return Ok(QueryResult::Empty);
        }

        let parsed = match result_type {
            "scalar" => serde_json::from_str(result).map(QueryResult::Scalar),
            "vector" => serde_json::from_str(result).map(QueryResult::Vector),
            "matrix" => serde_json::from_str(result).map(QueryResult::Matrix),
            "string" => serde_json::from_str(result).map(QueryResult::String),
            other => {
                return Err(Error::PrometheusResponseParse(format!(
                    "unknown result type: {}",
                    other
                )))
            }
        };

        parsed.map_err(|e| Error::PrometheusResponseParse(e.to_string()))
    }

    /// Prometheus' name for this result shape.
    pub fn result_type(&self) -> &'static str {
        match self {
            QueryResult::Scalar(_) => "scalar",
            QueryResult::Vector(_) => "vector",
            QueryResult::Matrix(_) => "matrix",
            QueryResult::String(_) => "string",
            QueryResult::Empty => "vector",
        }
    }

    /// Number of series in the result. Scalars and strings count as one.
    pub fn series_count(&self) -> usize {
        match self {
            QueryResult::Scalar(_) | QueryResult::String(_) => 1,
            QueryResult::Vector(samples) => samples.len(),
            QueryResult::Matrix(series) => series.len(),
            QueryResult::Empty => 0,
        }
    }

    /// True when the query produced no series ("no data").
    pub fn is_empty(&self) -> bool {
        self.series_count() == 0
    }

    /// Labels of the first series, if the shape carries labels at all.
    pub fn first_labels(&self) -> Option<&LabelSet> {
        match self {
            QueryResult::Vector(samples) => samples.first().map(|s| &s.metric),
            QueryResult::Matrix(series) => series.first().map(|s| &s.metric),
            _ => None,
        }
    }
}

impl Serialize for QueryResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            QueryResult::Scalar(pair) => pair.serialize(serializer),
            QueryResult::Vector(samples) => samples.serialize(serializer),
            QueryResult::Matrix(series) => series.serialize(serializer),
            QueryResult::String(sample) => sample.serialize(serializer),
            QueryResult::Empty => serializer.serialize_tuple(0)?.end(),
        }
    }
}

/// A successful query together with any warnings the backend attached.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub result: QueryResult,
    pub warnings: Vec<String>,
    /// `data.result` exactly as the backend sent it
    pub raw: Option<Bytes>,
}

impl QueryOutcome {
    pub fn new(result: QueryResult) -> Self {
        Self {
            result,
            warnings: Vec::new(),
            raw: None,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn with_raw(mut self, raw: impl Into<Bytes>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    /// Result JSON for the raw format: the backend's own bytes when known,
    /// otherwise the typed result in Prometheus' shape.
    pub fn raw_json(&self) -> Result<Bytes> {
        match &self.raw {
            Some(raw) => Ok(raw.clone()),
            None => Ok(Bytes::from(serde_json::to_vec(&self.result)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sample_value_formatting() {
        assert_eq!(format_sample_value(42.0), "42");
        assert_eq!(format_sample_value(0.1), "0.1");
        assert_eq!(format_sample_value(1e21), "1000000000000000000000");
        assert_eq!(format_sample_value(f64::NAN), "NaN");
        assert_eq!(format_sample_value(f64::INFINITY), "+Inf");
        assert_eq!(format_sample_value(f64::NEG_INFINITY), "-Inf");
    }

    #[test]
    fn test_sample_value_parsing() {
        assert_eq!(parse_sample_value("42"), Some(42.0));
        assert_eq!(parse_sample_value("+Inf"), Some(f64::INFINITY));
        assert_eq!(parse_sample_value("-Inf"), Some(f64::NEG_INFINITY));
        assert!(parse_sample_value("NaN").unwrap().is_nan());
        assert_eq!(parse_sample_value("forty-two"), None);
    }

    fn decode(result_type: &str, result: serde_json::Value) -> Result<QueryResult> {
        QueryResult::from_prometheus(result_type, &result.to_string())
    }

    #[test]
    fn test_vector_decode() {
        let result = decode(
            "vector",
            json!([{"metric": {"instance": "a"}, "value": [1700000000.5, "42"]}]),
        )
        .unwrap();

        match &result {
            QueryResult::Vector(samples) => {
                assert_eq!(samples.len(), 1);
                assert_eq!(samples[0].scalar(), Some(42.0));
                assert_eq!(samples[0].metric["instance"], "a");
            }
            other => panic!("expected vector, got {:?}", other),
        }
        assert_eq!(result.series_count(), 1);
        assert!(!result.is_empty());
    }

    #[test]
    fn test_empty_vector_is_no_data() {
        let result = decode("vector", json!([])).unwrap();
        assert!(result.is_empty());
        assert!(result.first_labels().is_none());
    }

    #[test]
    fn test_null_result_is_empty() {
        let result = decode("vector", serde_json::Value::Null).unwrap();
        assert_eq!(result, QueryResult::Empty);
        assert_eq!(serde_json::to_string(&result).unwrap(), "[]");
    }

    #[test]
    fn test_unknown_result_type_is_parse_error() {
        let err = decode("histogram", json!([])).unwrap_err();
        assert!(matches!(err, Error::PrometheusResponseParse(_)));
    }

    #[test]
    fn test_invalid_sample_value_is_parse_error() {
        let err = decode("scalar", json!([1.0, "abc"])).unwrap_err();
        assert!(matches!(err, Error::PrometheusResponseParse(_)));
    }

    #[test]
    fn test_vector_serializes_in_prometheus_shape() {
        let input = json!([{"metric": {"job": "node"}, "value": [1700000000.5, "0.25"]}]);
        let result = decode("vector", input.clone()).unwrap();
        assert_eq!(serde_json::to_value(&result).unwrap(), input);
    }

    #[test]
    fn test_matrix_and_scalar_serialize_in_prometheus_shape() {
        let matrix = json!([{"metric": {}, "values": [[1.0, "1"], [2.0, "+Inf"]]}]);
        let result = decode("matrix", matrix.clone()).unwrap();
        assert_eq!(serde_json::to_value(&result).unwrap(), matrix);

        let scalar = json!([1700000000.0, "3.5"]);
        let result = decode("scalar", scalar.clone()).unwrap();
        assert_eq!(serde_json::to_value(&result).unwrap(), scalar);
        assert_eq!(result.series_count(), 1);
    }

    #[test]
    fn test_outcome_warnings() {
        let outcome = QueryOutcome::new(QueryResult::Empty).with_warnings(vec!["w".into()]);
        assert_eq!(outcome.warnings, vec!["w".to_string()]);
    }

    // =========================================================================
    // Native Histogram Tests
    // =========================================================================

    #[test]
    fn test_histogram_sample_decode() {
        let result = decode(
            "vector",
            json!([{
                "metric": {"__name__": "http_request_duration_seconds"},
                "histogram": [1700000000, {
                    "count": "2",
                    "sum": "3",
                    "buckets": [[0, "0.5", "1", "2"]]
                }]
            }]),
        )
        .unwrap();

        match &result {
            QueryResult::Vector(samples) => {
                assert!(samples[0].value.is_none());
                assert_eq!(samples[0].scalar(), Some(2.0));
                let HistogramPair(_, histogram) = samples[0].histogram.as_ref().unwrap();
                assert_eq!(histogram.buckets.len(), 1);
            }
            other => panic!("expected vector, got {:?}", other),
        }
        assert!(!result.is_empty());
    }

    #[test]
    fn test_histogram_series_latest_count() {
        let result = decode(
            "matrix",
            json!([{
                "metric": {},
                "histograms": [
                    [1.0, {"count": "1", "sum": "1"}],
                    [2.0, {"count": "5", "sum": "9"}]
                ]
            }]),
        )
        .unwrap();

        match result {
            QueryResult::Matrix(series) => assert_eq!(series[0].latest(), Some(5.0)),
            other => panic!("expected matrix, got {:?}", other),
        }
    }

    // =========================================================================
    // Raw Passthrough Tests
    // =========================================================================

    #[test]
    fn test_raw_json_prefers_backend_bytes() {
        let text = r#"[{"metric":{"job":"node"},"value":[1700000000,"42"]}]"#;
        let outcome = QueryOutcome::new(QueryResult::from_prometheus("vector", text).unwrap())
            .with_raw(text.to_string());

        assert_eq!(outcome.raw_json().unwrap(), Bytes::from_static(text.as_bytes()));
    }

    #[test]
    fn test_raw_json_without_backend_bytes() {
        let outcome = QueryOutcome::new(QueryResult::Vector(vec![]));
        assert_eq!(outcome.raw_json().unwrap(), Bytes::from_static(b"[]"));
    }
}
