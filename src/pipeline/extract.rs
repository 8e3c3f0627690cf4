//! Result extraction
//!
//! Only the first series of a result is ever consulted. Queries returning
//! several series must aggregate in PromQL.

use crate::domain::query::{parse_sample_value, QueryResult, Sample, Series};
use crate::error::{Error, Result};

/// Numeric value of the first series, `None` when there is no data.
///
/// Range vectors yield the most recent point of their first series. Native
/// histogram samples yield their observation count.
pub fn extract_scalar(result: &QueryResult) -> Option<f64> {
    match result {
        QueryResult::Scalar(pair) => Some(pair.value),
        QueryResult::Vector(samples) => samples.first().and_then(Sample::scalar),
        QueryResult::Matrix(series) => series.first().and_then(Series::latest),
        QueryResult::String(sample) => parse_sample_value(sample.1.trim()),
        QueryResult::Empty => None,
    }
}

/// Value of `label` on the first series.
///
/// Fails when there are no series or the first one lacks the label. An
/// empty label value is a success.
pub fn extract_label(result: &QueryResult, label: &str) -> Result<String> {
    result
        .first_labels()
        .and_then(|labels| labels.get(label))
        .cloned()
        .ok_or_else(|| Error::LabelNotFound {
            label: label.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::{
        HistogramBucket, HistogramPair, LabelSet, SampleHistogram, SamplePair, StringSample,
    };
    use assert_matches::assert_matches;

    fn sample(labels: &[(&str, &str)], value: f64) -> Sample {
        Sample::new(
            labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            SamplePair::new(1700000000.0, value),
        )
    }

    #[test]
    fn test_scalar_from_first_series_only() {
        let result = QueryResult::Vector(vec![sample(&[], 1.5), sample(&[], 99.0)]);
        assert_eq!(extract_scalar(&result), Some(1.5));
    }

    #[test]
    fn test_scalar_absent_without_series() {
        assert_eq!(extract_scalar(&QueryResult::Vector(vec![])), None);
        assert_eq!(extract_scalar(&QueryResult::Matrix(vec![])), None);
        assert_eq!(extract_scalar(&QueryResult::Empty), None);
    }

    #[test]
    fn test_scalar_result() {
        let result = QueryResult::Scalar(SamplePair::new(1.0, 7.25));
        assert_eq!(extract_scalar(&result), Some(7.25));
    }

    #[test]
    fn test_matrix_uses_latest_point() {
        let result = QueryResult::Matrix(vec![Series {
            metric: LabelSet::new(),
            values: vec![SamplePair::new(1.0, 10.0), SamplePair::new(2.0, 20.0)],
            histograms: vec![],
        }]);
        assert_eq!(extract_scalar(&result), Some(20.0));
    }

    #[test]
    fn test_histogram_sample_uses_count() {
        let histogram = HistogramPair(
            1.0,
            SampleHistogram {
                count: "2".into(),
                sum: "3".into(),
                buckets: vec![HistogramBucket(0, "0.5".into(), "1".into(), "2".into())],
            },
        );
        let result = QueryResult::Vector(vec![Sample::histogram(LabelSet::new(), histogram)]);
        assert_eq!(extract_scalar(&result), Some(2.0));
    }

    #[test]
    fn test_string_result() {
        let result = QueryResult::String(StringSample(1.0, "12.5".into()));
        assert_eq!(extract_scalar(&result), Some(12.5));

        let result = QueryResult::String(StringSample(1.0, "hello".into()));
        assert_eq!(extract_scalar(&result), None);
    }

    #[test]
    fn test_label_exists() {
        let result = QueryResult::Vector(vec![sample(&[("label1", "value1"), ("label2", "value2")], 1.0)]);
        assert_eq!(extract_label(&result, "label1").unwrap(), "value1");
    }

    #[test]
    fn test_label_does_not_exist() {
        let result = QueryResult::Vector(vec![sample(&[("label1", "value1")], 1.0)]);
        let err = extract_label(&result, "label2").unwrap_err();

        assert_eq!(err.to_string(), "label 'label2' not found in the query result");
        assert_matches!(err, Error::LabelNotFound { label } if label == "label2");
    }

    #[test]
    fn test_label_empty_vector() {
        let err = extract_label(&QueryResult::Vector(vec![]), "label1").unwrap_err();
        assert_eq!(err.to_string(), "label 'label1' not found in the query result");
    }

    #[test]
    fn test_label_empty_value_is_success() {
        let result = QueryResult::Vector(vec![sample(&[("label1", "")], 1.0)]);
        assert_eq!(extract_label(&result, "label1").unwrap(), "");
    }

    #[test]
    fn test_label_only_first_series_is_consulted() {
        let result = QueryResult::Vector(vec![
            sample(&[("other", "x")], 1.0),
            sample(&[("label1", "second")], 2.0),
        ]);
        assert!(extract_label(&result, "label1").is_err());
    }

    #[test]
    fn test_label_on_scalar_fails() {
        let result = QueryResult::Scalar(SamplePair::new(1.0, 1.0));
        assert!(extract_label(&result, "instance").is_err());
    }
}
