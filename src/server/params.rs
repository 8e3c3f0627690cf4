//! Request parameter extraction.

use hyper::Uri;

/// Path segment meaning "read the metric name from the query string".
pub const QUERY_SEGMENT: &str = "query";

/// Raw parameters of a metric request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    pub metric: String,
    pub format: String,
    pub style: String,
}

impl RequestParams {
    /// Parameters from `/{metric}` or `/query?metric=...`.
    ///
    /// Missing parameters are empty strings. Repeated query parameters keep
    /// the first occurrence.
    pub fn from_uri(uri: &Uri) -> Self {
        let query = uri.query().unwrap_or_default();

        let segment = decode(uri.path().trim_start_matches('/'));
        let metric = if segment == QUERY_SEGMENT {
            query_param(query, "metric").unwrap_or_default()
        } else {
            segment
        };

        Self {
            metric,
            format: query_param(query, "format").unwrap_or_default(),
            style: query_param(query, "style").unwrap_or_default(),
        }
    }
}

/// First value of `key` in a raw query string.
pub fn query_param(query: &str, key: &str) -> Option<String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find(|(name, _)| decode(name) == key)
        .map(|(_, value)| decode(value))
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(uri: &str) -> RequestParams {
        RequestParams::from_uri(&uri.parse::<Uri>().unwrap())
    }

    #[test]
    fn test_path_param() {
        let p = params("/test?format=json&style=flat");
        assert_eq!(p.metric, "test");
        assert_eq!(p.format, "json");
        assert_eq!(p.style, "flat");
    }

    #[test]
    fn test_query_alias() {
        let p = params("/query?metric=actual_metric&format=badge&style=plastic");
        assert_eq!(p.metric, "actual_metric");
        assert_eq!(p.format, "badge");
        assert_eq!(p.style, "plastic");
    }

    #[test]
    fn test_no_params() {
        assert_eq!(
            params("/test"),
            RequestParams {
                metric: "test".into(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_empty_metric() {
        let p = params("/?format=json");
        assert_eq!(p.metric, "");
        assert_eq!(p.format, "json");
        assert_eq!(p.style, "");
    }

    #[test]
    fn test_query_alias_without_metric() {
        assert_eq!(params("/query?format=badge").metric, "");
    }

    #[test]
    fn test_percent_decoding() {
        let p = params("/query?metric=node%20count&style=flat%2Dsquare");
        assert_eq!(p.metric, "node count");
        assert_eq!(p.style, "flat-square");
        assert_eq!(params("/my%5Fmetric").metric, "my_metric");
    }

    #[test]
    fn test_first_occurrence_wins() {
        assert_eq!(query_param("format=badge&format=raw", "format").as_deref(), Some("badge"));
        assert_eq!(query_param("format", "format").as_deref(), Some(""));
        assert_eq!(query_param("", "format"), None);
    }
}
