//! Metric Catalog
//!
//! Immutable lookup from metric name to its query definition. Built once
//! at startup from configuration and shared read-only by every request.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

// =============================================================================
// Metric Definition
// =============================================================================

/// A named, pre-declared query servable by this process.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricDefinition {
    /// The name of the metric. This is used in the HTTP call.
    pub name: String,

    /// The title of the metric to display. Defaults to the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// The Prometheus query to run.
    pub query: String,

    /// Display the value of this label from the first series instead of the number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Prepended to the displayed value.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,

    /// Appended to the displayed value.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub suffix: String,

    /// Ordered color thresholds. The first matching range wins.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<ColorRange>,
}

impl MetricDefinition {
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_colors(mut self, colors: Vec<ColorRange>) -> Self {
        self.colors = colors;
        self
    }

    /// Title shown on the badge, falling back to the name.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => &self.name,
        }
    }

    /// Configured label, treating an empty string as unset.
    pub fn display_label(&self) -> Option<&str> {
        self.label.as_deref().filter(|l| !l.is_empty())
    }

    fn validate(&self, index: usize) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidMetric {
                index,
                reason: "name must not be empty".into(),
            });
        }
        if self.query.trim().is_empty() {
            return Err(Error::InvalidMetric {
                index,
                reason: format!("query of metric '{}' must not be empty", self.name),
            });
        }
        for range in &self.colors {
            if range.min > range.max {
                warn!(
                    metric = %self.name,
                    min = range.min,
                    max = range.max,
                    "color range has min > max and will never match"
                );
            }
        }
        Ok(())
    }
}

/// An inclusive numeric interval mapped to a color and optional value override.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColorRange {
    pub min: f64,
    pub max: f64,

    /// Symbolic color name or `#RRGGBB` literal.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub color: String,

    /// Replaces the displayed value when non-empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value_override: String,
}

impl ColorRange {
    pub fn new(min: f64, max: f64, color: impl Into<String>) -> Self {
        Self {
            min,
            max,
            color: color.into(),
            value_override: String::new(),
        }
    }

    pub fn with_override(mut self, value_override: impl Into<String>) -> Self {
        self.value_override = value_override.into();
        self
    }

    /// Inclusive on both bounds.
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

// =============================================================================
// Duplicate Handling
// =============================================================================

/// What to do when two definitions share a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Keep the last definition and log a warning
    #[default]
    Warn,
    /// Refuse to start
    Reject,
}

// =============================================================================
// Catalog
// =============================================================================

/// Read-only name → definition lookup.
#[derive(Debug, Clone, Default)]
pub struct MetricCatalog {
    metrics: HashMap<String, MetricDefinition>,
}

impl MetricCatalog {
    /// An empty catalog: every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the catalog, validating each definition.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = MetricDefinition>,
        policy: DuplicatePolicy,
    ) -> Result<Self> {
        let mut metrics = HashMap::new();

        for (index, definition) in definitions.into_iter().enumerate() {
            definition.validate(index)?;

            let name = definition.name.clone();
            if metrics.insert(name.clone(), definition).is_some() {
                match policy {
                    DuplicatePolicy::Reject => return Err(Error::DuplicateMetric(name)),
                    DuplicatePolicy::Warn => {
                        warn!(metric = %name, "duplicate metric name, keeping the last definition")
                    }
                }
            }
        }

        debug!("Metric catalog built with {} entries", metrics.len());
        Ok(Self { metrics })
    }

    pub fn get(&self, name: &str) -> Option<&MetricDefinition> {
        self.metrics.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Metric names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.metrics.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn cpu() -> MetricDefinition {
        MetricDefinition::new("cpu", "sum(rate(node_cpu_seconds_total[5m]))")
    }

    #[test]
    fn test_lookup() {
        let catalog = MetricCatalog::from_definitions(vec![cpu()], DuplicatePolicy::Warn).unwrap();

        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains("cpu"));
        assert_eq!(catalog.get("cpu").unwrap().query, cpu().query);
        assert!(catalog.get("memory").is_none());
    }

    #[test]
    fn test_empty_catalog_misses() {
        let catalog = MetricCatalog::empty();
        assert!(catalog.is_empty());
        assert!(catalog.get("cpu").is_none());
    }

    #[test]
    fn test_duplicate_warn_keeps_last() {
        let first = cpu().with_title("first");
        let second = cpu().with_title("second");

        let catalog =
            MetricCatalog::from_definitions(vec![first, second], DuplicatePolicy::Warn).unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("cpu").unwrap().display_title(), "second");
    }

    #[test]
    fn test_duplicate_reject_fails() {
        let result = MetricCatalog::from_definitions(vec![cpu(), cpu()], DuplicatePolicy::Reject);
        assert_matches!(result, Err(Error::DuplicateMetric(name)) if name == "cpu");
    }

    #[test]
    fn test_empty_name_rejected() {
        let result = MetricCatalog::from_definitions(
            vec![MetricDefinition::new("", "up")],
            DuplicatePolicy::Warn,
        );
        assert_matches!(result, Err(Error::InvalidMetric { index: 0, .. }));
    }

    #[test]
    fn test_empty_query_rejected() {
        let result = MetricCatalog::from_definitions(
            vec![cpu(), MetricDefinition::new("memory", "  ")],
            DuplicatePolicy::Warn,
        );
        assert_matches!(result, Err(Error::InvalidMetric { index: 1, .. }));
    }

    #[test]
    fn test_display_title_falls_back_to_name() {
        assert_eq!(cpu().display_title(), "cpu");
        assert_eq!(cpu().with_title("").display_title(), "cpu");
        assert_eq!(cpu().with_title("CPU Usage").display_title(), "CPU Usage");
    }

    #[test]
    fn test_display_label_ignores_empty() {
        assert_eq!(cpu().display_label(), None);
        assert_eq!(cpu().with_label("").display_label(), None);
        assert_eq!(cpu().with_label("instance").display_label(), Some("instance"));
    }

    #[test]
    fn test_color_range_inclusive() {
        let range = ColorRange::new(0.0, 50.0, "green");
        assert!(range.contains(0.0));
        assert!(range.contains(50.0));
        assert!(!range.contains(50.1));
        assert!(!range.contains(f64::NAN));
    }

    #[test]
    fn test_names_sorted() {
        let catalog = MetricCatalog::from_definitions(
            vec![MetricDefinition::new("zeta", "up"), MetricDefinition::new("alpha", "up")],
            DuplicatePolicy::Warn,
        )
        .unwrap();
        assert_eq!(catalog.names(), vec!["alpha", "zeta"]);
    }
}
