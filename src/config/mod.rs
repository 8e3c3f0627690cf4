//! Configuration file
//!
//! The YAML file declares the Prometheus base URL, the badge font and the
//! catalog of servable metrics. Process-level settings (listen addresses,
//! timeouts, rate limiting, logging) come from CLI flags / environment in
//! `main.rs`.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::catalog::{DuplicatePolicy, MetricCatalog, MetricDefinition};
use crate::error::{Error, Result};

/// Default config file path
pub const DEFAULT_CONFIG_PATH: &str = "/kromgo/config.yaml";

/// Default badge font family
pub const DEFAULT_BADGE_FONT: &str = "Verdana,Geneva,DejaVu Sans,sans-serif";

/// Default badge font size in pixels
pub const DEFAULT_BADGE_FONT_SIZE: u32 = 11;

/// Contents of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KromgoConfig {
    /// Prometheus base URL. `PROMETHEUS_URL` takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prometheus: Option<String>,

    /// Enable debug logging.
    #[serde(default)]
    pub debug: bool,

    /// How duplicate metric names are handled.
    #[serde(default)]
    pub duplicate_metrics: DuplicatePolicy,

    /// Badge rendering settings.
    #[serde(default)]
    pub badge: BadgeConfig,

    /// Servable metrics.
    #[serde(default)]
    pub metrics: Vec<MetricDefinition>,
}

/// Badge rendering settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BadgeConfig {
    /// CSS font family used in the SVG.
    #[serde(default = "default_badge_font")]
    pub font: String,

    /// Font size in pixels.
    #[serde(default = "default_badge_font_size")]
    pub size: u32,
}

fn default_badge_font() -> String {
    DEFAULT_BADGE_FONT.to_string()
}

fn default_badge_font_size() -> u32 {
    DEFAULT_BADGE_FONT_SIZE
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            font: default_badge_font(),
            size: default_badge_font_size(),
        }
    }
}

impl KromgoConfig {
    /// Read and parse a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml(&data)
    }

    /// Parse YAML config text.
    pub fn from_yaml(data: &str) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(data)?;
        if config.badge.size == 0 {
            return Err(Error::Config("badge.size must be greater than zero".into()));
        }
        if config.badge.font.trim().is_empty() {
            config.badge.font = default_badge_font();
        }
        Ok(config)
    }

    /// Resolve the Prometheus URL, preferring `override_url` when set.
    pub fn prometheus_url(&self, override_url: Option<&str>) -> Result<String> {
        override_url
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .or_else(|| self.prometheus.clone().filter(|url| !url.is_empty()))
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or_else(|| {
                Error::Config("no url pointing to a prometheus instance was provided".into())
            })
    }

    /// Build the metric catalog.
    pub fn catalog(&self) -> Result<MetricCatalog> {
        MetricCatalog::from_definitions(self.metrics.iter().cloned(), self.duplicate_metrics)
    }

    /// JSON Schema of the config file, pretty printed.
    pub fn json_schema() -> Result<String> {
        let schema = schemars::schema_for!(KromgoConfig);
        Ok(serde_json::to_string_pretty(&schema)?)
    }
}
