//! kromgo - Prometheus query results as badges
//!
//! Serves pre-configured PromQL queries as shields.io endpoint JSON, raw
//! query results or SVG badges, so dashboards and READMEs can show live
//! cluster numbers without exposing Prometheus itself.
//!
//! # Architecture
//!
//! ```text
//! HTTP request → MetricPipeline → QueryBackend (Prometheus)
//!                      │
//!                      ▼
//!        extract → threshold → render (endpoint | raw | badge)
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - Prometheus client and SVG badge renderer
//! - [`catalog`] - Configured metric definitions
//! - [`config`] - Configuration file loading
//! - [`domain`] - Query result model and ports
//! - [`error`] - Error types
//! - [`metrics`] - Self-metrics exposition
//! - [`pipeline`] - Request resolution and rendering
//! - [`server`] - HTTP listeners, rate limiting and health checks

pub mod adapters;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod server;

// Re-export commonly used types
pub use catalog::{ColorRange, DuplicatePolicy, MetricCatalog, MetricDefinition};
pub use config::KromgoConfig;
pub use error::{Error, Result};
pub use pipeline::{MetricPipeline, MetricRequest};
