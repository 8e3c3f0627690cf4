//! Infrastructure Adapters
//!
//! Implementations of the domain ports.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │             Ports (domain::ports)             │
//! │        QueryBackend    │    BadgeRenderer     │
//! └───────────────────────────────────────────────┘
//!                         │
//!                         ▼
//! ┌───────────────────────────────────────────────┐
//! │           Adapters (this module)              │
//! │     PrometheusClient   │   SvgBadgeRenderer   │
//! └───────────────────────────────────────────────┘
//! ```

mod badge;
mod prometheus;

pub use badge::SvgBadgeRenderer;
pub use prometheus::{PrometheusClient, PrometheusConfig};
