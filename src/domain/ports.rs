//! Domain Ports (Port/Adapter Pattern)
//!
//! The request pipeline depends on two capabilities it does not own: a
//! time-series backend that can run an instant query, and a badge renderer
//! that turns `(title, message, color)` into SVG. Adapters implement these
//! traits; tests substitute in-memory versions.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               Request Pipeline              │
//! │   QueryBackend (trait) │ BadgeRenderer      │
//! └─────────────────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌─────────────────────────────────────────────┐
//! │   PrometheusClient     │ SvgBadgeRenderer   │
//! └─────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::query::QueryOutcome;
use crate::error::Result;

// =============================================================================
// Query Backend Port
// =============================================================================

/// Port for executing instant queries.
///
/// An `Err` is a backend failure and fails only the current request. An
/// `Ok` with an empty result is a legitimate "no data" outcome.
/// Implementations must be cancel-safe: dropping the returned future aborts
/// the upstream call.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Execute `query` evaluated at `at`.
    async fn execute(&self, query: &str, at: DateTime<Utc>) -> Result<QueryOutcome>;
}

// =============================================================================
// Badge Rendering Port
// =============================================================================

/// Visual variant of a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BadgeStyle {
    #[default]
    Flat,
    FlatSquare,
    Plastic,
}

impl BadgeStyle {
    /// Parse the `style` query parameter. Unknown values fall back to flat.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "plastic" => BadgeStyle::Plastic,
            "flat-square" => BadgeStyle::FlatSquare,
            _ => BadgeStyle::Flat,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeStyle::Flat => "flat",
            BadgeStyle::FlatSquare => "flat-square",
            BadgeStyle::Plastic => "plastic",
        }
    }
}

impl std::fmt::Display for BadgeStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a renderer needs to draw one badge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeSpec<'a> {
    /// Left-hand text
    pub title: &'a str,
    /// Right-hand text
    pub message: &'a str,
    /// Right-hand background, always a `#` hex literal
    pub color: &'a str,
    pub style: BadgeStyle,
}

/// Port for turning a badge description into SVG bytes.
pub trait BadgeRenderer: Send + Sync {
    fn render(&self, badge: &BadgeSpec<'_>) -> Result<Vec<u8>>;
}
