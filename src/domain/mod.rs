//! Domain Layer
//!
//! - **Query** (`query.rs`) - Typed query results returned by a backend
//! - **Ports** (`ports.rs`) - Trait abstractions for the backend and badge renderer

pub mod ports;
pub mod query;

pub use ports::{BadgeRenderer, BadgeSpec, BadgeStyle, QueryBackend};
pub use query::{
    HistogramBucket, HistogramPair, LabelSet, QueryOutcome, QueryResult, Sample, SampleHistogram,
    SamplePair, Series, StringSample,
};
