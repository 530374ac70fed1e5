//! Access to the external aggregation service.
//! The HTTP client applies a hard deadline; every failure maps to a
//! [`SourceError`] the orchestrator recovers from locally.

#![warn(clippy::unwrap_used)]

pub mod client;
pub mod source;

pub use client::HttpAnalyticsSource;
pub use funnel_core::SourceError;
pub use source::{with_deadline, AnalyticsSource, UnavailableSource};
