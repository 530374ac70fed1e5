//! Funnel rollup pipeline: filter → group → reduce → derive → rank, plus
//! normalization of upstream payloads and the synthetic fallback panel.
//!
//! Every stage here is a pure function over its inputs.

#![warn(clippy::unwrap_used)]

pub mod catalog;
pub mod filter;
pub mod group;
pub mod metrics;
pub mod normalize;
pub mod rollup;
pub mod synthetic;

pub use catalog::extract_offer_catalog;
pub use filter::filter_records;
pub use group::{group_reduce, rank_rows};
pub use metrics::derive;
pub use normalize::{normalize_remote, normalize_rows, normalize_summary, RemoteRollup};
pub use rollup::{rollup, LocalRollup};
pub use synthetic::generate_panel;
