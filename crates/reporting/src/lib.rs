//! Rollup cycles for the funnel dashboard: remote-first with a synthetic
//! fallback, committed latest-wins.

#![warn(clippy::unwrap_used)]

pub mod generation;
pub mod orchestrator;

pub use generation::{is_current, Generation};
pub use orchestrator::{CyclePhase, RollupOrchestrator};
