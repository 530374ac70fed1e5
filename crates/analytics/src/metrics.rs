//! Conversion ratios derived from funnel counts.

use funnel_core::types::{DerivedRates, FunnelCounts};

/// CVR is expressed per ten thousand clicks.
pub const CVR_SCALE: f64 = 10_000.0;
/// EVR is expressed as a percentage of installs.
pub const EVR_SCALE: f64 = 100.0;

/// Computes CVR and EVR. A zero denominator yields 0, never NaN or infinity.
pub fn derive(counts: &FunnelCounts) -> DerivedRates {
    let cvr = if counts.clicks > 0 {
        counts.installs as f64 / counts.clicks as f64 * CVR_SCALE
    } else {
        0.0
    };
    let evr = if counts.installs > 0 {
        counts.events as f64 / counts.installs as f64 * EVR_SCALE
    } else {
        0.0
    };
    DerivedRates { cvr, evr }
}
