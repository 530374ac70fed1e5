//! Canonical normalization of upstream aggregation payloads.
//!
//! The aggregation service is trusted for its sums but not for anything it
//! derives: numbers may arrive as strings, fields may be missing, and the
//! dimension key may be spelled `dimensionKey` or `dimension_key`. Every
//! payload goes through here so the consumer sees the same schema as a
//! locally computed rollup.

use crate::catalog::catalog_from_remote;
use crate::group::rank_rows;
use crate::metrics::derive;
use funnel_core::types::{AggregatedRow, FunnelCounts, OfferCatalog, Summary, UNKNOWN_KEY};
use funnel_core::wire::AnalyticsPayload;
use serde_json::Value;

/// Dimension key field names, in resolution order.
pub const DIMENSION_KEY_FIELDS: [&str; 2] = ["dimensionKey", "dimension_key"];

/// A normalized upstream result.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRollup {
    pub summary: Summary,
    pub aggregated: Vec<AggregatedRow>,
    pub offer_ids: OfferCatalog,
}

/// Normalizes a whole payload. `previous_catalog` is kept when the payload
/// carries no offer ids.
pub fn normalize_remote(
    payload: &AnalyticsPayload,
    previous_catalog: Option<&OfferCatalog>,
) -> RemoteRollup {
    RemoteRollup {
        summary: normalize_summary(&payload.summary),
        aggregated: normalize_rows(&payload.aggregated),
        offer_ids: catalog_from_remote(&payload.offer_ids, previous_catalog),
    }
}

/// Coerces a summary-like object and recomputes its ratios.
pub fn normalize_summary(value: &Value) -> Summary {
    let counts = coerce_counts(value);
    Summary::new(counts, derive(&counts))
}

/// Coerces row-like objects, resolves their keys, recomputes ratios, and
/// ranks them.
pub fn normalize_rows(rows: &[Value]) -> Vec<AggregatedRow> {
    let mut normalized: Vec<AggregatedRow> = rows
        .iter()
        .map(|row| {
            let counts = coerce_counts(row);
            AggregatedRow::new(resolve_dimension_key(row), counts, derive(&counts))
        })
        .collect();
    rank_rows(&mut normalized);
    normalized
}

/// `dimensionKey`, then `dimension_key`, then `"Unknown"`. A null value
/// counts as missing; any other scalar is rendered as text.
pub fn resolve_dimension_key(row: &Value) -> String {
    DIMENSION_KEY_FIELDS
        .iter()
        .find_map(|field| row.get(field).and_then(render_scalar))
        .unwrap_or_else(|| UNKNOWN_KEY.to_string())
}

fn coerce_counts(value: &Value) -> FunnelCounts {
    FunnelCounts {
        clicks: coerce_count(value.get("clicks")),
        installs: coerce_count(value.get("installs")),
        events: coerce_count(value.get("events")),
        revenues: coerce_amount(value.get("revenues")),
    }
}

/// Non-negative finite number, or 0.
pub fn coerce_amount(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite() && *v >= 0.0).unwrap_or(0.0)
}

/// Like [`coerce_amount`], rounded to a whole count.
pub fn coerce_count(value: Option<&Value>) -> u64 {
    if let Some(n) = value.and_then(Value::as_u64) {
        return n;
    }
    coerce_amount(value).round() as u64
}

/// Text form of a JSON scalar; `None` for null. Integral floats render
/// without a fractional part.
pub(crate) fn render_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => Some(i.to_string()),
            (None, Some(u), _) => Some(u.to_string()),
            (None, None, Some(f)) => Some(f.to_string()),
            _ => Some(n.to_string()),
        },
        other => Some(other.to_string()),
    }
}
