//! Offer catalog extraction and ordering.

use crate::normalize::render_scalar;
use funnel_core::types::{OfferCatalog, RawEventRecord};
use serde_json::Value;
use std::cmp::Ordering;

/// Catalog of every offer in `records`, which should be the unfiltered
/// dataset so the selector never loses options when a filter is applied.
pub fn extract_offer_catalog(records: &[RawEventRecord]) -> OfferCatalog {
    let mut ids: Vec<String> = Vec::new();
    for record in records {
        let id = record.offer_id.to_string();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    sort_offer_ids(&mut ids);
    OfferCatalog::from_ordered(ids)
}

/// Catalog from an upstream `offer_ids` list.
///
/// The upstream already orders its ids, so they are kept as given. An empty
/// list carries no information and keeps `previous` (or the bare sentinel).
pub fn catalog_from_remote(ids: &[Value], previous: Option<&OfferCatalog>) -> OfferCatalog {
    let rendered: Vec<String> = ids.iter().filter_map(render_scalar).collect();
    if rendered.is_empty() {
        return previous.cloned().unwrap_or_default();
    }
    OfferCatalog::from_ordered(rendered)
}

/// Sorts ids with the pairwise offer comparator.
///
/// The comparator is not a total order over mixed numeric/text ids, so a
/// stable insertion sort applies it directly instead of `sort_by`.
pub fn sort_offer_ids(ids: &mut [String]) {
    for i in 1..ids.len() {
        let mut j = i;
        while j > 0 && compare_offer_ids(&ids[j - 1], &ids[j]) == Ordering::Greater {
            ids.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// Numeric order when both ids parse as finite numbers, lexical otherwise.
pub fn compare_offer_ids(a: &str, b: &str) -> Ordering {
    match (parse_numeric(a), parse_numeric(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

fn parse_numeric(id: &str) -> Option<f64> {
    id.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
