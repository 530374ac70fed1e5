//! Grouping by dimension, per-group reduction, and ranking.

use crate::metrics::derive;
use funnel_core::types::{AggregatedRow, Dimension, FunnelCounts, RawEventRecord, UNKNOWN_KEY};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Sums funnel counts per value of `dimension`.
///
/// Records without a value land in a single `"Unknown"` group. Groups are
/// returned in the order their key was first seen.
pub fn group_reduce<'a, I>(records: I, dimension: Dimension) -> Vec<(String, FunnelCounts)>
where
    I: IntoIterator<Item = &'a RawEventRecord>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, FunnelCounts)> = Vec::new();

    for record in records {
        let key = record
            .dimension_value(dimension)
            .unwrap_or_else(|| UNKNOWN_KEY.to_string());
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, FunnelCounts::default()));
                groups.len() - 1
            }
        };
        groups[slot].1.accumulate(&record.counts());
    }

    groups
}

/// Turns reduced groups into rows with derived ratios, ranked.
pub fn build_rows(groups: Vec<(String, FunnelCounts)>) -> Vec<AggregatedRow> {
    let mut rows: Vec<AggregatedRow> = groups
        .into_iter()
        .map(|(key, counts)| {
            let rates = derive(&counts);
            AggregatedRow::new(key, counts, rates)
        })
        .collect();
    rank_rows(&mut rows);
    rows
}

/// Orders rows by clicks descending, ties by dimension key ascending.
pub fn rank_rows(rows: &mut [AggregatedRow]) {
    rows.sort_by(compare_rank);
}

fn compare_rank(a: &AggregatedRow, b: &AggregatedRow) -> Ordering {
    b.clicks
        .cmp(&a.clicks)
        .then_with(|| a.dimension_key.cmp(&b.dimension_key))
}
