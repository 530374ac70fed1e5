//! Local rollup: the full pipeline over raw records.

use crate::catalog::extract_offer_catalog;
use crate::filter::filter_records;
use crate::group::{build_rows, group_reduce};
use crate::metrics::derive;
use funnel_core::types::{
    AggregatedRow, FunnelCounts, OfferCatalog, RawEventRecord, RollupParams, Summary,
};
use tracing::debug;

/// Result of rolling up a raw dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalRollup {
    pub summary: Summary,
    pub aggregated: Vec<AggregatedRow>,
    pub offer_ids: OfferCatalog,
}

/// Filters, groups, reduces, derives and ranks `records` per `params`.
///
/// The summary is folded from the ranked rows, so its totals equal the sum
/// of the rows exactly (including the floating-point revenue total when
/// summed in row order). The offer catalog covers the unfiltered dataset.
pub fn rollup(records: &[RawEventRecord], params: &RollupParams) -> LocalRollup {
    let filtered = filter_records(records, &params.range, &params.offer);
    let aggregated = build_rows(group_reduce(filtered.iter().copied(), params.dimension));
    let summary = summarize(&aggregated);

    debug!(
        dimension = %params.dimension,
        offer = %params.offer,
        input = records.len(),
        matched = filtered.len(),
        groups = aggregated.len(),
        "Local rollup computed"
    );

    LocalRollup {
        summary,
        aggregated,
        offer_ids: extract_offer_catalog(records),
    }
}

/// Totals over `rows` with recomputed ratios.
pub fn summarize(rows: &[AggregatedRow]) -> Summary {
    let totals = rows.iter().fold(FunnelCounts::default(), |mut acc, row| {
        acc.accumulate(&row.counts());
        acc
    });
    Summary::new(totals, derive(&totals))
}
