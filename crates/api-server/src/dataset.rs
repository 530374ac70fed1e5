//! Local event dataset backing the upstream-compatible endpoints.

use chrono::{Days, NaiveDate};
use funnel_analytics::filter_records;
use funnel_core::types::{DateRange, Dimension, FunnelCounts, OfferSelector, RawEventRecord};
use funnel_core::wire::{
    AnalyticsEnvelope, AnalyticsPayload, RawDataEnvelope, ResponseMeta, WireDateRange, WireRow,
    WireSummary,
};
use funnel_core::{FunnelError, FunnelResult};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::info;

/// Group key as the aggregation service's SQL `GROUP BY` sees it. Empty
/// strings and zero bid floors are ordinary values; a missing column is
/// `NULL`. The consumer-side normalizer folds all of these into `"Unknown"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ServedKey {
    Null,
    Text(String),
    Floor(u64),
}

impl ServedKey {
    fn of(record: &RawEventRecord, dimension: Dimension) -> Self {
        let text = match dimension {
            Dimension::Publisher => &record.publisher,
            Dimension::Bundle => &record.bundle,
            Dimension::Brand => &record.brand,
            Dimension::Model => &record.model,
            Dimension::AdType => &record.ad_type,
            // `+ 0.0` folds -0.0 into 0.0.
            Dimension::BidFloor => {
                return record
                    .bid_floor
                    .map_or(Self::Null, |v| Self::Floor((v + 0.0).to_bits()))
            }
        };
        text.as_ref().map_or(Self::Null, |s| Self::Text(s.clone()))
    }

    fn into_value(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Text(s) => Value::String(s),
            Self::Floor(bits) => Value::from(f64::from_bits(bits)),
        }
    }
}

/// Sums per raw key, ranked by clicks descending. Ties keep first-seen
/// order.
fn served_groups<'a, I>(records: I, dimension: Dimension) -> Vec<(ServedKey, FunnelCounts)>
where
    I: IntoIterator<Item = &'a RawEventRecord>,
{
    let mut index: HashMap<ServedKey, usize> = HashMap::new();
    let mut groups: Vec<(ServedKey, FunnelCounts)> = Vec::new();
    for record in records {
        let key = ServedKey::of(record, dimension);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push((key, FunnelCounts::default()));
            groups.len() - 1
        });
        groups[slot].1.accumulate(&record.counts());
    }
    groups.sort_by(|a, b| b.1.clicks.cmp(&a.1.clicks));
    groups
}

pub struct Dataset {
    records: Vec<RawEventRecord>,
    source: String,
}

impl Dataset {
    pub fn new(records: Vec<RawEventRecord>, source: impl Into<String>) -> Self {
        Self {
            records,
            source: source.into(),
        }
    }

    /// Reads a JSON array or newline-delimited JSON file of event records.
    pub fn load(path: &Path) -> FunnelResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let source = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "local".to_string());
        let dataset = Self::parse(&text, source)?;
        info!(
            path = %path.display(),
            records = dataset.records.len(),
            "Dataset loaded"
        );
        Ok(dataset)
    }

    pub fn parse(text: &str, source: impl Into<String>) -> FunnelResult<Self> {
        let trimmed = text.trim_start();
        let records = if trimmed.starts_with('[') {
            serde_json::from_str(trimmed)?
        } else {
            trimmed
                .lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(n, line)| {
                    serde_json::from_str(line)
                        .map_err(|e| FunnelError::Dataset(format!("line {}: {e}", n + 1)))
                })
                .collect::<FunnelResult<Vec<RawEventRecord>>>()?
        };
        Ok(Self::new(records, source))
    }

    pub fn records(&self) -> &[RawEventRecord] {
        &self.records
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Dimension rollup in the aggregation service's response shape.
    ///
    /// Summary sums cover every matching record; rows are truncated to
    /// `limit`. Offer ids are the distinct offers in the date range,
    /// regardless of the offer filter.
    pub fn analytics(
        &self,
        dimension: Dimension,
        range: &DateRange,
        offer: &OfferSelector,
        limit: usize,
    ) -> FunnelResult<AnalyticsEnvelope> {
        let groups = served_groups(filter_records(&self.records, range, offer), dimension);

        let mut totals = FunnelCounts::default();
        for (_, counts) in &groups {
            totals.accumulate(counts);
        }

        let aggregated = groups
            .into_iter()
            .take(limit)
            .map(|(key, counts)| serde_json::to_value(WireRow::new(key.into_value(), counts)))
            .collect::<Result<Vec<Value>, _>>()?;

        let offer_ids: BTreeSet<i64> = self
            .records
            .iter()
            .filter(|r| range.contains(r.date))
            .map(|r| r.offer_id)
            .collect();

        let payload = AnalyticsPayload {
            dimension: Some(dimension.wire_name().to_string()),
            date_range: Some(serde_json::to_value(WireDateRange::from(*range))?),
            summary: serde_json::to_value(WireSummary::from(totals))?,
            aggregated,
            offer_ids: offer_ids.into_iter().map(Value::from).collect(),
        };
        let meta = ResponseMeta {
            total_rows: payload.aggregated.len(),
            source: self.source.clone(),
        };
        Ok(AnalyticsEnvelope::success(payload, meta))
    }

    /// Records dated on or after `today - days`, at most `limit` of them.
    pub fn recent(&self, days: i64, limit: usize, today: NaiveDate) -> RawDataEnvelope {
        let since = today
            .checked_sub_days(Days::new(days.max(0) as u64))
            .unwrap_or(NaiveDate::MIN);
        let data = self
            .records
            .iter()
            .filter(|r| r.date >= since)
            .take(limit)
            .cloned()
            .collect();
        RawDataEnvelope::success(data, self.source.clone())
    }
}
