use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Sentinel offer selector / catalog entry meaning "every offer".
pub const ALL_OFFERS: &str = "ALL";

/// Dimension key used when a record has no value for the active dimension.
pub const UNKNOWN_KEY: &str = "Unknown";

// ─── Dimensions ─────────────────────────────────────────────────────────────

/// Categorical attribute a rollup groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    Publisher,
    Bundle,
    Brand,
    Model,
    #[serde(alias = "ad_type")]
    AdType,
    #[serde(alias = "bid_floor")]
    BidFloor,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unsupported dimension: {0}")]
pub struct UnknownDimension(pub String);

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Publisher,
        Dimension::Bundle,
        Dimension::Brand,
        Dimension::Model,
        Dimension::AdType,
        Dimension::BidFloor,
    ];

    /// Consumer-facing name.
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Publisher => "publisher",
            Dimension::Bundle => "bundle",
            Dimension::Brand => "brand",
            Dimension::Model => "model",
            Dimension::AdType => "adType",
            Dimension::BidFloor => "bidFloor",
        }
    }

    /// Name used in the aggregation service's URL path and column names.
    pub fn wire_name(self) -> &'static str {
        match self {
            Dimension::AdType => "ad_type",
            Dimension::BidFloor => "bid_floor",
            other => other.as_str(),
        }
    }

    /// Strict parse of the wire spelling only.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.wire_name() == name)
    }
}

impl FromStr for Dimension {
    type Err = UnknownDimension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s || d.wire_name() == s)
            .ok_or_else(|| UnknownDimension(s.to_string()))
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Raw records ────────────────────────────────────────────────────────────

/// One row of the click/postback table, either fetched or synthesized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RawEventRecord {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "dt", alias = "date")]
    pub date: NaiveDate,
    #[serde(alias = "offerId")]
    pub offer_id: i64,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub bundle: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, alias = "adType")]
    pub ad_type: Option<String>,
    #[serde(default, alias = "bidFloor")]
    pub bid_floor: Option<f64>,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub installs: u64,
    #[serde(default)]
    pub events: u64,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub revenues: f64,
}

impl RawEventRecord {
    /// Value of `dimension` for this record, or `None` when absent, empty,
    /// or a zero bid floor.
    pub fn dimension_value(&self, dimension: Dimension) -> Option<String> {
        let text = match dimension {
            Dimension::Publisher => self.publisher.as_deref(),
            Dimension::Bundle => self.bundle.as_deref(),
            Dimension::Brand => self.brand.as_deref(),
            Dimension::Model => self.model.as_deref(),
            Dimension::AdType => self.ad_type.as_deref(),
            Dimension::BidFloor => {
                return self
                    .bid_floor
                    .filter(|v| *v != 0.0 && !v.is_nan())
                    .map(|v| v.to_string());
            }
        };
        text.filter(|s| !s.is_empty()).map(str::to_string)
    }

    pub fn counts(&self) -> FunnelCounts {
        FunnelCounts {
            clicks: self.clicks,
            installs: self.installs,
            events: self.events,
            revenues: self.revenues,
        }
    }
}

/// Accepts a number or numeric string; anything else becomes 0.
fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let amount = match &value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(amount.filter(|v| v.is_finite()).unwrap_or(0.0))
}

// ─── Request parameters ─────────────────────────────────────────────────────

/// Inclusive calendar-day range. `start <= end` is the caller's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Trailing window of `days` days ending on `today`. Non-positive
    /// windows are clamped to a single day.
    pub fn last_days(days: i64, today: NaiveDate) -> Self {
        let span = days.max(1) as u64 - 1;
        let start = today.checked_sub_days(Days::new(span)).unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Offer scoping for a rollup: every offer, or one offer id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OfferSelector {
    #[default]
    All,
    Offer(String),
}

impl OfferSelector {
    pub fn as_str(&self) -> &str {
        match self {
            OfferSelector::All => ALL_OFFERS,
            OfferSelector::Offer(id) => id,
        }
    }

    pub fn matches(&self, offer_id: i64) -> bool {
        match self {
            OfferSelector::All => true,
            OfferSelector::Offer(id) => offer_id.to_string() == *id,
        }
    }
}

impl From<&str> for OfferSelector {
    fn from(s: &str) -> Self {
        if s == ALL_OFFERS {
            OfferSelector::All
        } else {
            OfferSelector::Offer(s.to_string())
        }
    }
}

impl From<String> for OfferSelector {
    fn from(s: String) -> Self {
        if s == ALL_OFFERS {
            OfferSelector::All
        } else {
            OfferSelector::Offer(s)
        }
    }
}

impl From<OfferSelector> for String {
    fn from(selector: OfferSelector) -> Self {
        match selector {
            OfferSelector::All => ALL_OFFERS.to_string(),
            OfferSelector::Offer(id) => id,
        }
    }
}

impl fmt::Display for OfferSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that determines one rollup cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollupParams {
    pub dimension: Dimension,
    pub offer: OfferSelector,
    pub range: DateRange,
}

// ─── Funnel metrics ─────────────────────────────────────────────────────────

/// Summed funnel stage counts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FunnelCounts {
    pub clicks: u64,
    pub installs: u64,
    pub events: u64,
    pub revenues: f64,
}

impl FunnelCounts {
    pub fn accumulate(&mut self, other: &FunnelCounts) {
        self.clicks = self.clicks.saturating_add(other.clicks);
        self.installs = self.installs.saturating_add(other.installs);
        self.events = self.events.saturating_add(other.events);
        self.revenues += other.revenues;
    }
}

/// Ratios derived from funnel counts.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedRates {
    /// Installs per ten thousand clicks.
    pub cvr: f64,
    /// Percentage of installs with a post-install event.
    pub evr: f64,
}

/// Totals over the whole filtered set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct Summary {
    pub clicks: u64,
    pub installs: u64,
    pub events: u64,
    pub revenues: f64,
    pub cvr: f64,
    pub evr: f64,
}

impl Summary {
    pub fn new(counts: FunnelCounts, rates: DerivedRates) -> Self {
        Self {
            clicks: counts.clicks,
            installs: counts.installs,
            events: counts.events,
            revenues: counts.revenues,
            cvr: rates.cvr,
            evr: rates.evr,
        }
    }

    pub fn counts(&self) -> FunnelCounts {
        FunnelCounts {
            clicks: self.clicks,
            installs: self.installs,
            events: self.events,
            revenues: self.revenues,
        }
    }
}

/// Totals for one value of the active dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedRow {
    pub dimension_key: String,
    pub clicks: u64,
    pub installs: u64,
    pub events: u64,
    pub revenues: f64,
    pub cvr: f64,
    pub evr: f64,
}

impl AggregatedRow {
    pub fn new(dimension_key: String, counts: FunnelCounts, rates: DerivedRates) -> Self {
        Self {
            dimension_key,
            clicks: counts.clicks,
            installs: counts.installs,
            events: counts.events,
            revenues: counts.revenues,
            cvr: rates.cvr,
            evr: rates.evr,
        }
    }

    pub fn counts(&self) -> FunnelCounts {
        FunnelCounts {
            clicks: self.clicks,
            installs: self.installs,
            events: self.events,
            revenues: self.revenues,
        }
    }
}

// ─── Offer catalog ──────────────────────────────────────────────────────────

/// Selectable offers: always `"ALL"` first, then distinct offer ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfferCatalog(Vec<String>);

impl OfferCatalog {
    /// Catalog with only the sentinel.
    pub fn sentinel_only() -> Self {
        Self(vec![ALL_OFFERS.to_string()])
    }

    /// Builds a catalog from already-ordered ids. Duplicates and any
    /// sentinel entries in `ids` are dropped.
    pub fn from_ordered<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut entries = vec![ALL_OFFERS.to_string()];
        for id in ids {
            if !entries.contains(&id) {
                entries.push(id);
            }
        }
        Self(entries)
    }

    /// Offer ids without the leading sentinel.
    pub fn offers(&self) -> &[String] {
        &self.0[1..]
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for OfferCatalog {
    fn default() -> Self {
        Self::sentinel_only()
    }
}

// ─── Reports ────────────────────────────────────────────────────────────────

/// Where a report's numbers came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Remote,
    Mock,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Remote => "remote",
            Provenance::Mock => "mock",
        }
    }
}

/// Canonical output of one rollup cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RollupReport {
    pub report_id: Uuid,
    pub dimension: Dimension,
    #[schema(value_type = String)]
    pub offer: OfferSelector,
    pub date_range: DateRange,
    pub summary: Summary,
    pub aggregated: Vec<AggregatedRow>,
    #[schema(value_type = Vec<String>)]
    pub offer_ids: OfferCatalog,
    pub provenance: Provenance,
    pub generation: u64,
    pub generated_at: DateTime<Utc>,
}
