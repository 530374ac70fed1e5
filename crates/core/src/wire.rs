//! Wire format of the aggregation service's `/api/analytics/{dimension}`
//! endpoint. Used both to serve it and to consume it.
//!
//! Inbound payload fields stay as loose JSON values: the upstream is not
//! trusted to type its numbers consistently, and the normalizer coerces them.

use crate::error::SourceError;
use crate::types::{DateRange, FunnelCounts, RawEventRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Status code the upstream puts in `code` for a usable response.
pub const SUCCESS_CODE: i64 = 200;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsEnvelope {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AnalyticsPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

impl AnalyticsEnvelope {
    pub fn success(data: AnalyticsPayload, meta: ResponseMeta) -> Self {
        Self {
            code: SUCCESS_CODE,
            message: "success".to_string(),
            data: Some(data),
            meta: Some(meta),
        }
    }

    pub fn failure(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
            meta: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsPayload {
    #[serde(default)]
    pub dimension: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub date_range: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub summary: Value,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[schema(value_type = Vec<Object>)]
    pub aggregated: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[schema(value_type = Vec<Object>)]
    pub offer_ids: Vec<Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResponseMeta {
    pub total_rows: usize,
    pub source: String,
}

/// Summary block as the service emits it: sums only, no ratios.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct WireSummary {
    pub clicks: u64,
    pub installs: u64,
    pub events: u64,
    pub revenues: f64,
}

/// Outbound aggregated row. The key is the raw grouped value: a string, a
/// bid floor number, or `null` when the column is missing.
#[derive(Debug, Clone, Serialize)]
pub struct WireRow {
    pub dimension_key: Value,
    pub clicks: u64,
    pub installs: u64,
    pub events: u64,
    pub revenues: f64,
}

impl From<FunnelCounts> for WireSummary {
    fn from(counts: FunnelCounts) -> Self {
        Self {
            clicks: counts.clicks,
            installs: counts.installs,
            events: counts.events,
            revenues: counts.revenues,
        }
    }
}

impl WireRow {
    pub fn new(dimension_key: Value, counts: FunnelCounts) -> Self {
        Self {
            dimension_key,
            clicks: counts.clicks,
            installs: counts.installs,
            events: counts.events,
            revenues: counts.revenues,
        }
    }
}

/// Envelope of the raw `/api/data` listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RawDataEnvelope {
    pub code: i64,
    pub message: String,
    pub data: Vec<RawEventRecord>,
    pub meta: ResponseMeta,
}

impl RawDataEnvelope {
    pub fn success(data: Vec<RawEventRecord>, source: impl Into<String>) -> Self {
        let meta = ResponseMeta {
            total_rows: data.len(),
            source: source.into(),
        };
        Self {
            code: SUCCESS_CODE,
            message: "success".to_string(),
            data,
            meta,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct WireDateRange {
    pub start: chrono::NaiveDate,
    pub end: chrono::NaiveDate,
}

impl From<DateRange> for WireDateRange {
    fn from(range: DateRange) -> Self {
        Self {
            start: range.start,
            end: range.end,
        }
    }
}

/// Validates a decoded response body and extracts its payload.
///
/// The body is usable only when `code` is the number 200 and `data` is an
/// object whose `aggregated` and `offer_ids` (when present) are arrays.
pub fn parse_envelope(body: Value) -> Result<AnalyticsPayload, SourceError> {
    let Value::Object(mut fields) = body else {
        return Err(SourceError::Schema("response is not a JSON object".into()));
    };

    match fields.get("code").and_then(Value::as_i64) {
        Some(SUCCESS_CODE) => {}
        Some(code) => return Err(SourceError::Schema(format!("response code {code}"))),
        None => return Err(SourceError::Schema("missing numeric code".into())),
    }

    let data = match fields.remove("data") {
        Some(data @ Value::Object(_)) => data,
        Some(Value::Null) | None => return Err(SourceError::Schema("missing data".into())),
        Some(_) => return Err(SourceError::Schema("data is not an object".into())),
    };

    let mut payload: AnalyticsPayload =
        serde_json::from_value(data).map_err(|e| SourceError::Schema(e.to_string()))?;
    if payload.summary.is_null() {
        payload.summary = Value::Object(Default::default());
    }
    Ok(payload)
}
