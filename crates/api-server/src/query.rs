//! Query-string handling shared by the HTTP endpoints.
//!
//! Numeric parameters are lenient: a value that does not parse falls back to
//! its default instead of rejecting the request. Dates are strict.

use chrono::NaiveDate;
use funnel_core::types::{DateRange, Dimension, OfferSelector, ALL_OFFERS};
use serde::Deserialize;
use thiserror::Error;
use utoipa::IntoParams;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Unsupported dimension: {0}")]
    UnsupportedDimension(String),
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RangeQuery {
    /// First day, `YYYY-MM-DD`. Only used together with `end`.
    pub start: Option<String>,
    /// Last day, inclusive.
    pub end: Option<String>,
    /// Trailing window in days when no explicit range is given.
    pub days: Option<String>,
    /// Offer filter; `ALL` or empty selects every offer.
    pub offer_id: Option<String>,
    /// Maximum number of rows returned.
    pub limit: Option<String>,
}

impl RangeQuery {
    /// Explicit `start`..`end` when both are present, otherwise the trailing
    /// `days` window ending `today`.
    pub fn range(&self, default_days: i64, today: NaiveDate) -> Result<DateRange, QueryError> {
        match (non_empty(&self.start), non_empty(&self.end)) {
            (Some(start), Some(end)) => Ok(DateRange::new(parse_day(start)?, parse_day(end)?)),
            _ => Ok(DateRange::last_days(self.days_or(default_days), today)),
        }
    }

    pub fn days_or(&self, default_days: i64) -> i64 {
        lenient(&self.days).unwrap_or(default_days)
    }

    pub fn limit_or(&self, default_limit: usize) -> usize {
        lenient(&self.limit).unwrap_or(default_limit)
    }

    pub fn offer(&self) -> OfferSelector {
        match non_empty(&self.offer_id) {
            None | Some(ALL_OFFERS) => OfferSelector::All,
            Some(id) => OfferSelector::Offer(id.to_string()),
        }
    }
}

/// Parameters of the raw record listing.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DataQuery {
    /// Trailing window in days.
    pub days: Option<String>,
    /// Maximum number of records returned.
    pub limit: Option<String>,
}

impl DataQuery {
    pub fn days_or(&self, default_days: i64) -> i64 {
        lenient(&self.days).unwrap_or(default_days)
    }

    pub fn limit_or(&self, default_limit: usize) -> usize {
        lenient(&self.limit).unwrap_or(default_limit)
    }
}

/// Upstream-compatible endpoints take the snake_case wire name only.
pub fn wire_dimension(name: &str) -> Result<Dimension, QueryError> {
    Dimension::from_wire(name).ok_or_else(|| QueryError::UnsupportedDimension(name.to_string()))
}

/// Consumer endpoints accept either spelling.
pub fn any_dimension(name: &str) -> Result<Dimension, QueryError> {
    name.parse()
        .map_err(|_| QueryError::UnsupportedDimension(name.to_string()))
}

fn parse_day(s: &str) -> Result<NaiveDate, QueryError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| QueryError::InvalidDate(s.to_string()))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn lenient<T: std::str::FromStr>(value: &Option<String>) -> Option<T> {
    non_empty(value).and_then(|s| s.parse().ok())
}
