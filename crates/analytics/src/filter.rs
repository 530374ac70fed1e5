//! Record selection by date range and offer.

use funnel_core::types::{DateRange, OfferSelector, RawEventRecord};

/// Returns the records dated within `range` (inclusive) that match `offer`,
/// in their original order.
pub fn filter_records<'a>(
    records: &'a [RawEventRecord],
    range: &DateRange,
    offer: &OfferSelector,
) -> Vec<&'a RawEventRecord> {
    records
        .iter()
        .filter(|r| range.contains(r.date) && offer.matches(r.offer_id))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn record(id: &str, date: &str, offer_id: i64) -> RawEventRecord {
        RawEventRecord {
            id: id.to_string(),
            date: day(date),
            offer_id,
            publisher: None,
            bundle: None,
            brand: None,
            model: None,
            ad_type: None,
            bid_floor: None,
            clicks: 1,
            installs: 0,
            events: 0,
            revenues: 0.0,
        }
    }

    #[test]
    fn test_inclusive_bounds() {
        let records = vec![
            record("a", "2024-01-01", 1),
            record("b", "2024-01-02", 1),
            record("c", "2024-01-03", 1),
            record("d", "2024-01-04", 1),
        ];
        let range = DateRange::new(day("2024-01-02"), day("2024-01-03"));
        let ids: Vec<_> = filter_records(&records, &range, &OfferSelector::All)
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, ["b", "c"]);
    }

    #[test]
    fn test_offer_selector_keeps_order() {
        let records = vec![
            record("a", "2024-01-01", 2),
            record("b", "2024-01-01", 1),
            record("c", "2024-01-01", 2),
        ];
        let range = DateRange::new(day("2024-01-01"), day("2024-01-01"));
        let ids: Vec<_> = filter_records(&records, &range, &OfferSelector::from("2"))
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[test]
    fn test_empty_intersection() {
        let records = vec![record("a", "2024-01-01", 1)];
        let range = DateRange::new(day("2024-02-01"), day("2024-02-28"));
        assert!(filter_records(&records, &range, &OfferSelector::All).is_empty());
        let range = DateRange::new(day("2024-01-01"), day("2024-01-01"));
        assert!(filter_records(&records, &range, &OfferSelector::from("99")).is_empty());
    }
}
