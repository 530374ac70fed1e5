//! Synthetic click/postback panel used when the aggregation service is
//! unavailable.
//!
//! Values are uniform draws from fixed catalogs. The only contract is funnel
//! monotonicity: `installs <= clicks` and `events <= installs` for every
//! record, which holds by construction since each stage is a sub-unit
//! fraction of the previous one.

use chrono::{Days, NaiveDate};
use funnel_core::config::SyntheticConfig;
use funnel_core::types::RawEventRecord;
use rand::Rng;

const PUBLISHERS: &[&str] = &[
    "Pub_A",
    "Pub_B",
    "Pub_C",
    "Pub_D",
    "Pub_E",
    "Google_Ads",
    "FB_Audience",
];
const BUNDLES: &[&str] = &[
    "com.game.rpg",
    "com.app.utility",
    "com.social.chat",
    "com.news.daily",
    "com.video.stream",
];
const DEVICES: &[(&str, &str)] = &[
    ("Apple", "iPhone 13"),
    ("Apple", "iPhone 14 Pro"),
    ("Samsung", "Galaxy S22"),
    ("Xiaomi", "Redmi Note 11"),
    ("Huawei", "P50 Pro"),
    ("Oppo", "Reno 8"),
];
const AD_TYPES: &[&str] = &["Banner", "Interstitial", "Rewarded Video", "Native"];
const BID_FLOORS: &[f64] = &[0.1, 0.5, 1.0, 2.5, 5.0];
const OFFER_IDS: &[i64] = &[1001, 1002, 1003, 1004];

/// Upper bound on the up-front allocation; larger panels grow as they fill.
const PREALLOCATE_MAX: usize = 1 << 16;

const CLICKS_RANGE: std::ops::Range<u64> = 10..510;
const INSTALL_RATE: std::ops::Range<f64> = 0.001..0.051;
const EVENT_RATE: std::ops::Range<f64> = 0.1..0.8;
const EVENT_VALUE: std::ops::Range<f64> = 0.5..2.5;

/// Generates `config.records_per_day` records for each of the last
/// `config.days` days ending on `today`.
pub fn generate_panel<R: Rng + ?Sized>(
    rng: &mut R,
    config: &SyntheticConfig,
    today: NaiveDate,
) -> Vec<RawEventRecord> {
    let days = config.days.max(1) as u64;
    let capacity = usize::try_from(days)
        .unwrap_or(usize::MAX)
        .saturating_mul(config.records_per_day)
        .min(PREALLOCATE_MAX);
    let mut records = Vec::with_capacity(capacity);

    for day in 0..days {
        let Some(date) = today.checked_sub_days(Days::new(day)) else {
            break;
        };
        for index in 0..config.records_per_day {
            records.push(synthesize(rng, format!("{day}-{index}"), date));
        }
    }

    records
}

fn synthesize<R: Rng + ?Sized>(rng: &mut R, id: String, date: NaiveDate) -> RawEventRecord {
    let clicks = rng.gen_range(CLICKS_RANGE);
    let installs = (clicks as f64 * rng.gen_range(INSTALL_RATE)).floor() as u64;
    let events = (installs as f64 * rng.gen_range(EVENT_RATE)).floor() as u64;
    let revenues = events as f64 * rng.gen_range(EVENT_VALUE);
    let (brand, model) = pick(rng, DEVICES);

    RawEventRecord {
        id,
        date,
        offer_id: pick(rng, OFFER_IDS),
        publisher: Some(pick(rng, PUBLISHERS).to_string()),
        bundle: Some(pick(rng, BUNDLES).to_string()),
        brand: Some(brand.to_string()),
        model: Some(model.to_string()),
        ad_type: Some(pick(rng, AD_TYPES).to_string()),
        bid_floor: Some(pick(rng, BID_FLOORS)),
        clicks,
        installs,
        events,
        revenues,
    }
}

fn pick<R: Rng + ?Sized, T: Copy>(rng: &mut R, catalog: &[T]) -> T {
    catalog[rng.gen_range(0..catalog.len())]
}
