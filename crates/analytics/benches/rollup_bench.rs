//! Benchmarks for the local rollup pipeline.
//! Run with: cargo bench -p funnel-analytics

use chrono::NaiveDate;
use funnel_analytics::{generate_panel, rollup};
use funnel_core::config::SyntheticConfig;
use funnel_core::types::{DateRange, Dimension, OfferSelector, RollupParams};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;

fn main() {
    let today = NaiveDate::from_ymd_opt(2024, 6, 30).expect("valid date");
    let config = SyntheticConfig {
        days: 30,
        records_per_day: 5_000,
        seed: Some(42),
    };
    let records = generate_panel(&mut StdRng::seed_from_u64(42), &config, today);

    let iterations = 50;

    for dimension in Dimension::ALL {
        let params = RollupParams {
            dimension,
            offer: OfferSelector::All,
            range: DateRange::last_days(7, today),
        };

        // Warmup
        for _ in 0..5 {
            let _ = rollup(&records, &params);
        }

        let start = Instant::now();
        for _ in 0..iterations {
            let _ = rollup(&records, &params);
        }
        let elapsed = start.elapsed();

        println!(
            "{:<10} {} records: {:.2} ms/rollup",
            dimension.as_str(),
            records.len(),
            elapsed.as_secs_f64() * 1000.0 / iterations as f64,
        );
    }
}
