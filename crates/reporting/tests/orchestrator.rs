//! Cycle behaviour against scripted analytics sources.

use async_trait::async_trait;
use chrono::Utc;
use funnel_core::config::SyntheticConfig;
use funnel_core::types::{
    DateRange, Dimension, OfferSelector, Provenance, RollupParams, ALL_OFFERS,
};
use funnel_core::wire::AnalyticsPayload;
use funnel_core::SourceError;
use funnel_reporting::{CyclePhase, RollupOrchestrator};
use funnel_source::{AnalyticsSource, UnavailableSource};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Barrier};
use std::time::Duration;
use tokio::sync::oneshot;

fn params(dimension: Dimension) -> RollupParams {
    RollupParams {
        dimension,
        offer: OfferSelector::All,
        range: DateRange::last_days(7, Utc::now().date_naive()),
    }
}

fn synthetic() -> SyntheticConfig {
    SyntheticConfig {
        days: 7,
        records_per_day: 40,
        seed: Some(7),
    }
}

fn payload(offer_ids: serde_json::Value) -> AnalyticsPayload {
    serde_json::from_value(json!({
        "dimension": "publisher",
        "summary": { "clicks": "1000", "installs": 12, "events": 300, "revenues": "450.5" },
        "aggregated": [
            { "dimension_key": "pubB", "clicks": 400, "installs": 2, "events": 100, "revenues": 90.0 },
            { "dimensionKey": "pubA", "clicks": 600, "installs": 10, "events": 200, "revenues": 360.5 }
        ],
        "offer_ids": offer_ids
    }))
    .unwrap()
}

/// Replays queued results in call order.
struct ScriptedSource {
    results: Mutex<VecDeque<Result<AnalyticsPayload, SourceError>>>,
}

impl ScriptedSource {
    fn new(results: Vec<Result<AnalyticsPayload, SourceError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
        }
    }
}

#[async_trait]
impl AnalyticsSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, _params: &RollupParams) -> Result<AnalyticsPayload, SourceError> {
        self.results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(SourceError::Transport("script exhausted".into())))
    }
}

/// Holds each fetch until its dimension's gate is released.
struct GatedSource {
    gates: Mutex<HashMap<Dimension, oneshot::Receiver<Result<AnalyticsPayload, SourceError>>>>,
}

#[async_trait]
impl AnalyticsSource for GatedSource {
    fn name(&self) -> &str {
        "gated"
    }

    async fn fetch(&self, params: &RollupParams) -> Result<AnalyticsPayload, SourceError> {
        let gate = self.gates.lock().remove(&params.dimension);
        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(SourceError::Transport("gate dropped".into()))),
            None => Err(SourceError::Transport("no gate".into())),
        }
    }
}

/// Fails every fetch after a short delay.
struct SlowFailingSource;

#[async_trait]
impl AnalyticsSource for SlowFailingSource {
    fn name(&self) -> &str {
        "slow-failing"
    }

    async fn fetch(&self, _params: &RollupParams) -> Result<AnalyticsPayload, SourceError> {
        tokio::time::sleep(Duration::from_millis(30)).await;
        Err(SourceError::Transport("unreachable".into()))
    }
}

fn gated(
    dimensions: &[Dimension],
) -> (
    Arc<GatedSource>,
    HashMap<Dimension, oneshot::Sender<Result<AnalyticsPayload, SourceError>>>,
) {
    let mut gates = HashMap::new();
    let mut senders = HashMap::new();
    for &dimension in dimensions {
        let (tx, rx) = oneshot::channel();
        gates.insert(dimension, rx);
        senders.insert(dimension, tx);
    }
    (
        Arc::new(GatedSource {
            gates: Mutex::new(gates),
        }),
        senders,
    )
}

#[tokio::test]
async fn test_remote_success_is_normalized() {
    let source = Arc::new(ScriptedSource::new(vec![Ok(payload(json!([1002, "1001", 1010])))]));
    let orchestrator = RollupOrchestrator::new(source, synthetic());

    let report = orchestrator
        .run_cycle(params(Dimension::Publisher))
        .await
        .expect("sole cycle commits");

    assert_eq!(report.provenance, Provenance::Remote);
    assert_eq!(report.generation, 1);
    assert_eq!(report.summary.clicks, 1000);
    assert!((report.summary.revenues - 450.5).abs() < 1e-9);
    assert!((report.summary.cvr - 120.0).abs() < 1e-9);
    assert!((report.summary.evr - 30.0).abs() < 1e-9);

    let keys: Vec<&str> = report.aggregated.iter().map(|r| r.dimension_key.as_str()).collect();
    assert_eq!(keys, vec!["pubA", "pubB"]);
    assert_eq!(report.offer_ids.as_slice(), &[ALL_OFFERS, "1002", "1001", "1010"]);
    assert_eq!(orchestrator.phase(), CyclePhase::Ready);
}

#[tokio::test]
async fn test_failure_falls_back_to_synthetic() {
    let source = Arc::new(ScriptedSource::new(vec![Err(SourceError::Http { status: 503 })]));
    let orchestrator = RollupOrchestrator::new(source, synthetic());

    let report = orchestrator
        .run_cycle(params(Dimension::Brand))
        .await
        .expect("sole cycle commits");

    assert_eq!(report.provenance, Provenance::Mock);
    assert!(!report.aggregated.is_empty());
    assert_eq!(report.offer_ids.as_slice()[0], ALL_OFFERS);

    let clicks: u64 = report.aggregated.iter().map(|r| r.clicks).sum();
    let installs: u64 = report.aggregated.iter().map(|r| r.installs).sum();
    assert_eq!(clicks, report.summary.clicks);
    assert_eq!(installs, report.summary.installs);
    assert!(report
        .aggregated
        .windows(2)
        .all(|w| w[0].clicks >= w[1].clicks));
}

#[tokio::test]
async fn test_seeded_fallback_is_reproducible() {
    let a = RollupOrchestrator::new(Arc::new(UnavailableSource), synthetic())
        .with_rng(StdRng::seed_from_u64(99));
    let b = RollupOrchestrator::new(Arc::new(UnavailableSource), synthetic())
        .with_rng(StdRng::seed_from_u64(99));

    let p = params(Dimension::AdType);
    let ra = a.evaluate(&p).await;
    let rb = b.evaluate(&p).await;
    assert_eq!(ra.summary, rb.summary);
    assert_eq!(ra.aggregated, rb.aggregated);
}

#[tokio::test]
async fn test_evaluate_leaves_state_untouched() {
    let orchestrator = RollupOrchestrator::new(Arc::new(UnavailableSource), synthetic());
    let report = orchestrator.evaluate(&params(Dimension::Model)).await;

    assert_eq!(report.generation, 0);
    assert!(orchestrator.latest_report().is_none());
    assert_eq!(orchestrator.phase(), CyclePhase::Idle);
}

#[tokio::test]
async fn test_empty_remote_catalog_keeps_previous() {
    let source = Arc::new(ScriptedSource::new(vec![
        Ok(payload(json!([1001, 1002]))),
        Ok(payload(json!([]))),
    ]));
    let orchestrator = RollupOrchestrator::new(source, synthetic());

    orchestrator.run_cycle(params(Dimension::Publisher)).await;
    let second = orchestrator
        .run_cycle(params(Dimension::Publisher))
        .await
        .expect("second cycle commits");

    assert_eq!(second.generation, 2);
    assert_eq!(second.offer_ids.as_slice(), &[ALL_OFFERS, "1001", "1002"]);
}

#[tokio::test]
async fn test_superseded_cycle_is_discarded() {
    let (source, mut senders) = gated(&[Dimension::Publisher, Dimension::Brand]);
    let orchestrator = Arc::new(RollupOrchestrator::new(source, synthetic()));

    let first = orchestrator.begin_cycle();
    let second = orchestrator.begin_cycle();
    assert!(second > first);

    let o1 = Arc::clone(&orchestrator);
    let slow = tokio::spawn(async move { o1.complete_cycle(first, params(Dimension::Publisher)).await });
    let o2 = Arc::clone(&orchestrator);
    let fast = tokio::spawn(async move { o2.complete_cycle(second, params(Dimension::Brand)).await });

    let mut brand = payload(json!([1001]));
    brand.dimension = Some("brand".into());
    senders.remove(&Dimension::Brand).unwrap().send(Ok(brand)).unwrap();
    let committed = fast.await.unwrap().expect("newest cycle commits");
    assert_eq!(committed.dimension, Dimension::Brand);

    senders
        .remove(&Dimension::Publisher)
        .unwrap()
        .send(Ok(payload(json!([1001]))))
        .unwrap();
    assert!(slow.await.unwrap().is_none());

    let latest = orchestrator.latest_report().unwrap();
    assert_eq!(latest.dimension, Dimension::Brand);
    assert_eq!(latest.generation, second.value());
    assert_eq!(orchestrator.phase(), CyclePhase::Ready);
}

#[tokio::test]
async fn test_spawn_cycle_aborts_inflight() {
    let (source, mut senders) = gated(&[Dimension::Publisher]);
    let orchestrator = Arc::new(RollupOrchestrator::new(source, synthetic()));

    // Publisher never gets released.
    let (_, stale) = orchestrator.spawn_cycle(params(Dimension::Publisher));
    // No gate for Bundle: the fetch fails and the fallback runs.
    let (generation, fresh) = orchestrator.spawn_cycle(params(Dimension::Bundle));

    let report = fresh.await.unwrap().expect("newest cycle commits");
    assert_eq!(report.provenance, Provenance::Mock);
    assert_eq!(report.dimension, Dimension::Bundle);
    assert_eq!(report.generation, generation.value());

    let err = stale.await.unwrap_err();
    assert!(err.is_cancelled());
    drop(senders.remove(&Dimension::Publisher));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_spawns_commit_newest() {
    for _ in 0..20 {
        let orchestrator = Arc::new(RollupOrchestrator::new(Arc::new(SlowFailingSource), synthetic()));
        let barrier = Arc::new(Barrier::new(2));

        let callers: Vec<_> = [Dimension::Publisher, Dimension::Brand]
            .into_iter()
            .map(|dimension| {
                let orchestrator = Arc::clone(&orchestrator);
                let barrier = Arc::clone(&barrier);
                tokio::task::spawn_blocking(move || {
                    barrier.wait();
                    orchestrator.spawn_cycle(params(dimension))
                })
            })
            .collect();

        let mut spawned = Vec::new();
        for caller in callers {
            spawned.push(caller.await.unwrap());
        }
        spawned.sort_by_key(|(generation, _)| *generation);
        let (newest, newest_handle) = spawned.pop().unwrap();
        let (_, older_handle) = spawned.pop().unwrap();

        assert_eq!(orchestrator.latest_generation(), newest);
        let report = newest_handle.await.unwrap().expect("newest cycle commits");
        assert_eq!(report.generation, newest.value());
        match older_handle.await {
            Ok(committed) => assert!(committed.is_none()),
            Err(e) => assert!(e.is_cancelled()),
        }

        assert_eq!(orchestrator.phase(), CyclePhase::Ready);
        assert_eq!(orchestrator.latest_report().unwrap().generation, newest.value());
    }
}
