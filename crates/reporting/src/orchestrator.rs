//! Rollup orchestration: remote fetch with synthetic fallback, latest-wins.
//!
//! Each parameter change issues a new [`Generation`]. A cycle asks the
//! aggregation service first; on any failure it synthesizes a panel and
//! rolls it up locally. Whatever it produces is committed only if no newer
//! cycle was issued in the meantime.

use crate::generation::{is_current, Generation};
use chrono::Utc;
use funnel_analytics::{generate_panel, normalize_remote, rollup};
use funnel_core::config::SyntheticConfig;
use funnel_core::types::{OfferCatalog, Provenance, RollupParams, RollupReport, Summary};
use funnel_source::AnalyticsSource;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Where the newest cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "provenance", rename_all = "lowercase")]
pub enum CyclePhase {
    Idle,
    Fetching,
    Generating,
    Normalizing(Provenance),
    Ready,
}

struct CycleState {
    latest: Generation,
    phase: CyclePhase,
    committed: Option<Arc<RollupReport>>,
    inflight: Option<AbortHandle>,
}

impl CycleState {
    fn issue(&mut self) -> Generation {
        self.latest = self.latest.next();
        self.phase = CyclePhase::Fetching;
        metrics::counter!("rollup.cycles").increment(1);
        self.latest
    }
}

pub struct RollupOrchestrator {
    source: Arc<dyn AnalyticsSource>,
    synthetic: SyntheticConfig,
    rng: Mutex<StdRng>,
    state: Mutex<CycleState>,
}

impl RollupOrchestrator {
    pub fn new(source: Arc<dyn AnalyticsSource>, synthetic: SyntheticConfig) -> Self {
        let rng = match synthetic.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        info!(
            source = source.name(),
            days = synthetic.days,
            records_per_day = synthetic.records_per_day,
            "Rollup orchestrator initialized"
        );
        Self {
            source,
            synthetic,
            rng: Mutex::new(rng),
            state: Mutex::new(CycleState {
                latest: Generation::default(),
                phase: CyclePhase::Idle,
                committed: None,
                inflight: None,
            }),
        }
    }

    /// Replaces the fallback generator.
    pub fn with_rng(self, rng: StdRng) -> Self {
        *self.rng.lock() = rng;
        self
    }

    pub fn phase(&self) -> CyclePhase {
        self.state.lock().phase
    }

    pub fn latest_generation(&self) -> Generation {
        self.state.lock().latest
    }

    /// Last committed report, if any cycle has completed.
    pub fn latest_report(&self) -> Option<Arc<RollupReport>> {
        self.state.lock().committed.clone()
    }

    /// Issues the next generation. Any cycle issued earlier becomes stale.
    pub fn begin_cycle(&self) -> Generation {
        self.state.lock().issue()
    }

    /// Runs a cycle for `params` and commits it if it is still the newest.
    /// Returns `None` when a newer cycle superseded this one.
    pub async fn run_cycle(&self, params: RollupParams) -> Option<Arc<RollupReport>> {
        let generation = self.begin_cycle();
        self.complete_cycle(generation, params).await
    }

    /// Produces and commits the cycle issued as `generation`.
    pub async fn complete_cycle(
        &self,
        generation: Generation,
        params: RollupParams,
    ) -> Option<Arc<RollupReport>> {
        let previous = self.latest_report().map(|r| r.offer_ids.clone());
        let report = self.produce(generation, &params, previous.as_ref()).await;
        self.commit(generation, report)
    }

    /// Starts a cycle on the runtime, aborting the one still in flight.
    ///
    /// Issuing the generation and replacing the in-flight task happen under
    /// one lock, so concurrent callers can never abort a newer cycle.
    pub fn spawn_cycle(
        self: &Arc<Self>,
        params: RollupParams,
    ) -> (Generation, JoinHandle<Option<Arc<RollupReport>>>) {
        let mut state = self.state.lock();
        let generation = state.issue();
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.complete_cycle(generation, params).await });

        if let Some(previous) = state.inflight.replace(handle.abort_handle()) {
            previous.abort();
        }
        (generation, handle)
    }

    /// One-off evaluation outside the tracked sequence. Does not touch the
    /// committed report or the phase.
    pub async fn evaluate(&self, params: &RollupParams) -> RollupReport {
        self.produce(Generation::UNTRACKED, params, None).await
    }

    async fn produce(
        &self,
        generation: Generation,
        params: &RollupParams,
        previous_catalog: Option<&OfferCatalog>,
    ) -> RollupReport {
        match self.source.fetch(params).await {
            Ok(payload) => {
                self.set_phase(generation, CyclePhase::Normalizing(Provenance::Remote));
                metrics::counter!("rollup.remote").increment(1);
                let remote = normalize_remote(&payload, previous_catalog);
                debug!(
                    generation = generation.value(),
                    rows = remote.aggregated.len(),
                    "Remote rollup normalized"
                );
                RollupReport {
                    summary: remote.summary,
                    aggregated: remote.aggregated,
                    offer_ids: remote.offer_ids,
                    ..report_shell(generation, params, Provenance::Remote)
                }
            }
            Err(e) => {
                warn!(
                    source = self.source.name(),
                    dimension = params.dimension.as_str(),
                    error = %e,
                    "Analytics source failed, using synthetic data"
                );
                metrics::counter!("rollup.fallback", "kind" => e.kind()).increment(1);

                self.set_phase(generation, CyclePhase::Generating);
                let today = Utc::now().date_naive();
                let records = {
                    let mut rng = self.rng.lock();
                    generate_panel(&mut *rng, &self.synthetic, today)
                };

                self.set_phase(generation, CyclePhase::Normalizing(Provenance::Mock));
                let local = rollup(&records, params);
                RollupReport {
                    summary: local.summary,
                    aggregated: local.aggregated,
                    offer_ids: local.offer_ids,
                    ..report_shell(generation, params, Provenance::Mock)
                }
            }
        }
    }

    fn set_phase(&self, generation: Generation, phase: CyclePhase) {
        let mut state = self.state.lock();
        if is_current(generation, state.latest) {
            state.phase = phase;
        }
    }

    fn commit(&self, generation: Generation, report: RollupReport) -> Option<Arc<RollupReport>> {
        if generation == Generation::UNTRACKED {
            return None;
        }
        let mut state = self.state.lock();
        if !is_current(generation, state.latest) {
            metrics::counter!("rollup.stale_discarded").increment(1);
            debug!(
                generation = generation.value(),
                latest = state.latest.value(),
                "Discarding superseded rollup"
            );
            return None;
        }

        let report = Arc::new(report);
        state.committed = Some(Arc::clone(&report));
        state.phase = CyclePhase::Ready;
        info!(
            generation = generation.value(),
            provenance = report.provenance.as_str(),
            rows = report.aggregated.len(),
            "Rollup committed"
        );
        Some(report)
    }
}

fn report_shell(generation: Generation, params: &RollupParams, provenance: Provenance) -> RollupReport {
    RollupReport {
        report_id: Uuid::new_v4(),
        dimension: params.dimension,
        offer: params.offer.clone(),
        date_range: params.range,
        summary: Summary::default(),
        aggregated: Vec::new(),
        offer_ids: OfferCatalog::default(),
        provenance,
        generation: generation.value(),
        generated_at: Utc::now(),
    }
}
