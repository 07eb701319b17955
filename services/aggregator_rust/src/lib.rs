//! aggregator_rust - interval-driven aggregation service for the gold
//! price board: fetch all sources, reconcile, compute deltas, persist.

pub mod adapters;
pub mod config;

pub use config::AggregatorConfig;

use adapters::{build_client, build_feeds};
use anyhow::Result;
use goldboard_core::delta::{DeltaConfig, DeltaEngine};
use goldboard_core::orchestrator::CycleOrchestrator;
use goldboard_core::snapshot::SnapshotStore;
use goldboard_core::types::MillionsValue;
use log::info;
use std::sync::Arc;
use std::time::Duration;

pub struct AggregatorService {
    orchestrator: Arc<CycleOrchestrator>,
    cycle_interval: Duration,
}

impl AggregatorService {
    pub fn new(config: AggregatorConfig) -> Result<Self> {
        let client = build_client(&config)?;
        let (gold_feeds, silver_feed, fx_feed) = build_feeds(&config, &client);
        let store = SnapshotStore::new(config.snapshot_dir.as_str(), config.baseline_anchor_date);
        let delta = DeltaEngine::new(DeltaConfig {
            sanity_bound: MillionsValue::from_f64(config.sanity_bound_millions),
        });
        Ok(Self {
            orchestrator: Arc::new(CycleOrchestrator::new(
                gold_feeds,
                silver_feed,
                fx_feed,
                store,
                delta,
            )),
            cycle_interval: Duration::from_secs(config.cycle_interval_secs),
        })
    }

    /// Shared handle for read-side consumers (`latest()`, `stats()`).
    pub fn orchestrator(&self) -> Arc<CycleOrchestrator> {
        self.orchestrator.clone()
    }

    /// Run cycles forever. The first cycle starts immediately; a cycle
    /// overrunning the interval makes the orchestrator skip the next
    /// trigger instead of interleaving.
    pub async fn run(&self) -> Result<()> {
        info!(
            "aggregator running, one cycle every {:?}",
            self.cycle_interval
        );
        let mut ticker = tokio::time::interval(self.cycle_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.orchestrator.run_cycle().await;
        }
    }
}
