//! Cycle orchestrator: fans acquisition out across all feeds, reconciles,
//! computes deltas against the baseline snapshot, persists, and publishes
//! the result atomically for readers.
//!
//! A cycle always runs to completion: per-source failures degrade to
//! sentinel contributions, never abort the join. A run-lock keeps cycles
//! from interleaving; a trigger arriving while a cycle is still running
//! is skipped, not queued.

use crate::delta::DeltaEngine;
use crate::error::QuoteError;
use crate::extract::extract_tokens;
use crate::reconcile::{
    reconcile_brand, reconcile_exchange, reconcile_silver, BrandReconciliation, ExchangeRates,
    ReconciledPair, SilverReconciliation,
};
use crate::snapshot::SnapshotStore;
use crate::sources::{BrandFeed, FxFeed, SilverFeed, SourceYield};
use crate::types::{
    Brand, BrandRecord, ProductQuote, PublishedResult, Snapshot, SENTINEL,
};
use chrono::{Local, NaiveDate, Utc};
use futures_util::future::join_all;
use log::{debug, error, info, warn};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Wall-clock format stamped on snapshot components.
const UPDATE_TIME_FORMAT: &str = "%H:%M:%S %d/%m/%Y";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed {
        cycle_seq: u64,
        baseline_date: Option<NaiveDate>,
    },
    /// A previous cycle was still running when this trigger fired.
    Skipped,
}

#[derive(Default)]
pub struct CycleStats {
    cycles_completed: AtomicU64,
    cycles_skipped: AtomicU64,
    sources_failed: AtomicU64,
    ambiguous_fields: AtomicU64,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct CycleStatsSnapshot {
    pub cycles_completed: u64,
    pub cycles_skipped: u64,
    pub sources_failed: u64,
    pub ambiguous_fields: u64,
}

impl CycleStats {
    fn snapshot(&self) -> CycleStatsSnapshot {
        CycleStatsSnapshot {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_skipped: self.cycles_skipped.load(Ordering::Relaxed),
            sources_failed: self.sources_failed.load(Ordering::Relaxed),
            ambiguous_fields: self.ambiguous_fields.load(Ordering::Relaxed),
        }
    }
}

struct BrandOutcome {
    brand: Brand,
    reconciliation: BrandReconciliation,
    source: Option<String>,
}

impl BrandOutcome {
    fn sentinel(brand: Brand) -> Self {
        Self {
            brand,
            reconciliation: BrandReconciliation {
                bar: ReconciledPair::sentinel(),
                ring: ReconciledPair::sentinel(),
            },
            source: None,
        }
    }
}

pub struct CycleOrchestrator {
    gold_feeds: Vec<BrandFeed>,
    silver_feed: SilverFeed,
    fx_feed: FxFeed,
    store: SnapshotStore,
    delta: DeltaEngine,
    run_lock: Mutex<()>,
    published: RwLock<Option<Arc<PublishedResult>>>,
    cycle_seq: AtomicU64,
    stats: CycleStats,
}

impl CycleOrchestrator {
    pub fn new(
        gold_feeds: Vec<BrandFeed>,
        silver_feed: SilverFeed,
        fx_feed: FxFeed,
        store: SnapshotStore,
        delta: DeltaEngine,
    ) -> Self {
        Self {
            gold_feeds,
            silver_feed,
            fx_feed,
            store,
            delta,
            run_lock: Mutex::new(()),
            published: RwLock::new(None),
            cycle_seq: AtomicU64::new(0),
            stats: CycleStats::default(),
        }
    }

    /// The most recently published result, if any cycle has completed.
    pub fn latest(&self) -> Option<Arc<PublishedResult>> {
        self.published.read().clone()
    }

    pub fn stats(&self) -> CycleStatsSnapshot {
        self.stats.snapshot()
    }

    /// Run one full cycle. Returns `Skipped` without touching any state
    /// when a previous cycle still holds the run-lock.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Ok(_guard) = self.run_lock.try_lock() else {
            self.stats.cycles_skipped.fetch_add(1, Ordering::Relaxed);
            warn!("previous cycle still running, skipping this trigger");
            return CycleOutcome::Skipped;
        };
        let started = Instant::now();
        let now = Local::now();
        let today = now.date_naive();
        let wall = now.format(UPDATE_TIME_FORMAT).to_string();

        let baseline = self.store.load_baseline(today);
        let baseline_date = baseline.as_ref().map(|(d, _)| *d);

        let gold_futs = self.gold_feeds.iter().map(|feed| self.acquire_brand(feed));
        let (brand_outcomes, silver_outcome, fx_outcome) = tokio::join!(
            join_all(gold_futs),
            self.acquire_silver(),
            self.acquire_fx()
        );

        let mut snapshot = Snapshot::default();
        for outcome in brand_outcomes {
            let record = BrandRecord {
                bar: quote_from(outcome.reconciliation.bar, outcome.source.as_deref()),
                ring: quote_from(outcome.reconciliation.ring, outcome.source.as_deref()),
            };
            snapshot.gold.brands.insert(outcome.brand, record);
        }
        if let Some((rec, source)) = silver_outcome {
            snapshot.silver.phuquy.bar = quote_from(rec.bar, Some(&source));
            snapshot.silver.phuquy.ingot = quote_from(rec.ingot, Some(&source));
        }
        if let Some((rates, source)) = fx_outcome {
            snapshot.exchange.cash_buy = rates.cash_buy;
            snapshot.exchange.transfer_buy = rates.transfer_buy;
            snapshot.exchange.sell = rates.sell;
            snapshot.exchange.source = Some(source);
        }

        let baseline_snapshot = baseline.as_ref().map(|(_, s)| s);
        self.stamp_update_times(&mut snapshot, baseline_snapshot, &wall);
        self.delta.apply(&mut snapshot, baseline_snapshot);

        if let Err(e) = self.store.save(today, &snapshot) {
            error!("{e}");
        }

        let cycle_seq = self.cycle_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let result = Arc::new(PublishedResult {
            cycle_seq,
            generated_at: Utc::now(),
            baseline_date,
            snapshot,
        });
        *self.published.write() = Some(result);
        self.stats.cycles_completed.fetch_add(1, Ordering::Relaxed);
        info!(
            "cycle {cycle_seq} completed in {:?}, baseline {baseline_date:?}",
            started.elapsed()
        );
        CycleOutcome::Completed {
            cycle_seq,
            baseline_date,
        }
    }

    /// Try a brand's sources in priority order; the first one yielding at
    /// least one complete pair wins.
    async fn acquire_brand(&self, feed: &BrandFeed) -> BrandOutcome {
        let mut saw_tokens = false;
        for source in &feed.sources {
            let name = source.adapter.name().to_string();
            match source.adapter.fetch().await {
                Err(e) => {
                    self.stats.sources_failed.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "{}",
                        QuoteError::SourceUnavailable {
                            source_name: name,
                            reason: e.to_string(),
                        }
                    );
                }
                Ok(SourceYield::RawText { body, source_time }) => {
                    if let Some(ts) = source_time {
                        debug!("{name} reports update time {ts}");
                    }
                    let profile = source.profile.as_ref().unwrap_or(&feed.profile);
                    let rec = reconcile_brand(&body, profile, source.unit_hint);
                    if rec.has_any_pair() {
                        return BrandOutcome {
                            brand: feed.brand,
                            reconciliation: rec,
                            source: Some(name),
                        };
                    }
                    if !extract_tokens(&body).is_empty() {
                        saw_tokens = true;
                    }
                }
                Ok(SourceYield::PreExtracted {
                    bar,
                    ring,
                    source_time,
                }) => {
                    if let Some(ts) = source_time {
                        debug!("{name} reports update time {ts}");
                    }
                    let rec = BrandReconciliation {
                        bar: ReconciledPair::from_override(bar),
                        ring: ReconciledPair::from_override(ring),
                    };
                    if rec.has_any_pair() {
                        return BrandOutcome {
                            brand: feed.brand,
                            reconciliation: rec,
                            source: Some(name),
                        };
                    }
                }
                Ok(SourceYield::PreExtractedRates { .. }) => {
                    warn!("{name}: exchange-rate yield on gold feed {}", feed.brand.as_str());
                }
            }
        }
        if saw_tokens {
            self.stats.ambiguous_fields.fetch_add(1, Ordering::Relaxed);
            warn!(
                "{}",
                QuoteError::AmbiguousExtraction {
                    field: feed.brand.as_str().to_string(),
                }
            );
        }
        BrandOutcome::sentinel(feed.brand)
    }

    /// Silver mirrors the gold fallback chain, with the fixed row
    /// qualifiers baked into the silver profiles.
    async fn acquire_silver(&self) -> Option<(SilverReconciliation, String)> {
        for source in &self.silver_feed.sources {
            let name = source.adapter.name().to_string();
            match source.adapter.fetch().await {
                Err(e) => {
                    self.stats.sources_failed.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "{}",
                        QuoteError::SourceUnavailable {
                            source_name: name,
                            reason: e.to_string(),
                        }
                    );
                }
                Ok(SourceYield::RawText { body, source_time }) => {
                    if let Some(ts) = source_time {
                        debug!("{name} reports update time {ts}");
                    }
                    let rec = reconcile_silver(&body, source.unit_hint);
                    if rec.has_any_pair() {
                        return Some((rec, name));
                    }
                    if !extract_tokens(&body).is_empty() {
                        self.stats.ambiguous_fields.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            "{}",
                            QuoteError::AmbiguousExtraction {
                                field: "silver.phuquy".to_string(),
                            }
                        );
                    }
                }
                Ok(SourceYield::PreExtracted {
                    bar,
                    ring,
                    source_time,
                }) => {
                    if let Some(ts) = source_time {
                        debug!("{name} reports update time {ts}");
                    }
                    // Vendor overrides map (bar, ring) onto (bar, ingot).
                    let rec = SilverReconciliation {
                        bar: ReconciledPair::from_override(bar),
                        ingot: ReconciledPair::from_override(ring),
                    };
                    if rec.has_any_pair() {
                        return Some((rec, name));
                    }
                }
                Ok(SourceYield::PreExtractedRates { .. }) => {
                    warn!("{name}: exchange-rate yield on silver feed");
                }
            }
        }
        None
    }

    async fn acquire_fx(&self) -> Option<(ExchangeRates, String)> {
        for source in &self.fx_feed.sources {
            let name = source.adapter.name().to_string();
            match source.adapter.fetch().await {
                Err(e) => {
                    self.stats.sources_failed.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "{}",
                        QuoteError::SourceUnavailable {
                            source_name: name,
                            reason: e.to_string(),
                        }
                    );
                }
                Ok(SourceYield::RawText { body, .. }) => {
                    if let Some(rates) = reconcile_exchange(&body) {
                        return Some((rates, name));
                    }
                    if !extract_tokens(&body).is_empty() {
                        self.stats.ambiguous_fields.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            "{}",
                            QuoteError::AmbiguousExtraction {
                                field: "exchange".to_string(),
                            }
                        );
                    }
                }
                Ok(SourceYield::PreExtractedRates {
                    cash_buy,
                    transfer_buy,
                    sell,
                    ..
                }) => {
                    let rates = ExchangeRates {
                        cash_buy,
                        transfer_buy,
                        sell,
                    };
                    if cash_buy.is_available() || transfer_buy.is_available() || sell.is_available()
                    {
                        return Some((rates, name));
                    }
                }
                Ok(SourceYield::PreExtracted { .. }) => {
                    warn!("{name}: gold yield on exchange feed");
                }
            }
        }
        None
    }

    /// Components that reconciled something get the cycle wall clock;
    /// empty components inherit the baseline's time, else the sentinel.
    fn stamp_update_times(
        &self,
        snapshot: &mut Snapshot,
        baseline: Option<&Snapshot>,
        wall: &str,
    ) {
        let gold_has_values = snapshot.gold.brands.values().any(|r| r.has_any_value());
        snapshot.gold.update_time = if gold_has_values {
            wall.to_string()
        } else {
            baseline
                .map(|b| b.gold.update_time.clone())
                .unwrap_or_else(|| SENTINEL.to_string())
        };
        snapshot.silver.update_time = if snapshot.silver.phuquy.has_any_value() {
            wall.to_string()
        } else {
            baseline
                .map(|b| b.silver.update_time.clone())
                .unwrap_or_else(|| SENTINEL.to_string())
        };
        snapshot.exchange.update_time = if snapshot.exchange.has_any_value() {
            wall.to_string()
        } else {
            baseline
                .map(|b| b.exchange.update_time.clone())
                .unwrap_or_else(|| SENTINEL.to_string())
        };
    }
}

fn quote_from(reconciled: ReconciledPair, source: Option<&str>) -> ProductQuote {
    let mut quote = ProductQuote::from_pair(reconciled.pair);
    if reconciled.pair.is_complete() {
        quote.source = source.map(str::to_string);
        quote.tier = reconciled.tier;
    }
    quote
}
