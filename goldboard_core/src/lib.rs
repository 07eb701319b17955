//! Core engine for the gold price board: normalization, reconciliation,
//! snapshot persistence and delta computation.
//!
//! - `extract`: numeric token scanning and value normalization
//! - `reconcile`: tiered (buy, sell) pair extraction per brand, plus
//!   silver-board and exchange-rate reconciliation
//! - `delta`: period-over-period changes with a sanity bound
//! - `snapshot`: one JSON file per calendar date, baseline search
//! - `sources`: the adapter contract network code plugs into
//! - `orchestrator`: the per-cycle state machine tying it together
//!
//! Network I/O lives in the service crates; everything here is pure
//! computation plus local file access.

pub mod delta;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod reconcile;
pub mod snapshot;
pub mod sources;
pub mod types;

pub use delta::{DeltaConfig, DeltaEngine, DEFAULT_SANITY_BOUND_MILLIS};
pub use error::QuoteError;
pub use extract::{normalize_value, UnitHint};
pub use orchestrator::{CycleOrchestrator, CycleOutcome, CycleStatsSnapshot};
pub use reconcile::{ExtractionProfile, FieldProfile};
pub use snapshot::SnapshotStore;
pub use sources::{BrandFeed, FeedSource, FxFeed, SilverFeed, SourceAdapter, SourceYield};
pub use types::{
    Brand, BrandRecord, FieldPair, GoldSection, MillionsValue, ProductQuote, PublishedResult,
    QuoteValue, SilverRecord, SilverSection, Snapshot, Tier, SENTINEL,
};
