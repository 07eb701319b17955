//! Source adapter contract and feed wiring.
//!
//! Adapters own all network concerns (timeouts, retries, rendering); the
//! core only sees their yield: raw text, a pre-extracted pair, or an
//! error. Each brand carries an ordered list of sources tried as
//! fallbacks within one cycle.

use crate::extract::UnitHint;
use crate::reconcile::ExtractionProfile;
use crate::types::{Brand, FieldPair, QuoteValue};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// What a source adapter hands back on success.
#[derive(Clone, Debug)]
pub enum SourceYield {
    /// Page text for the extraction tiers to work on.
    RawText {
        body: String,
        source_time: Option<String>,
    },
    /// Vendor-specific override: fully formed pairs that pre-empt the
    /// text tiers.
    PreExtracted {
        bar: FieldPair,
        ring: FieldPair,
        source_time: Option<String>,
    },
    /// Pre-extracted exchange rates.
    PreExtractedRates {
        cash_buy: QuoteValue,
        transfer_buy: QuoteValue,
        sell: QuoteValue,
        source_time: Option<String>,
    },
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier recorded as quote provenance.
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<SourceYield>;
}

/// One configured source: the adapter plus its unit convention and an
/// optional page-layout override.
///
/// The unit hint belongs to the source, not the brand: the same brand
/// can be quoted per lượng on one page and per chỉ on another.
#[derive(Clone)]
pub struct FeedSource {
    pub adapter: Arc<dyn SourceAdapter>,
    pub unit_hint: UnitHint,
    pub profile: Option<ExtractionProfile>,
}

impl FeedSource {
    pub fn new(adapter: Arc<dyn SourceAdapter>) -> Self {
        Self {
            adapter,
            unit_hint: UnitHint::BaseUnit,
            profile: None,
        }
    }

    pub fn with_unit_hint(mut self, hint: UnitHint) -> Self {
        self.unit_hint = hint;
        self
    }

    pub fn with_profile(mut self, profile: ExtractionProfile) -> Self {
        self.profile = Some(profile);
        self
    }
}

/// A brand's feed: default extraction profile plus fallback sources in
/// priority order.
#[derive(Clone)]
pub struct BrandFeed {
    pub brand: Brand,
    pub profile: ExtractionProfile,
    pub sources: Vec<FeedSource>,
}

impl BrandFeed {
    pub fn new(brand: Brand, sources: Vec<FeedSource>) -> Self {
        Self {
            brand,
            profile: ExtractionProfile::default_gold(),
            sources,
        }
    }
}

/// The silver-board feed. Its sources carry no extraction profile: the
/// silver row qualifiers are fixed properties of the product lines.
#[derive(Clone, Default)]
pub struct SilverFeed {
    pub sources: Vec<FeedSource>,
}

impl SilverFeed {
    pub fn new(sources: Vec<FeedSource>) -> Self {
        Self { sources }
    }
}

/// The exchange-rate feed.
#[derive(Clone, Default)]
pub struct FxFeed {
    pub sources: Vec<FeedSource>,
}

impl FxFeed {
    pub fn new(sources: Vec<FeedSource>) -> Self {
        Self { sources }
    }
}
