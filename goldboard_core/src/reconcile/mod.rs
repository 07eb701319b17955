//! Field reconciler: turns raw page text into trustworthy (buy, sell)
//! pairs by trying an ordered list of extraction tiers.
//!
//! Tier order: adapter override (pre-extracted pair), structured row
//! match, bounded-window regex, positional fallback. The first tier that
//! yields a complete pair wins; a pair is never assembled from tokens
//! found by different tiers.

pub mod profile;
pub mod strategies;

pub use profile::{ExtractionProfile, FieldProfile};
pub use strategies::{pair_from_raw, positional_fallback, structured_match, windowed_regex};

use crate::extract::{normalize_text, normalize_value, UnitHint};
use crate::types::{FieldPair, QuoteValue, Tier};
use regex::Regex;
use std::sync::OnceLock;

/// An accepted pair plus the tier that produced it. `tier` is `None`
/// when every tier failed and the pair is the sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconciledPair {
    pub pair: FieldPair,
    pub tier: Option<Tier>,
}

impl ReconciledPair {
    pub const fn sentinel() -> Self {
        Self {
            pair: FieldPair::sentinel(),
            tier: None,
        }
    }

    /// Accept an adapter-supplied pair, subject to the completeness gate.
    pub fn from_override(pair: FieldPair) -> Self {
        if pair.is_complete() {
            Self {
                pair,
                tier: Some(Tier::AdapterOverride),
            }
        } else {
            Self::sentinel()
        }
    }
}

/// Reconcile one field pair from page text. An adapter-supplied override
/// pre-empts all text tiers when it is internally consistent.
pub fn reconcile_field(
    text: &str,
    field: &FieldProfile,
    hint: UnitHint,
    override_pair: Option<FieldPair>,
) -> ReconciledPair {
    if let Some(pair) = override_pair {
        if pair.is_complete() {
            return ReconciledPair {
                pair,
                tier: Some(Tier::AdapterOverride),
            };
        }
    }

    if let Some(pair) = structured_match(text, field, hint) {
        return ReconciledPair {
            pair,
            tier: Some(Tier::StructuredMatch),
        };
    }

    let flat = normalize_text(text);
    if let Some(pair) = windowed_regex(&flat, &field.window_phrase, field.window, field.gap, hint) {
        return ReconciledPair {
            pair,
            tier: Some(Tier::WindowedRegex),
        };
    }
    if let Some(pair) = positional_fallback(&flat, field.positional_offset, hint) {
        return ReconciledPair {
            pair,
            tier: Some(Tier::PositionalFallback),
        };
    }

    ReconciledPair::sentinel()
}

/// Both product lines of one brand, reconciled from the same page text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrandReconciliation {
    pub bar: ReconciledPair,
    pub ring: ReconciledPair,
}

impl BrandReconciliation {
    pub fn has_any_pair(&self) -> bool {
        self.bar.pair.is_complete() || self.ring.pair.is_complete()
    }
}

pub fn reconcile_brand(
    text: &str,
    profile: &ExtractionProfile,
    hint: UnitHint,
) -> BrandReconciliation {
    BrandReconciliation {
        bar: reconcile_field(text, &profile.bar, hint, None),
        ring: reconcile_field(text, &profile.ring, hint, None),
    }
}

/// Both silver lines, reconciled from the same page text: the retail
/// per-lượng bar row and the 1-kg ingot row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SilverReconciliation {
    pub bar: ReconciledPair,
    pub ingot: ReconciledPair,
}

impl SilverReconciliation {
    pub fn has_any_pair(&self) -> bool {
        self.bar.pair.is_complete() || self.ingot.pair.is_complete()
    }
}

pub fn reconcile_silver(text: &str, hint: UnitHint) -> SilverReconciliation {
    SilverReconciliation {
        bar: reconcile_field(text, &FieldProfile::silver_bar(), hint, None),
        ingot: reconcile_field(text, &FieldProfile::silver_ingot(), hint, None),
    }
}

/// Reconciled USD/VND reference rates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExchangeRates {
    pub cash_buy: QuoteValue,
    pub transfer_buy: QuoteValue,
    pub sell: QuoteValue,
}

/// Max bytes scanned after the currency label for rate tokens.
const FX_WINDOW: usize = 300;

fn fx_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bUSD\b").expect("fx label regex"))
}

fn fx_rate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{1,3}[.,]\d{2,3}").expect("fx rate regex"))
}

/// Pull USD cash-buy / transfer-buy / sell rates from bank page text.
///
/// Rate tables list the three rates after the currency code. Pages that
/// only publish a single rate repeat it for the missing columns.
pub fn reconcile_exchange(text: &str) -> Option<ExchangeRates> {
    let flat = normalize_text(text);
    let label = fx_label_re().find(&flat)?;
    let tail = &flat[label.end()..];
    let raws: Vec<&str> = fx_rate_re()
        .find_iter(tail)
        .take_while(|m| m.start() < FX_WINDOW)
        .take(3)
        .map(|m| m.as_str())
        .collect();
    let first = *raws.first()?;
    let cash_buy = normalize_value(first, UnitHint::BaseUnit);
    if !cash_buy.is_available() {
        return None;
    }
    Some(ExchangeRates {
        cash_buy,
        transfer_buy: normalize_value(raws.get(1).copied().unwrap_or(first), UnitHint::BaseUnit),
        sell: normalize_value(raws.get(2).copied().unwrap_or(first), UnitHint::BaseUnit),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MillionsValue;

    fn available(millis: i64) -> QuoteValue {
        QuoteValue::Available(MillionsValue::from_millis(millis))
    }

    #[test]
    fn test_structured_tier_wins() {
        let text = "Bar-gold Buy 140.500 Sell 141.300";
        let field = FieldProfile::new("bar-gold", "bar-gold", 0);
        let out = reconcile_field(text, &field, UnitHint::BaseUnit, None);
        assert_eq!(out.tier, Some(Tier::StructuredMatch));
        assert_eq!(out.pair.buy, available(140_500));
        assert_eq!(out.pair.sell, available(141_300));
    }

    #[test]
    fn test_structured_skips_purity_marks() {
        let text = "Vàng miếng SJC (999.9) 140.500 141.300";
        let field = FieldProfile::new("miếng", "giá vàng miếng", 0);
        let out = reconcile_field(text, &field, UnitHint::BaseUnit, None);
        assert_eq!(out.tier, Some(Tier::StructuredMatch));
        assert_eq!(out.pair.buy, available(140_500));
    }

    #[test]
    fn test_structured_row_wrapping_to_next_line() {
        let text = "Vàng nhẫn\n138.500 140.200\nkhác";
        let field = FieldProfile::new("nhẫn", "vàng nhẫn", 2);
        let out = reconcile_field(text, &field, UnitHint::BaseUnit, None);
        assert_eq!(out.tier, Some(Tier::StructuredMatch));
        assert_eq!(out.pair.buy, available(138_500));
    }

    #[test]
    fn test_windowed_regex_when_no_labelled_row() {
        // Label absent, keyword phrase buried mid-sentence.
        let text = "Hôm nay giá vàng miếng giao dịch quanh 140.500 và 141.300 đồng";
        let field = FieldProfile::new("zzz-no-such-label", "giá vàng miếng", 0);
        let out = reconcile_field(text, &field, UnitHint::BaseUnit, None);
        assert_eq!(out.tier, Some(Tier::WindowedRegex));
        assert_eq!(out.pair.buy, available(140_500));
        assert_eq!(out.pair.sell, available(141_300));
    }

    #[test]
    fn test_positional_fallback_with_offset() {
        let text = "140.500 141.300 138.200 139.900";
        let field = FieldProfile::new("absent", "absent", 2);
        let out = reconcile_field(text, &field, UnitHint::BaseUnit, None);
        assert_eq!(out.tier, Some(Tier::PositionalFallback));
        assert_eq!(out.pair.buy, available(138_200));
        assert_eq!(out.pair.sell, available(139_900));
    }

    #[test]
    fn test_partial_pair_rejected() {
        let pair = pair_from_raw("98765", "-", UnitHint::BaseUnit);
        assert_eq!(pair, FieldPair::sentinel());

        // Only one large token in the body: tier 3 must not half-fill.
        let text = "giá 140.500 hết";
        let field = FieldProfile::new("absent", "absent", 0);
        let out = reconcile_field(text, &field, UnitHint::BaseUnit, None);
        assert_eq!(out, ReconciledPair::sentinel());
    }

    #[test]
    fn test_override_preempts_text_tiers() {
        let text = "Bar-gold Buy 140.500 Sell 141.300";
        let field = FieldProfile::new("bar-gold", "bar-gold", 0);
        let override_pair = FieldPair::new(available(150_000), available(151_000));
        let out = reconcile_field(text, &field, UnitHint::BaseUnit, Some(override_pair));
        assert_eq!(out.tier, Some(Tier::AdapterOverride));
        assert_eq!(out.pair.buy, available(150_000));

        // Incomplete override falls through to the text tiers.
        let half = FieldPair {
            buy: available(150_000),
            sell: QuoteValue::Unavailable,
        };
        let out = reconcile_field(text, &field, UnitHint::BaseUnit, Some(half));
        assert_eq!(out.tier, Some(Tier::StructuredMatch));
        assert_eq!(out.pair.buy, available(140_500));
    }

    #[test]
    fn test_reconciliation_is_idempotent() {
        let text = "SJC miếng 140.500 141.300 nhẫn 138.500 140.200";
        let profile = ExtractionProfile::default_gold();
        let a = reconcile_brand(text, &profile, UnitHint::BaseUnit);
        let b = reconcile_brand(text, &profile, UnitHint::BaseUnit);
        assert_eq!(a, b);
        assert!(a.has_any_pair());
    }

    #[test]
    fn test_silver_rows_skip_wholesale_pack_sizes() {
        // 500-lượng and multi-kg wholesale rows precede the retail ones.
        let text = "BẠC MIẾNG PHÚ QUÝ 500 LƯỢNG 690.000.000 700.000.000\n\
                    BẠC MIẾNG PHÚ QUÝ (999) 1 LƯỢNG 1.382.600 1.425.400\n\
                    BẠC THỎI PHÚ QUÝ 5 KG 184.000.000 186.000.000\n\
                    BẠC THỎI PHÚ QUÝ 1 KG 36.930.000 37.230.000";
        let out = reconcile_silver(text, UnitHint::BaseUnit);
        assert_eq!(out.bar.tier, Some(Tier::StructuredMatch));
        assert_eq!(out.bar.pair.buy, available(1_383));
        assert_eq!(out.bar.pair.sell, available(1_425));
        assert_eq!(out.ingot.tier, Some(Tier::StructuredMatch));
        assert_eq!(out.ingot.pair.buy, available(36_930));
        assert_eq!(out.ingot.pair.sell, available(37_230));
    }

    #[test]
    fn test_silver_without_matching_rows_is_sentinel() {
        let text = "BẠC THỎI PHÚ QUÝ 500 LƯỢNG\nkhông có bảng giá lẻ";
        let out = reconcile_silver(text, UnitHint::BaseUnit);
        assert!(!out.has_any_pair());
    }

    #[test]
    fn test_exchange_rates_with_fallback_columns() {
        let full = "Ngoại tệ USD 25,350 25,380 25,720 EUR 27,100";
        let rates = reconcile_exchange(full).unwrap();
        assert_eq!(rates.cash_buy, available(25_350));
        assert_eq!(rates.transfer_buy, available(25_380));
        assert_eq!(rates.sell, available(25_720));

        let single = "Tỷ giá USD 25,350 hôm nay";
        let rates = reconcile_exchange(single).unwrap();
        assert_eq!(rates.transfer_buy, available(25_350));
        assert_eq!(rates.sell, available(25_350));

        assert_eq!(reconcile_exchange("không có dữ liệu"), None);
    }
}
