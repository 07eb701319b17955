//! Delta engine: period-over-period change computation against a
//! baseline snapshot, with a sanity bound that suppresses implausible
//! jumps (a parse defect is more likely than a 50-million move).

use crate::error::QuoteError;
use crate::types::{MillionsValue, ProductQuote, QuoteValue, Snapshot, SENTINEL};
use log::warn;

/// Default implausibility bound: 50 million VND.
pub const DEFAULT_SANITY_BOUND_MILLIS: i64 = 50_000;

#[derive(Clone, Copy, Debug)]
pub struct DeltaConfig {
    /// Absolute changes beyond this bound are suppressed, not reported.
    pub sanity_bound: MillionsValue,
}

impl Default for DeltaConfig {
    fn default() -> Self {
        Self {
            sanity_bound: MillionsValue::from_millis(DEFAULT_SANITY_BOUND_MILLIS),
        }
    }
}

/// Signed absolute change, 3-decimal precision ("+1.500", "-0.700").
pub fn format_signed_millions(v: MillionsValue) -> String {
    if v.millis() >= 0 {
        format!("+{v}")
    } else {
        v.to_string()
    }
}

/// Signed percent change, 2-decimal precision ("+1.07%").
pub fn format_signed_pct(pct: f64) -> String {
    format!("{pct:+.2}%")
}

pub struct DeltaEngine {
    config: DeltaConfig,
}

impl DeltaEngine {
    pub fn new(config: DeltaConfig) -> Self {
        Self { config }
    }

    /// Compute (change, change_pct) strings for one field.
    ///
    /// Either side sentinel, or a zero baseline for the percent, yields
    /// the sentinel. Bound violations suppress both strings but leave
    /// the current value untouched.
    fn field_delta(&self, field: &str, current: QuoteValue, baseline: QuoteValue) -> (String, String) {
        let (Some(cur), Some(base)) = (current.value(), baseline.value()) else {
            return (SENTINEL.to_string(), SENTINEL.to_string());
        };
        let abs = cur - base;
        if abs.abs() > self.config.sanity_bound {
            warn!(
                "{}",
                QuoteError::SanityViolation {
                    field: field.to_string(),
                    delta: abs.as_f64(),
                    bound: self.config.sanity_bound.as_f64(),
                }
            );
            return (SENTINEL.to_string(), SENTINEL.to_string());
        }
        let pct = if base.is_zero() {
            SENTINEL.to_string()
        } else {
            format_signed_pct(abs.as_f64() / base.as_f64() * 100.0)
        };
        (format_signed_millions(abs), pct)
    }

    fn quote_deltas(&self, field: &str, current: &mut ProductQuote, baseline: &ProductQuote) {
        let (c, p) = self.field_delta(&format!("{field}.buy"), current.buy, baseline.buy);
        current.buy_change = c;
        current.buy_change_pct = p;
        let (c, p) = self.field_delta(&format!("{field}.sell"), current.sell, baseline.sell);
        current.sell_change = c;
        current.sell_change_pct = p;
    }

    /// Fill every change field of `current` against `baseline`. A missing
    /// baseline leaves all change fields at the sentinel.
    pub fn apply(&self, current: &mut Snapshot, baseline: Option<&Snapshot>) {
        let Some(baseline) = baseline else {
            for record in current.gold.brands.values_mut() {
                record.bar.clear_deltas();
                record.ring.clear_deltas();
            }
            current.silver.phuquy.bar.clear_deltas();
            current.silver.phuquy.ingot.clear_deltas();
            current.exchange.clear_deltas();
            return;
        };

        let empty = ProductQuote::default();
        for (brand, record) in current.gold.brands.iter_mut() {
            let base = baseline.gold.brands.get(brand);
            let base_bar = base.map(|r| &r.bar).unwrap_or(&empty);
            let base_ring = base.map(|r| &r.ring).unwrap_or(&empty);
            self.quote_deltas(&format!("{}.bar", brand.as_str()), &mut record.bar, base_bar);
            self.quote_deltas(&format!("{}.ring", brand.as_str()), &mut record.ring, base_ring);
        }

        let silver = &mut current.silver.phuquy;
        let base_silver = &baseline.silver.phuquy;
        self.quote_deltas("silver.phuquy.bar", &mut silver.bar, &base_silver.bar);
        self.quote_deltas("silver.phuquy.ingot", &mut silver.ingot, &base_silver.ingot);

        let ex = &mut current.exchange;
        let base_ex = &baseline.exchange;
        let (c, p) = self.field_delta("exchange.cash_buy", ex.cash_buy, base_ex.cash_buy);
        ex.cash_buy_change = c;
        ex.cash_buy_change_pct = p;
        let (c, p) = self.field_delta("exchange.transfer_buy", ex.transfer_buy, base_ex.transfer_buy);
        ex.transfer_buy_change = c;
        ex.transfer_buy_change_pct = p;
        let (c, p) = self.field_delta("exchange.sell", ex.sell, base_ex.sell);
        ex.sell_change = c;
        ex.sell_change_pct = p;
    }
}
