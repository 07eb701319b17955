//! Value normalizer: converts raw lexemes and native numbers into the
//! canonical millions-of-VND fixed point (3-decimal precision).
//!
//! Rules, in priority order:
//! 1. `DDD.DDD` grouped pattern: already the canonical millions value.
//! 2. Fully grouped integer (`D.DDD.DDD`): full VND, divide by 1,000,000.
//! 3. Anything else: strip and parse as float; magnitude >= 1000 is
//!    assumed to be full VND (last-resort inference, logged at debug).
//! A per-source unit factor (sub-unit -> base-unit) is applied before the
//! scale decision. Unparsable input yields the sentinel, never a panic.

use crate::types::{MillionsValue, QuoteValue, SENTINEL};
use log::debug;
use regex::Regex;
use std::sync::OnceLock;

/// Magnitude at or above which a bare number is assumed to be a full
/// base-currency amount rather than an already-scaled millions value.
const FULL_UNIT_THRESHOLD: f64 = 1000.0;

/// Per-source unit convention. Sources quoting per sub-unit (per "chỉ",
/// one tenth of a "lượng") carry an explicit conversion factor; magnitude
/// inference is never used to guess this.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnitHint {
    #[default]
    BaseUnit,
    /// Quotes are per sub-unit; multiply by the factor to reach the base
    /// unit (10 for chỉ -> lượng).
    PerSubUnit(u32),
}

impl UnitHint {
    #[inline]
    fn factor(&self) -> i64 {
        match self {
            UnitHint::BaseUnit => 1,
            UnitHint::PerSubUnit(f) => *f as i64,
        }
    }
}

fn canonical_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,3})[.,](\d{3})$").expect("canonical regex"))
}

fn grouped_int_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,3}(?:[.,]\d{3})+$").expect("grouped int regex"))
}

/// Normalize a raw lexeme (as matched in source text, or supplied by an
/// adapter) into a canonical value.
pub fn normalize_value(raw: &str, hint: UnitHint) -> QuoteValue {
    let raw = raw.trim();
    if raw.is_empty() || raw == SENTINEL {
        return QuoteValue::Unavailable;
    }
    let factor = hint.factor();

    // Rule 1: three-trailing-digit grouping is already millions.
    if let Some(caps) = canonical_re().captures(raw) {
        let whole: i64 = caps[1].parse().unwrap_or(0);
        let frac: i64 = caps[2].parse().unwrap_or(0);
        return QuoteValue::Available(MillionsValue::from_millis((whole * 1000 + frac) * factor));
    }

    // Rule 2: fully grouped integer is a full-VND amount. Absurdly large
    // inputs overflow the fixed point and degrade to the sentinel.
    if grouped_int_re().is_match(raw) {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        let millis = digits
            .parse::<i64>()
            .ok()
            .and_then(|vnd| vnd.checked_mul(factor))
            .and_then(|scaled| scaled.checked_add(500))
            // VND -> thousandths of a million, rounded.
            .map(|scaled| scaled / 1000);
        return match millis {
            Some(millis) => QuoteValue::Available(MillionsValue::from_millis(millis)),
            None => QuoteValue::Unavailable,
        };
    }

    // Rule 3: strip and parse, then infer scale from magnitude.
    let stripped: String = raw
        .chars()
        .map(|c| if c == ',' { '.' } else { c })
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    match stripped.parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 => normalize_number(n, hint),
        _ => QuoteValue::Unavailable,
    }
}

/// Normalize a native numeric value. The unit factor is applied before
/// the magnitude check.
pub fn normalize_number(value: f64, hint: UnitHint) -> QuoteValue {
    if !value.is_finite() || value < 0.0 {
        return QuoteValue::Unavailable;
    }
    let scaled = value * hint.factor() as f64;
    if scaled >= FULL_UNIT_THRESHOLD {
        debug!("magnitude inference: {scaled} treated as full VND");
        QuoteValue::Available(MillionsValue::from_f64(scaled / 1_000_000.0))
    } else {
        QuoteValue::Available(MillionsValue::from_f64(scaled))
    }
}
