//! Core quote types: fixed-point canonical values, per-brand records, and
//! the date-keyed snapshot structure persisted to disk.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// Sentinel rendered wherever a value could not be trustworthily determined.
pub const SENTINEL: &str = "-";

/// Gold brands tracked on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Brand {
    Sjc,
    Pnj,
    Doji,
    Btmc,
    Btmh,
    PhuQuy,
    MiHong,
    NgocTham,
}

impl Brand {
    pub const ALL: [Brand; 8] = [
        Brand::Sjc,
        Brand::Pnj,
        Brand::Doji,
        Brand::Btmc,
        Brand::Btmh,
        Brand::PhuQuy,
        Brand::MiHong,
        Brand::NgocTham,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Brand::Sjc => "SJC",
            Brand::Pnj => "PNJ",
            Brand::Doji => "DOJI",
            Brand::Btmc => "BTMC",
            Brand::Btmh => "BTMH",
            Brand::PhuQuy => "PHUQUY",
            Brand::MiHong => "MIHONG",
            Brand::NgocTham => "NGOCTHAM",
        }
    }
}

/// The two gold product lines quoted per brand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductLine {
    /// Bar gold ("vàng miếng").
    Bar,
    /// Ring gold ("vàng nhẫn").
    Ring,
}

impl ProductLine {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductLine::Bar => "bar",
            ProductLine::Ring => "ring",
        }
    }
}

/// Canonical price value stored as thousandths of one million VND.
///
/// All internal arithmetic is integer; conversion to/from f64 happens only
/// at parse and display boundaries. `140500` millis renders as `"140.500"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MillionsValue {
    millis: i64,
}

impl MillionsValue {
    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    /// Create from a float in millions (rounds to 3 decimals).
    #[inline]
    pub fn from_f64(millions: f64) -> Self {
        Self {
            millis: (millions * 1000.0).round() as i64,
        }
    }

    #[inline]
    pub const fn millis(&self) -> i64 {
        self.millis
    }

    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.millis as f64 / 1000.0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Self {
            millis: self.millis.abs(),
        }
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.millis == 0
    }
}

impl Add for MillionsValue {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            millis: self.millis + other.millis,
        }
    }
}

impl Sub for MillionsValue {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self {
            millis: self.millis - other.millis,
        }
    }
}

impl Neg for MillionsValue {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            millis: -self.millis,
        }
    }
}

impl fmt::Display for MillionsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.millis < 0 { "-" } else { "" };
        let m = self.millis.abs();
        write!(f, "{}{}.{:03}", sign, m / 1000, m % 1000)
    }
}

/// A canonical value or the explicit "unavailable" sentinel.
///
/// Serialized as the rendered string (`"140.500"`) or `"-"`, matching the
/// snapshot file format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum QuoteValue {
    Available(MillionsValue),
    #[default]
    Unavailable,
}

impl QuoteValue {
    #[inline]
    pub fn is_available(&self) -> bool {
        matches!(self, QuoteValue::Available(_))
    }

    #[inline]
    pub fn value(&self) -> Option<MillionsValue> {
        match self {
            QuoteValue::Available(v) => Some(*v),
            QuoteValue::Unavailable => None,
        }
    }
}

impl From<MillionsValue> for QuoteValue {
    fn from(v: MillionsValue) -> Self {
        QuoteValue::Available(v)
    }
}

impl fmt::Display for QuoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteValue::Available(v) => v.fmt(f),
            QuoteValue::Unavailable => f.write_str(SENTINEL),
        }
    }
}

impl Serialize for QuoteValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for QuoteValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == SENTINEL || s.is_empty() {
            return Ok(QuoteValue::Unavailable);
        }
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(QuoteValue::Available(MillionsValue::from_f64(v))),
            // Unreadable values in old snapshot files degrade to the
            // sentinel rather than failing the whole load.
            _ => Ok(QuoteValue::Unavailable),
        }
    }
}

impl std::str::FromStr for QuoteValue {
    type Err = de::value::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == SENTINEL || s.is_empty() {
            return Ok(QuoteValue::Unavailable);
        }
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(QuoteValue::Available(MillionsValue::from_f64(v))),
            _ => Ok(QuoteValue::Unavailable),
        }
    }
}

/// Extraction tier that produced an accepted pair, for observability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    AdapterOverride,
    StructuredMatch,
    WindowedRegex,
    PositionalFallback,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::AdapterOverride => "adapter_override",
            Tier::StructuredMatch => "structured_match",
            Tier::WindowedRegex => "windowed_regex",
            Tier::PositionalFallback => "positional_fallback",
        }
    }
}

/// A (buy, sell) tuple for one product line.
///
/// Invariant: either both slots are populated or both are the sentinel.
/// `new` enforces this; a half-filled pair collapses to the sentinel pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FieldPair {
    pub buy: QuoteValue,
    pub sell: QuoteValue,
}

impl FieldPair {
    pub fn new(buy: QuoteValue, sell: QuoteValue) -> Self {
        if buy.is_available() && sell.is_available() {
            Self { buy, sell }
        } else {
            Self::sentinel()
        }
    }

    pub const fn sentinel() -> Self {
        Self {
            buy: QuoteValue::Unavailable,
            sell: QuoteValue::Unavailable,
        }
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.buy.is_available() && self.sell.is_available()
    }
}

fn sentinel_string() -> String {
    SENTINEL.to_string()
}

fn is_sentinel(s: &str) -> bool {
    s == SENTINEL
}

/// Persisted quote for one product line: values plus delta strings.
///
/// Delta strings hold the sentinel until the delta engine fills them.
/// `source` and `tier` record which feed and strategy produced the pair;
/// downstream logic never reads them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductQuote {
    pub buy: QuoteValue,
    pub sell: QuoteValue,
    #[serde(default = "sentinel_string", skip_serializing_if = "is_sentinel")]
    pub buy_change: String,
    #[serde(default = "sentinel_string", skip_serializing_if = "is_sentinel")]
    pub buy_change_pct: String,
    #[serde(default = "sentinel_string", skip_serializing_if = "is_sentinel")]
    pub sell_change: String,
    #[serde(default = "sentinel_string", skip_serializing_if = "is_sentinel")]
    pub sell_change_pct: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
}

impl Default for ProductQuote {
    fn default() -> Self {
        Self {
            buy: QuoteValue::Unavailable,
            sell: QuoteValue::Unavailable,
            buy_change: sentinel_string(),
            buy_change_pct: sentinel_string(),
            sell_change: sentinel_string(),
            sell_change_pct: sentinel_string(),
            source: None,
            tier: None,
        }
    }
}

impl ProductQuote {
    pub fn from_pair(pair: FieldPair) -> Self {
        Self {
            buy: pair.buy,
            sell: pair.sell,
            ..Self::default()
        }
    }

    pub fn pair(&self) -> FieldPair {
        FieldPair {
            buy: self.buy,
            sell: self.sell,
        }
    }

    pub fn clear_deltas(&mut self) {
        self.buy_change = sentinel_string();
        self.buy_change_pct = sentinel_string();
        self.sell_change = sentinel_string();
        self.sell_change_pct = sentinel_string();
    }
}

/// One brand's reconciled record: bar gold and ring gold quotes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandRecord {
    #[serde(default)]
    pub bar: ProductQuote,
    #[serde(default)]
    pub ring: ProductQuote,
}

impl BrandRecord {
    /// True if any field carries a real value.
    pub fn has_any_value(&self) -> bool {
        self.bar.buy.is_available()
            || self.bar.sell.is_available()
            || self.ring.buy.is_available()
            || self.ring.sell.is_available()
    }
}

/// Gold component of a snapshot: brand-keyed records plus the component
/// update time (sentinel when nothing usable was reconciled).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoldSection {
    #[serde(default = "sentinel_string")]
    pub update_time: String,
    #[serde(flatten)]
    pub brands: BTreeMap<Brand, BrandRecord>,
}

impl Default for GoldSection {
    fn default() -> Self {
        let brands = Brand::ALL
            .iter()
            .map(|b| (*b, BrandRecord::default()))
            .collect();
        Self {
            update_time: sentinel_string(),
            brands,
        }
    }
}

/// One silver vendor's record: retail bar ("bạc miếng", per lượng) and
/// 1-kg ingot ("bạc thỏi") quotes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SilverRecord {
    #[serde(default)]
    pub bar: ProductQuote,
    #[serde(default)]
    pub ingot: ProductQuote,
}

impl SilverRecord {
    pub fn has_any_value(&self) -> bool {
        self.bar.buy.is_available()
            || self.bar.sell.is_available()
            || self.ingot.buy.is_available()
            || self.ingot.sell.is_available()
    }
}

/// Silver component of a snapshot. Only one vendor publishes a usable
/// silver board today, so the section is a single keyed record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SilverSection {
    #[serde(default = "sentinel_string")]
    pub update_time: String,
    #[serde(default)]
    pub phuquy: SilverRecord,
}

impl Default for SilverSection {
    fn default() -> Self {
        Self {
            update_time: sentinel_string(),
            phuquy: SilverRecord::default(),
        }
    }
}

/// Exchange component: USD/VND reference rates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExchangeSection {
    #[serde(default = "sentinel_string")]
    pub update_time: String,
    #[serde(default)]
    pub cash_buy: QuoteValue,
    #[serde(default)]
    pub transfer_buy: QuoteValue,
    #[serde(default)]
    pub sell: QuoteValue,
    #[serde(default = "sentinel_string", skip_serializing_if = "is_sentinel")]
    pub cash_buy_change: String,
    #[serde(default = "sentinel_string", skip_serializing_if = "is_sentinel")]
    pub cash_buy_change_pct: String,
    #[serde(default = "sentinel_string", skip_serializing_if = "is_sentinel")]
    pub transfer_buy_change: String,
    #[serde(default = "sentinel_string", skip_serializing_if = "is_sentinel")]
    pub transfer_buy_change_pct: String,
    #[serde(default = "sentinel_string", skip_serializing_if = "is_sentinel")]
    pub sell_change: String,
    #[serde(default = "sentinel_string", skip_serializing_if = "is_sentinel")]
    pub sell_change_pct: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Default for ExchangeSection {
    fn default() -> Self {
        Self {
            update_time: sentinel_string(),
            cash_buy: QuoteValue::Unavailable,
            transfer_buy: QuoteValue::Unavailable,
            sell: QuoteValue::Unavailable,
            cash_buy_change: sentinel_string(),
            cash_buy_change_pct: sentinel_string(),
            transfer_buy_change: sentinel_string(),
            transfer_buy_change_pct: sentinel_string(),
            sell_change: sentinel_string(),
            sell_change_pct: sentinel_string(),
            source: None,
        }
    }
}

impl ExchangeSection {
    pub fn has_any_value(&self) -> bool {
        self.cash_buy.is_available() || self.transfer_buy.is_available() || self.sell.is_available()
    }

    pub fn clear_deltas(&mut self) {
        self.cash_buy_change = sentinel_string();
        self.cash_buy_change_pct = sentinel_string();
        self.transfer_buy_change = sentinel_string();
        self.transfer_buy_change_pct = sentinel_string();
        self.sell_change = sentinel_string();
        self.sell_change_pct = sentinel_string();
    }
}

/// The full reconciled dataset for one calendar date. One JSON file per
/// date; intra-day cycles overwrite the same file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub gold: GoldSection,
    #[serde(default)]
    pub silver: SilverSection,
    #[serde(default)]
    pub exchange: ExchangeSection,
}

/// Result of one completed cycle, published atomically for readers.
#[derive(Clone, Debug, Serialize)]
pub struct PublishedResult {
    pub cycle_seq: u64,
    pub generated_at: DateTime<Utc>,
    pub baseline_date: Option<NaiveDate>,
    pub snapshot: Snapshot,
}
