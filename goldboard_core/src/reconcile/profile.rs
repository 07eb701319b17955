//! Per-field extraction configuration: keyword labels, window sizes,
//! positional offsets and optional row qualifiers. One profile per
//! product line; sources that lay their pages out differently supply
//! their own profile.

/// Configuration for extracting one (buy, sell) pair from page text.
#[derive(Clone, Debug)]
pub struct FieldProfile {
    /// Row label for the structured tier (matched case-insensitively).
    pub label: String,
    /// Keyword phrase anchoring the windowed-regex tier.
    pub window_phrase: String,
    /// Max characters between the phrase and the first token.
    pub window: usize,
    /// Max characters between the two tokens.
    pub gap: usize,
    /// Zero-based index into the page's large tokens for the positional
    /// fallback tier (the pair is this token and the next one).
    pub positional_offset: usize,
    /// Extra pattern a labelled row must also match (case-insensitive).
    pub require: Option<String>,
    /// Pattern that disqualifies a labelled row (case-insensitive).
    pub reject: Option<String>,
}

impl FieldProfile {
    pub fn new(label: &str, window_phrase: &str, positional_offset: usize) -> Self {
        Self {
            label: label.to_string(),
            window_phrase: window_phrase.to_string(),
            window: DEFAULT_WINDOW,
            gap: DEFAULT_GAP,
            positional_offset,
            require: None,
            reject: None,
        }
    }

    pub fn require(mut self, pattern: &str) -> Self {
        self.require = Some(pattern.to_string());
        self
    }

    pub fn reject(mut self, pattern: &str) -> Self {
        self.reject = Some(pattern.to_string());
        self
    }

    /// Retail silver bar row: "bạc miếng" quoted per lượng, skipping the
    /// 500-lượng wholesale row.
    pub fn silver_bar() -> Self {
        Self::new("bạc miếng", "bạc miếng", 0)
            .require(r"lượng")
            .reject(r"500\s*lượng")
    }

    /// 1-kg silver ingot row: "thỏi" with exactly a 1-kg unit; rows with
    /// any other quantity before the unit are wholesale listings.
    pub fn silver_ingot() -> Self {
        Self::new("thỏi", "bạc thỏi", 2)
            .require(r"1\s*(?:kg|kilo)")
            .reject(r"(?:[2-9]|\d{2,})\s*(?:kg|kilo|lượng)")
    }
}

const DEFAULT_WINDOW: usize = 160;
const DEFAULT_GAP: usize = 80;

/// Extraction profiles for one instrument: bar gold and ring gold.
#[derive(Clone, Debug)]
pub struct ExtractionProfile {
    pub bar: FieldProfile,
    pub ring: FieldProfile,
}

impl ExtractionProfile {
    /// Layout used by the aggregate board pages: "miếng" and "nhẫn" row
    /// labels, bar quotes first in document order.
    pub fn default_gold() -> Self {
        Self {
            bar: FieldProfile::new("miếng", "giá vàng miếng", 0),
            ring: FieldProfile::new("nhẫn", "giá vàng nhẫn", 2),
        }
    }
}
