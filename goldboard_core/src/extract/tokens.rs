//! Token extractor: scans raw text for numeric substrings and returns
//! ordered candidate tokens. Tokens shorter than four digits are assumed
//! to be purity or percentage noise, not prices.

use regex::Regex;
use std::sync::OnceLock;

/// Minimum digit count for a token to qualify as a price candidate.
const MIN_PRICE_DIGITS: usize = 4;

/// Minimum digit count for a "large" token usable by the positional
/// fallback tier (stricter than the general filter).
const MIN_LARGE_DIGITS: usize = 5;

/// A numeric candidate: the matched lexeme as it appeared in the text and
/// its digits-only form. The raw form is what the value normalizer needs
/// to distinguish grouped decimals from full-currency integers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub raw: String,
    pub digits: String,
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Plain digit runs first so "140500" is not split into "140"/"500".
        Regex::new(r"\d{4,}|\d{1,3}(?:[.,]\d{3})+(?:[.,]\d+)?|\d{1,3}[.,]\d+").expect("number regex")
    })
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

fn update_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)Cập nhật(?: lúc|:)?\s*([\d:\s/\-APM]{6,})").expect("update time regex")
    })
}

/// Collapse invisible separators and whitespace runs to single spaces.
///
/// Source pages pad numbers with NBSP, zero-width and soft-hyphen
/// characters that would otherwise split tokens.
pub fn normalize_text(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| match c {
            '\u{00A0}' | '\u{200B}' | '\u{FEFF}' | '\u{200C}' | '\u{00AD}' | '\u{202F}'
            | '\u{2060}' => ' ',
            other => other,
        })
        .collect();
    whitespace_re().replace_all(&cleaned, " ").trim().to_string()
}

/// Keep only ASCII digits.
pub fn clean_digits(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Scan text for numeric tokens, in document order.
///
/// Recognizes thousands-separated numbers using either comma or period
/// and plain digit runs of length >= 4. Tokens whose digit count is
/// below four are dropped. An empty result is valid.
pub fn extract_tokens(text: &str) -> Vec<Token> {
    number_re()
        .find_iter(text)
        .filter_map(|m| {
            let digits = clean_digits(m.as_str());
            if digits.len() >= MIN_PRICE_DIGITS {
                Some(Token {
                    raw: m.as_str().to_string(),
                    digits,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Tokens big enough for the positional fallback tier: at least five
/// digits and a numeric value of at least 1000.
pub fn large_tokens(text: &str) -> Vec<Token> {
    extract_tokens(text)
        .into_iter()
        .filter(|t| {
            t.digits.len() >= MIN_LARGE_DIGITS
                && t.digits.parse::<u64>().map(|n| n >= 1000).unwrap_or(false)
        })
        .collect()
}

/// Pull a source-supplied update-time phrase ("Cập nhật ...") out of page
/// text, if present.
pub fn source_timestamp(text: &str) -> Option<String> {
    update_time_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouped_decimal_tokens() {
        let toks = extract_tokens("Mua 140.500 Bán 141.300");
        let raws: Vec<&str> = toks.iter().map(|t| t.raw.as_str()).collect();
        assert_eq!(raws, vec!["140.500", "141.300"]);
        assert_eq!(toks[0].digits, "140500");
    }

    #[test]
    fn test_comma_grouping_and_plain_runs() {
        let toks = extract_tokens("1,382,600 then 138600");
        let digits: Vec<&str> = toks.iter().map(|t| t.digits.as_str()).collect();
        assert_eq!(digits, vec!["1382600", "138600"]);
    }

    #[test]
    fn test_short_tokens_filtered_as_noise() {
        // Purity codes and percentages must not become price candidates.
        let toks = extract_tokens("vàng 999 24K 98.5% giá 140.500");
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].digits, "140500");
    }

    #[test]
    fn test_empty_result_is_valid() {
        assert!(extract_tokens("no numbers here").is_empty());
        assert!(extract_tokens("").is_empty());
    }

    #[test]
    fn test_large_tokens_drop_small_values() {
        let toks = large_tokens("offset 0042 price 140.500 qty 1.000");
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].digits, "140500");
    }

    #[test]
    fn test_normalize_text_strips_invisible_separators() {
        let s = "140\u{00A0}500\u{200B} \n\t x";
        assert_eq!(normalize_text(s), "140 500 x");
    }

    #[test]
    fn test_source_timestamp() {
        let text = normalize_text("Giá vàng Cập nhật lúc 09:30 17/10/2025 nguồn");
        let ts = source_timestamp(&text).unwrap();
        assert!(ts.starts_with("09:30 17/10/2025"));
        assert_eq!(source_timestamp("no timestamp"), None);
    }
}
