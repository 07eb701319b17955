//! Extraction strategy tiers. Each tier is a pure function
//! `text -> Option<FieldPair>`; a tier returns `Some` only for a
//! complete pair, never a half-filled one.

use crate::extract::{extract_tokens, large_tokens, normalize_value, Token, UnitHint};
use crate::reconcile::profile::FieldProfile;
use crate::types::FieldPair;
use regex::Regex;
use std::sync::OnceLock;

fn grouped_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,3}(?:[.,]\d{3})+$").expect("grouped token regex"))
}

/// Price-shaped tokens only: grouped triplets or long digit runs. Keeps
/// purity marks like "999.9" out of a labelled row's picks.
fn is_price_like(token: &Token) -> bool {
    token.digits.len() >= 5 || grouped_token_re().is_match(&token.raw)
}

/// Normalize two raw lexemes into a pair. Collapses to the sentinel pair
/// unless both sides parse.
pub fn pair_from_raw(buy_raw: &str, sell_raw: &str, hint: UnitHint) -> FieldPair {
    FieldPair::new(
        normalize_value(buy_raw, hint),
        normalize_value(sell_raw, hint),
    )
}

fn pair_from_tokens(buy: Option<&Token>, sell: Option<&Token>, hint: UnitHint) -> Option<FieldPair> {
    let pair = pair_from_raw(buy?.raw.as_str(), sell?.raw.as_str(), hint);
    pair.is_complete().then_some(pair)
}

fn qualifier_re(pattern: &Option<String>) -> Option<Regex> {
    pattern
        .as_ref()
        .and_then(|p| Regex::new(&format!("(?i){p}")).ok())
}

/// Tier 1: find a line whose label matches and take the first two price
/// tokens after the label. Rows that wrap may carry their numbers on the
/// following line. Profiles may qualify rows further: a `require`
/// pattern the row must also contain, and a `reject` pattern that
/// disqualifies it (unit filters for pages listing several pack sizes).
pub fn structured_match(text: &str, field: &FieldProfile, hint: UnitHint) -> Option<FieldPair> {
    let label_re = Regex::new(&format!("(?i){}", regex::escape(&field.label))).ok()?;
    let require_re = qualifier_re(&field.require);
    let reject_re = qualifier_re(&field.reject);
    let lines: Vec<&str> = text.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        let Some(m) = label_re.find(line) else {
            continue;
        };
        if let Some(re) = &require_re {
            if !re.is_match(line) {
                continue;
            }
        }
        if let Some(re) = &reject_re {
            if re.is_match(line) {
                continue;
            }
        }
        let mut tokens: Vec<Token> = extract_tokens(&line[m.end()..])
            .into_iter()
            .filter(is_price_like)
            .collect();
        if tokens.len() < 2 {
            if let Some(next) = lines.get(i + 1) {
                tokens.extend(extract_tokens(next).into_iter().filter(is_price_like));
            }
        }
        if let Some(pair) = pair_from_tokens(tokens.first(), tokens.get(1), hint) {
            return Some(pair);
        }
    }
    None
}

/// Tier 2: two grouped-decimal tokens within a bounded window after the
/// keyword phrase.
pub fn windowed_regex(
    text: &str,
    phrase: &str,
    window: usize,
    gap: usize,
    hint: UnitHint,
) -> Option<FieldPair> {
    let pattern = format!(
        r"(?i){}[\s\S]{{0,{}}}?(\d{{1,3}}[.,]\d{{3}})[\s\S]{{0,{}}}?(\d{{1,3}}[.,]\d{{3}})",
        regex::escape(phrase),
        window,
        gap
    );
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(text)?;
    let pair = pair_from_raw(&caps[1], &caps[2], hint);
    pair.is_complete().then_some(pair)
}

/// Tier 3: the Nth and (N+1)th large tokens anywhere in the body. Least
/// trustworthy; used only after tiers 1 and 2 both fail.
pub fn positional_fallback(text: &str, offset: usize, hint: UnitHint) -> Option<FieldPair> {
    let tokens = large_tokens(text);
    pair_from_tokens(tokens.get(offset), tokens.get(offset + 1), hint)
}
