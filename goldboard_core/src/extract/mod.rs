//! Text extraction: token scanning and value normalization.

pub mod normalize;
pub mod tokens;

pub use normalize::{normalize_number, normalize_value, UnitHint};
pub use tokens::{extract_tokens, large_tokens, normalize_text, source_timestamp, Token};
