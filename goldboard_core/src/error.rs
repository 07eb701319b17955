//! Error taxonomy for the reconciliation pipeline.
//!
//! Every variant is caught at the narrowest possible scope (per source, per
//! field) and converted into a sentinel value plus a log entry; nothing
//! here is allowed to propagate past the cycle orchestrator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuoteError {
    /// A source adapter failed or returned nothing usable.
    // Not named `source`: thiserror reserves that for Error::source().
    #[error("source {source_name} unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// Candidate tokens were found but no tier produced a complete pair.
    /// Distinguished from `SourceUnavailable` for observability only.
    #[error("ambiguous extraction for {field}: no tier produced a complete pair")]
    AmbiguousExtraction { field: String },

    /// A computed delta exceeded the implausibility bound. The delta is
    /// suppressed; the underlying current value is kept.
    #[error("sanity violation for {field}: |{delta:.3}| exceeds bound {bound:.3}")]
    SanityViolation {
        field: String,
        delta: f64,
        bound: f64,
    },

    /// Snapshot read or write failed. Treated as "no snapshot available"
    /// for the affected operation.
    #[error("snapshot persistence failure: {0}")]
    PersistenceFailure(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let e = QuoteError::SourceUnavailable {
            source_name: "giavang-sjc".to_string(),
            reason: "timeout".to_string(),
        };
        assert_eq!(e.to_string(), "source giavang-sjc unavailable: timeout");

        let e = QuoteError::SanityViolation {
            field: "SJC.bar.buy".to_string(),
            delta: 100.0,
            bound: 50.0,
        };
        assert_eq!(
            e.to_string(),
            "sanity violation for SJC.bar.buy: |100.000| exceeds bound 50.000"
        );
    }
}
