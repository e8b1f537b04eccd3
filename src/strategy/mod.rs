//! Extraction strategy boundary
//!
//! The engine never fetches or parses anything itself; it hands an IMO
//! number to an [`ExtractionStrategy`] and receives either an opaque record
//! or a classified error. Strategies must not touch engine state, which is
//! what makes scripted strategies in tests equivalent to the real one.

mod http;
mod parser;

pub use http::VesselPageStrategy;
pub use parser::{extract_vessel_fields, looks_like_missing_vessel};

use crate::space::FailureKind;
use std::future::Future;
use thiserror::Error;

/// An extracted vessel record
///
/// The engine treats the payload as opaque JSON; only the strategy that
/// produced it and the sink that stores it care about its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Record(pub serde_json::Value);

impl Record {
    /// Builds a record from a field map
    pub fn from_fields(fields: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(serde_json::Value::Object(fields))
    }
}

/// Errors a strategy can report for one extraction attempt
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    #[error("request timed out")]
    Timeout,

    #[error("no vessel record for this identifier")]
    NotFound,

    #[error("HTTP status {status}")]
    Http { status: u16 },

    #[error("network error: {0}")]
    Network(String),
}

impl ExtractError {
    /// Returns true if a later attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        self.failure_kind().is_retryable()
    }

    /// Maps the error onto the engine's failure classification
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Timeout => FailureKind::Timeout,
            Self::NotFound => FailureKind::NotFound,
            Self::Http { .. } | Self::Network(_) => FailureKind::Transient,
        }
    }
}

/// A pluggable source of vessel records
///
/// `extract` must be pure with respect to engine state: same identifier,
/// same attempt, no shared mutation. Implementations are shared across
/// tasks, so they take `&self`.
pub trait ExtractionStrategy: Send + Sync + 'static {
    /// Attempts to produce the record for one IMO number
    fn extract(&self, imo: u64) -> impl Future<Output = Result<Record, ExtractError>> + Send;
}

impl<T: ExtractionStrategy> ExtractionStrategy for std::sync::Arc<T> {
    fn extract(&self, imo: u64) -> impl Future<Output = Result<Record, ExtractError>> + Send {
        (**self).extract(imo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert_eq!(ExtractError::Timeout.failure_kind(), FailureKind::Timeout);
        assert_eq!(
            ExtractError::NotFound.failure_kind(),
            FailureKind::NotFound
        );
        assert_eq!(
            ExtractError::Http { status: 500 }.failure_kind(),
            FailureKind::Transient
        );
        assert_eq!(
            ExtractError::Network("connection refused".to_string()).failure_kind(),
            FailureKind::Transient
        );
    }

    #[test]
    fn test_retryability_follows_kind() {
        assert!(ExtractError::Timeout.is_retryable());
        assert!(ExtractError::Http { status: 503 }.is_retryable());
        assert!(!ExtractError::NotFound.is_retryable());
    }
}
