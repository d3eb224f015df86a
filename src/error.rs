// src/error.rs
use thiserror::Error;

/// Failure taxonomy for ingestion units. The orchestrator routes on the
/// variant (retry, skip the unit, abort the source), so adapters classify
/// failures instead of stringifying them.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Missing or disabled source, missing credential. Fatal for that
    /// source's run, never retried.
    #[error("configuration: {0}")]
    Config(String),

    /// Network timeout, 5xx, temporary render failure. Eligible for a
    /// bounded retry; exhausted retries degrade to a per-item failure.
    #[error("transient: {0}")]
    Transient(String),

    /// 4xx from the vendor (auth failure, quota). Likely needs human
    /// action, so it is logged apart from transient noise.
    #[error("vendor rejection ({status}): {message}")]
    VendorRejection { status: u16, message: String },

    /// Malformed vendor response or feed document. Unit skipped.
    #[error("parse: {0}")]
    Parse(String),

    /// Record store failure.
    #[error("store: {0}")]
    Store(#[from] sqlx::Error),
}

/// Report bucket for an error; the run report samples the first few
/// messages per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Config,
    Transient,
    VendorRejection,
    Parse,
    Store,
}

impl IngestError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            IngestError::Config(_) => ErrorCategory::Config,
            IngestError::Transient(_) => ErrorCategory::Transient,
            IngestError::VendorRejection { .. } => ErrorCategory::VendorRejection,
            IngestError::Parse(_) => ErrorCategory::Parse,
            IngestError::Store(_) => ErrorCategory::Store,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, IngestError::Transient(_))
    }

    /// Classify a reqwest transport failure. Timeouts and connection
    /// problems are transient; a body that fails to decode is a parse
    /// problem.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            IngestError::Parse(err.to_string())
        } else {
            IngestError::Transient(err.to_string())
        }
    }

    /// Classify a non-success HTTP status. 5xx is retryable; 4xx means the
    /// vendor rejected us and retrying the same request cannot help.
    pub fn from_status(status: u16, body: &str) -> Self {
        let snippet: String = body.chars().take(200).collect();
        if (500..600).contains(&status) {
            IngestError::Transient(format!("HTTP {status}: {snippet}"))
        } else {
            IngestError::VendorRejection {
                status,
                message: snippet,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification_splits_4xx_and_5xx() {
        assert!(matches!(
            IngestError::from_status(503, "upstream down"),
            IngestError::Transient(_)
        ));
        assert!(matches!(
            IngestError::from_status(401, "bad key"),
            IngestError::VendorRejection { status: 401, .. }
        ));
    }

    #[test]
    fn only_transient_is_retryable() {
        assert!(IngestError::Transient("t".into()).is_transient());
        assert!(!IngestError::Config("c".into()).is_transient());
        assert!(!IngestError::VendorRejection {
            status: 429,
            message: "quota".into()
        }
        .is_transient());
    }

    #[test]
    fn status_snippet_is_bounded() {
        let body = "x".repeat(10_000);
        match IngestError::from_status(400, &body) {
            IngestError::VendorRejection { message, .. } => assert_eq!(message.len(), 200),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
