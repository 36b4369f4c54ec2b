use std::time::Duration;

/// Errors reported by the platform probe boundary.
///
/// These never escape [`crate::probe::RetryPolicy`]: after the retry budget
/// is exhausted the last error is folded into a `FetchOutcome::Unavailable`
/// for diagnostics only.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("device not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("malformed probe output: {0}")]
    Malformed(String),
}

impl ProbeError {
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        ProbeError::NotFound(msg.into())
    }

    pub fn permission_denied<S: Into<String>>(msg: S) -> Self {
        ProbeError::PermissionDenied(msg.into())
    }

    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        ProbeError::Malformed(msg.into())
    }
}

/// Errors from the state-store write boundary.
///
/// A publish failure is logged and the affected records stay dirty, so the
/// same delta is retried on the next poll cycle. It never blocks the
/// scheduler or corrupts in-memory state.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("state store write failed: {0}")]
    Store(String),

    #[error("record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PublishError {
    pub fn store<S: Into<String>>(msg: S) -> Self {
        PublishError::Store(msg.into())
    }
}
