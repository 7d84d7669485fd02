//! Crate-wide error type.
//!
//! Domain-specific billing errors live in [`crate::billing::error`] and
//! convert into this type at the module boundary.

/// The main error type for pledgewave operations.
#[derive(Debug, thiserror::Error)]
pub enum PledgewaveError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl PledgewaveError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias for pledgewave operations.
pub type Result<T> = std::result::Result<T, PledgewaveError>;

impl From<serde_json::Error> for PledgewaveError {
    fn from(err: serde_json::Error) -> Self {
        // Classify based on error category
        if err.is_data() || err.is_syntax() || err.is_eof() {
            PledgewaveError::BadRequest(format!("JSON error: {}", err))
        } else {
            PledgewaveError::Internal(format!("JSON serialization error: {}", err))
        }
    }
}
