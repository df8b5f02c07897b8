//! Mediation error taxonomy.
//!
//! # Responsibilities
//! - Tell callers whether a failed request may be retried by the user
//! - Carry rejection details (ARC and reasons) verbatim
//!
//! # Design Decisions
//! - Malformed rule registrations never become a `MediationError`; the store
//!   logs and drops them at registration time
//! - Benign statuses are resolved before an error is ever built

use thiserror::Error;

/// Errors surfaced by mediation, URL rewriting and the service operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediationError {
    /// Host misconfiguration, such as re-initializing with a different config.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Network conditions prevented a fetch; a user initiated retry is allowed.
    #[error("retryable network error: {0}")]
    Retryable(String),

    /// The attestation service rejected the app or device.
    #[error("{message}: {arc} {rejection_reasons}")]
    Rejected {
        message: String,
        arc: String,
        rejection_reasons: String,
    },

    /// Any other failure; treated as a non-recoverable integration fault.
    #[error("permanent error: {0}")]
    Permanent(String),
}

impl MediationError {
    /// True when the caller may offer a retry to the user.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MediationError::Retryable(_))
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            MediationError::Configuration(_) => "configuration",
            MediationError::Retryable(_) => "retryable",
            MediationError::Rejected { .. } => "rejected",
            MediationError::Permanent(_) => "permanent",
        }
    }
}

/// Result type for mediation operations.
pub type MediationResult<T> = Result<T, MediationError>;
