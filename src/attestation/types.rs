//! Fetch results and error definitions for the attestation collaborator.

use std::fmt;
use thiserror::Error;

/// Status reported by the attestation service for a token or secret fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchStatus {
    Success,
    NoNetwork,
    PoorNetwork,
    MitmDetected,
    Rejected,
    UnknownKey,
    UnknownUrl,
    UnprotectedUrl,
    NoApproovService,
}

impl FetchStatus {
    /// Network conditions that a user initiated retry may resolve.
    pub fn is_network_failure(self) -> bool {
        matches!(
            self,
            FetchStatus::NoNetwork | FetchStatus::PoorNetwork | FetchStatus::MitmDetected
        )
    }

    /// Stable label used in messages and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            FetchStatus::Success => "SUCCESS",
            FetchStatus::NoNetwork => "NO_NETWORK",
            FetchStatus::PoorNetwork => "POOR_NETWORK",
            FetchStatus::MitmDetected => "MITM_DETECTED",
            FetchStatus::Rejected => "REJECTED",
            FetchStatus::UnknownKey => "UNKNOWN_KEY",
            FetchStatus::UnknownUrl => "UNKNOWN_URL",
            FetchStatus::UnprotectedUrl => "UNPROTECTED_URL",
            FetchStatus::NoApproovService => "NO_APPROOV_SERVICE",
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single fetch from the attestation service.
///
/// Built only by [`Attester`](crate::attestation::Attester) implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub status: FetchStatus,
    pub token: Option<String>,
    pub secret: Option<String>,
    /// Attestation rejection code, set on `Rejected`.
    pub arc: Option<String>,
    pub rejection_reasons: Option<String>,
    /// The service pushed a dynamic configuration update with this result.
    pub config_changed: bool,
    /// Token form that is safe to write to logs.
    pub loggable_token: Option<String>,
}

impl FetchOutcome {
    /// Outcome with the given status and no payload.
    pub fn new(status: FetchStatus) -> Self {
        Self {
            status,
            token: None,
            secret: None,
            arc: None,
            rejection_reasons: None,
            config_changed: false,
            loggable_token: None,
        }
    }

    /// Successful token fetch.
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::new(FetchStatus::Success)
        }
    }

    /// Successful secure string fetch.
    pub fn secret(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
            ..Self::new(FetchStatus::Success)
        }
    }

    /// Rejected fetch carrying the ARC and reasons.
    pub fn rejected(arc: impl Into<String>, reasons: impl Into<String>) -> Self {
        Self {
            arc: Some(arc.into()),
            rejection_reasons: Some(reasons.into()),
            ..Self::new(FetchStatus::Rejected)
        }
    }

    /// Marks the outcome as carrying a dynamic configuration update.
    pub fn with_config_changed(mut self) -> Self {
        self.config_changed = true;
        self
    }
}

/// Errors raised synchronously by the attestation SDK.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttesterError {
    #[error("IllegalArgument: {0}")]
    InvalidArgument(String),

    #[error("IllegalState: {0}")]
    InvalidState(String),
}
