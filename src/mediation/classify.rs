//! Outcome classification.
//!
//! Maps a raw [`FetchOutcome`] to a [`MediationVerdict`]. Every call site
//! (token fetch, header substitution, query substitution, explicit service
//! fetches) goes through [`classify`]; only the benign status set and the
//! expected value differ.
//!
//! | Status | Verdict |
//! |---|---|
//! | `Success` | `ProceedWithToken` / `ProceedWithSecret` |
//! | `Rejected` | `Rejected` (never retried) |
//! | `NoNetwork`, `PoorNetwork`, `MitmDetected` | `RetryableFailure`, or `Proceed` when proceeding on network failure |
//! | benign for the call site | `Proceed` |
//! | anything else | `PermanentFailure` |

use crate::attestation::types::{FetchOutcome, FetchStatus};
use crate::error::{MediationError, MediationResult};

/// Statuses a token fetch tolerates without failing the request.
pub const TOKEN_BENIGN: &[FetchStatus] = &[
    FetchStatus::NoApproovService,
    FetchStatus::UnknownUrl,
    FetchStatus::UnprotectedUrl,
];

/// Statuses a secure string lookup tolerates: a key with no secret set up.
pub const SECRET_BENIGN: &[FetchStatus] = &[FetchStatus::UnknownKey];

/// Which value a successful fetch must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Token,
    Secret,
}

/// Per call site classification policy.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyPolicy {
    pub expected: Expected,
    pub benign: &'static [FetchStatus],
    pub proceed_on_network_failure: bool,
}

impl ClassifyPolicy {
    /// Policy for the mediator's token fetch.
    pub fn token(proceed_on_network_failure: bool) -> Self {
        Self {
            expected: Expected::Token,
            benign: TOKEN_BENIGN,
            proceed_on_network_failure,
        }
    }

    /// Policy for header and query parameter secret lookups.
    pub fn secret(proceed_on_network_failure: bool) -> Self {
        Self {
            expected: Expected::Secret,
            benign: SECRET_BENIGN,
            proceed_on_network_failure,
        }
    }

    /// Policy for explicit fetches where every failure is reported.
    pub fn strict(expected: Expected) -> Self {
        Self {
            expected,
            benign: &[],
            proceed_on_network_failure: false,
        }
    }
}

/// Classified result of a single fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediationVerdict {
    /// Continue without changing the request.
    Proceed,
    ProceedWithToken(String),
    ProceedWithSecret(String),
    RetryableFailure(String),
    PermanentFailure(String),
    Rejected {
        reason: String,
        arc: String,
        rejection_reasons: String,
    },
}

impl MediationVerdict {
    /// Resolved value on a proceed verdict, or the matching error.
    pub fn into_result(self) -> MediationResult<Option<String>> {
        match self {
            MediationVerdict::Proceed => Ok(None),
            MediationVerdict::ProceedWithToken(value)
            | MediationVerdict::ProceedWithSecret(value) => Ok(Some(value)),
            MediationVerdict::RetryableFailure(reason) => Err(MediationError::Retryable(reason)),
            MediationVerdict::PermanentFailure(reason) => Err(MediationError::Permanent(reason)),
            MediationVerdict::Rejected {
                reason,
                arc,
                rejection_reasons,
            } => Err(MediationError::Rejected {
                message: reason,
                arc,
                rejection_reasons,
            }),
        }
    }
}

/// Classify `outcome` under `policy`. `context` prefixes any failure reason.
pub fn classify(context: &str, outcome: &FetchOutcome, policy: &ClassifyPolicy) -> MediationVerdict {
    let status = outcome.status;
    match status {
        FetchStatus::Success => {
            let value = match policy.expected {
                Expected::Token => outcome.token.clone(),
                Expected::Secret => outcome.secret.clone(),
            };
            match (value, policy.expected) {
                (Some(token), Expected::Token) => MediationVerdict::ProceedWithToken(token),
                (Some(secret), Expected::Secret) => MediationVerdict::ProceedWithSecret(secret),
                (None, _) => MediationVerdict::PermanentFailure(format!(
                    "{context}: {status} without a value"
                )),
            }
        }
        FetchStatus::Rejected => MediationVerdict::Rejected {
            reason: format!("{context}: {status}"),
            arc: outcome.arc.clone().unwrap_or_default(),
            rejection_reasons: outcome.rejection_reasons.clone().unwrap_or_default(),
        },
        s if s.is_network_failure() => {
            if policy.proceed_on_network_failure {
                MediationVerdict::Proceed
            } else {
                MediationVerdict::RetryableFailure(format!("{context}: {status}"))
            }
        }
        s if policy.benign.contains(&s) => MediationVerdict::Proceed,
        _ => MediationVerdict::PermanentFailure(format!("{context}: {status}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: FetchStatus) -> FetchOutcome {
        FetchOutcome::new(status)
    }

    #[test]
    fn test_success_carries_value() {
        let verdict = classify("token", &FetchOutcome::token("tok"), &ClassifyPolicy::token(false));
        assert_eq!(verdict, MediationVerdict::ProceedWithToken("tok".into()));

        let verdict = classify("secret", &FetchOutcome::secret("s3"), &ClassifyPolicy::secret(false));
        assert_eq!(verdict, MediationVerdict::ProceedWithSecret("s3".into()));
    }

    #[test]
    fn test_success_without_value_is_permanent() {
        let verdict = classify("secret", &outcome(FetchStatus::Success), &ClassifyPolicy::secret(false));
        assert!(matches!(verdict, MediationVerdict::PermanentFailure(_)));
    }

    #[test]
    fn test_network_failures() {
        for status in [FetchStatus::NoNetwork, FetchStatus::PoorNetwork, FetchStatus::MitmDetected] {
            let verdict = classify("token for a.com", &outcome(status), &ClassifyPolicy::token(false));
            assert_eq!(
                verdict,
                MediationVerdict::RetryableFailure(format!("token for a.com: {status}"))
            );

            let verdict = classify("token for a.com", &outcome(status), &ClassifyPolicy::token(true));
            assert_eq!(verdict, MediationVerdict::Proceed);
        }
    }

    #[test]
    fn test_rejected_never_suppressed() {
        let rejected = FetchOutcome::rejected("ARC42", "rooted device");
        let verdict = classify("header Authorization", &rejected, &ClassifyPolicy::secret(true));
        assert_eq!(
            verdict,
            MediationVerdict::Rejected {
                reason: "header Authorization: REJECTED".into(),
                arc: "ARC42".into(),
                rejection_reasons: "rooted device".into(),
            }
        );
    }

    #[test]
    fn test_benign_sets_differ_per_call_site() {
        for status in [FetchStatus::NoApproovService, FetchStatus::UnknownUrl, FetchStatus::UnprotectedUrl] {
            assert_eq!(classify("t", &outcome(status), &ClassifyPolicy::token(false)), MediationVerdict::Proceed);
            assert!(matches!(
                classify("s", &outcome(status), &ClassifyPolicy::secret(false)),
                MediationVerdict::PermanentFailure(_)
            ));
        }

        assert_eq!(
            classify("s", &outcome(FetchStatus::UnknownKey), &ClassifyPolicy::secret(false)),
            MediationVerdict::Proceed
        );
        assert!(matches!(
            classify("t", &outcome(FetchStatus::UnknownKey), &ClassifyPolicy::token(false)),
            MediationVerdict::PermanentFailure(_)
        ));
    }

    #[test]
    fn test_strict_policy() {
        let verdict = classify("fetchToken", &outcome(FetchStatus::UnknownUrl), &ClassifyPolicy::strict(Expected::Token));
        assert_eq!(verdict, MediationVerdict::PermanentFailure("fetchToken: UNKNOWN_URL".into()));
    }

    #[test]
    fn test_into_result() {
        assert_eq!(MediationVerdict::Proceed.into_result(), Ok(None));
        assert_eq!(MediationVerdict::ProceedWithSecret("x".into()).into_result(), Ok(Some("x".into())));
        let err = MediationVerdict::RetryableFailure("r".into()).into_result().unwrap_err();
        assert!(err.is_retryable());
        let err = MediationVerdict::Rejected {
            reason: "r".into(),
            arc: "A".into(),
            rejection_reasons: "why".into(),
        }
        .into_result()
        .unwrap_err();
        assert!(matches!(err, MediationError::Rejected { ref arc, .. } if arc == "A"));
    }
}
