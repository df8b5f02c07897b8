//! Request mediation.
//!
//! One pass over an outbound request: pin, honour exclusions, bind the
//! token to a header value, attach the attestation token and substitute
//! secure strings into configured headers. Callers only invoke this once
//! initialized and hold the mediation lock for the whole pass.

use std::sync::Arc;

use crate::attestation::client::Attester;
use crate::attestation::types::FetchStatus;
use crate::error::{MediationError, MediationResult};
use crate::http::request::MediatedRequest;
use crate::mediation::classify::{classify, ClassifyPolicy};
use crate::mediation::store::MediationSnapshot;
use crate::net::pinning::PinningVerifier;
use crate::observability::metrics;

/// Host never mediated.
pub const LOCALHOST: &str = "localhost";

/// What a successful pass did to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediationOutcome {
    /// Not initialized, localhost, or no host to mediate.
    Passthrough,
    /// Pinned only.
    Excluded,
    TokenAdded,
    /// Token fetch was benign or a suppressed network failure.
    ProceededWithoutToken,
}

impl MediationOutcome {
    /// Label used for metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            MediationOutcome::Passthrough => "passthrough",
            MediationOutcome::Excluded => "excluded",
            MediationOutcome::TokenAdded => "token_added",
            MediationOutcome::ProceededWithoutToken => "proceeded_without_token",
        }
    }
}

/// Run one mediation pass over `request`.
pub async fn mediate_request(
    attester: &dyn Attester,
    verifier: &Arc<PinningVerifier>,
    snapshot: &MediationSnapshot,
    request: &mut dyn MediatedRequest,
) -> MediationResult<MediationOutcome> {
    let Some(host) = request.host() else {
        tracing::debug!("Request without host, not mediated");
        return Ok(MediationOutcome::Passthrough);
    };
    if host == LOCALHOST {
        return Ok(MediationOutcome::Passthrough);
    }

    request.install_verifier(Arc::clone(verifier));

    if let Some(pattern) = snapshot.excluded_by(&request.url()) {
        tracing::debug!(host = %host, pattern, "Request excluded from mediation");
        return Ok(MediationOutcome::Excluded);
    }

    if let Some(binding) = snapshot.binding_header.as_deref() {
        if let Some(value) = request.header(binding) {
            attester.set_data_hash_in_token(&value).map_err(|e| {
                MediationError::Permanent(format!("binding header {binding}: {e}"))
            })?;
        }
    }

    let outcome = attester.fetch_token(&host).await;
    metrics::record_fetch("token", outcome.status);
    tracing::debug!(
        host = %host,
        status = %outcome.status,
        token = outcome.loggable_token.as_deref().unwrap_or(""),
        "Token fetch"
    );
    if outcome.config_changed {
        tracing::info!("Dynamic configuration update received");
        attester.fetch_config();
    }

    let context = format!("token fetch for {host}");
    let policy = ClassifyPolicy::token(snapshot.proceed_on_network_failure);
    let result = match classify(&context, &outcome, &policy).into_result()? {
        Some(token) => {
            let header = &snapshot.token_header;
            request.add_header(&header.name, &format!("{}{}", header.prefix, token))?;
            MediationOutcome::TokenAdded
        }
        None => MediationOutcome::ProceededWithoutToken,
    };

    if matches!(outcome.status, FetchStatus::Success | FetchStatus::UnprotectedUrl) {
        substitute_headers(attester, snapshot, request).await?;
    }
    Ok(result)
}

async fn substitute_headers(
    attester: &dyn Attester,
    snapshot: &MediationSnapshot,
    request: &mut dyn MediatedRequest,
) -> MediationResult<()> {
    let policy = ClassifyPolicy::secret(snapshot.proceed_on_network_failure);

    for (header, prefix) in snapshot.substitution_headers.iter() {
        let Some(value) = request.header(header) else {
            continue;
        };
        let Some(key) = value.strip_prefix(prefix.as_str()).filter(|k| !k.is_empty()) else {
            continue;
        };

        let outcome = attester.fetch_secure_string(key, None).await;
        metrics::record_fetch("header", outcome.status);
        tracing::debug!(header = %header, status = %outcome.status, "Header substitution lookup");

        let context = format!("header substitution for {header}");
        if let Some(secret) = classify(&context, &outcome, &policy).into_result()? {
            request.set_header(header, &format!("{prefix}{secret}"))?;
        }
    }
    Ok(())
}
