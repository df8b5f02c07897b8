//! Query parameter substitution.
//!
//! For each registered key whose pattern matches the URL, the captured
//! value is looked up as a secure string key and, on success, replaced in
//! place. Rules run in key order against the progressively rewritten URL.
//!
//! Callers only invoke this once initialized; before that URLs pass through.

use url::Url;

use crate::attestation::client::Attester;
use crate::error::{MediationError, MediationResult};
use crate::mediation::classify::{classify, ClassifyPolicy};
use crate::mediation::store::MediationSnapshot;
use crate::observability::metrics;

/// Result of one rewrite pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// Not https, or no rule produced a substitution.
    Unchanged,
    /// URL matched an exclusion regex.
    Excluded,
    Substituted(Url),
}

impl Rewrite {
    /// Label used for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Rewrite::Unchanged => "unchanged",
            Rewrite::Excluded => "excluded",
            Rewrite::Substituted(_) => "substituted",
        }
    }
}

/// Apply every substitution rule of `snapshot` to `url`.
pub async fn substitute_query_params(
    attester: &dyn Attester,
    snapshot: &MediationSnapshot,
    url: &Url,
) -> MediationResult<Rewrite> {
    if url.scheme() != "https" {
        return Ok(Rewrite::Unchanged);
    }
    if let Some(pattern) = snapshot.excluded_by(url.as_str()) {
        tracing::debug!(host = url.host_str().unwrap_or(""), pattern, "URL excluded from substitution");
        return Ok(Rewrite::Excluded);
    }

    let policy = ClassifyPolicy::secret(snapshot.proceed_on_network_failure);
    let mut current = url.as_str().to_string();
    let mut substituted = false;

    for (key, pattern) in snapshot.substitution_query_params.iter() {
        let Some(range) = pattern
            .captures(&current)
            .and_then(|caps| caps.get(1))
            .map(|m| m.range())
        else {
            continue;
        };

        let lookup = current[range.clone()].to_string();
        let outcome = attester.fetch_secure_string(&lookup, None).await;
        metrics::record_fetch("query_param", outcome.status);
        tracing::debug!(key = %key, status = %outcome.status, "Query parameter lookup");

        let context = format!("query parameter substitution for {key}");
        if let Some(secret) = classify(&context, &outcome, &policy).into_result()? {
            current.replace_range(range, &secret);
            substituted = true;
        }
    }

    if !substituted {
        return Ok(Rewrite::Unchanged);
    }
    let rewritten = Url::parse(&current).map_err(|e| {
        MediationError::Permanent(format!("query parameter substitution produced an invalid URL: {e}"))
    })?;
    Ok(Rewrite::Substituted(rewritten))
}
