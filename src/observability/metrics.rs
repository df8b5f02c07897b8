//! Mediation metrics.
//!
//! # Metrics
//! - `mediation_requests_total` (counter): mediated requests by outcome
//! - `mediation_fetch_total` (counter): attester fetches by kind, status
//! - `mediation_url_rewrites_total` (counter): URL rewrites by outcome
//! - `mediation_duration_seconds` (histogram): time spent per operation,
//!   including time waiting on the serialization lock
//!
//! Without an installed recorder every call is a no-op.

use std::time::Instant;

use crate::attestation::types::FetchStatus;

/// Count one mediated request. `outcome` is a mediation outcome label or an
/// error kind.
pub fn record_mediation(outcome: &'static str, start: Instant) {
    ::metrics::counter!("mediation_requests_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("mediation_duration_seconds", "operation" => "mediate")
        .record(start.elapsed().as_secs_f64());
}

/// Count one attester fetch. `kind` names the call site.
pub fn record_fetch(kind: &'static str, status: FetchStatus) {
    ::metrics::counter!(
        "mediation_fetch_total",
        "kind" => kind,
        "status" => status.as_str()
    )
    .increment(1);
}

/// Count one URL rewrite attempt.
pub fn record_rewrite(outcome: &'static str, start: Instant) {
    ::metrics::counter!("mediation_url_rewrites_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("mediation_duration_seconds", "operation" => "rewrite_url")
        .record(start.elapsed().as_secs_f64());
}
