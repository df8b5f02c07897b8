//! Transport hook: the two entry points a host transport calls.
//!
//! A host calls [`TransportHook::rewrite_url`] before opening a connection
//! and [`TransportHook::mediate`] once the request exists, immediately before
//! the connection is established.

use async_trait::async_trait;
use url::Url;

use crate::error::MediationResult;
use crate::http::request::MediatedRequest;

/// Entry points of the mediation pipeline for host transports.
#[async_trait]
pub trait TransportHook: Send + Sync {
    /// Substitute secure strings into query parameters of `url`.
    async fn rewrite_url(&self, url: &Url) -> MediationResult<Url>;

    /// Pin, attach the attestation token and substitute header secrets.
    async fn mediate(&self, request: &mut dyn MediatedRequest) -> MediationResult<()>;
}
