//! Request abstraction the mediator operates on.
//!
//! # Responsibilities
//! - Expose URL, host and headers of an outbound request
//! - Let the mediator set/add header values
//! - Carry the pinning verifier to the connector that opens the connection
//!
//! # Design Decisions
//! - Header lookups are case-insensitive (HeaderMap semantics)
//! - Host comes from the URI, falling back to the Host header; an
//!   origin-form request is addressed as `https://{Host}{path}`
//! - Invalid header names or values are permanent errors, never panics

use std::sync::Arc;
use hyper::header::{HeaderName, HeaderValue};
use hyper::http::uri::Authority;
use hyper::Request;

use crate::error::{MediationError, MediationResult};
use crate::net::pinning::PinningVerifier;

/// A mutable outbound request as seen by the mediator.
pub trait MediatedRequest: Send {
    /// Full target URL.
    fn url(&self) -> String;

    /// Target host, without port.
    fn host(&self) -> Option<String>;

    /// Current value of header `name`.
    fn header(&self, name: &str) -> Option<String>;

    /// Replace any value of header `name`.
    fn set_header(&mut self, name: &str, value: &str) -> MediationResult<()>;

    /// Add a value for header `name`, keeping existing ones.
    fn add_header(&mut self, name: &str, value: &str) -> MediationResult<()>;

    /// Install the verifier the connection must be established with.
    fn install_verifier(&mut self, verifier: Arc<PinningVerifier>);
}

/// Request extension holding the installed pinning verifier.
#[derive(Debug, Clone)]
pub struct InstalledVerifier(pub Arc<PinningVerifier>);

/// Verifier installed on `request` by mediation, if any.
pub fn installed_verifier<B>(request: &Request<B>) -> Option<Arc<PinningVerifier>> {
    request
        .extensions()
        .get::<InstalledVerifier>()
        .map(|installed| Arc::clone(&installed.0))
}

/// Authority the request targets: the URI's, else the Host header's.
fn target_authority<B>(request: &Request<B>) -> Option<Authority> {
    request.uri().authority().cloned().or_else(|| {
        request
            .headers()
            .get(hyper::header::HOST)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.parse::<Authority>().ok())
    })
}

fn header_pair(name: &str, value: &str) -> MediationResult<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| MediationError::Permanent(format!("invalid header name {name}: {e}")))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|e| MediationError::Permanent(format!("invalid value for header {name}: {e}")))?;
    Ok((header_name, header_value))
}

impl<B: Send> MediatedRequest for Request<B> {
    fn url(&self) -> String {
        let uri = self.uri();
        if uri.scheme().is_some() {
            return uri.to_string();
        }
        match target_authority(self) {
            Some(authority) => {
                let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
                format!("https://{authority}{path}")
            }
            None => uri.to_string(),
        }
    }

    fn host(&self) -> Option<String> {
        target_authority(self).map(|authority| authority.host().to_string())
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn set_header(&mut self, name: &str, value: &str) -> MediationResult<()> {
        let (name, value) = header_pair(name, value)?;
        self.headers_mut().insert(name, value);
        Ok(())
    }

    fn add_header(&mut self, name: &str, value: &str) -> MediationResult<()> {
        let (name, value) = header_pair(name, value)?;
        self.headers_mut().append(name, value);
        Ok(())
    }

    fn install_verifier(&mut self, verifier: Arc<PinningVerifier>) {
        self.extensions_mut().insert(InstalledVerifier(verifier));
    }
}
