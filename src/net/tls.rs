//! TLS client configuration and trust root loading.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use rustls::client::danger::ServerCertVerifier;
use rustls::client::{VerifierBuilderError, WebPkiServerVerifier};
use rustls::crypto::ring;
use rustls::{ClientConfig, RootCertStore};

use crate::net::pinning::PinningVerifier;

/// Load trust roots from a PEM bundle.
pub fn load_root_store(path: &Path) -> Result<RootCertStore, std::io::Error> {
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("CA bundle not found: {:?}", path),
        ));
    }

    let mut reader = BufReader::new(File::open(path)?);
    let certs = rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>()?;

    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(certs);
    if added == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("no usable certificates in {:?}", path),
        ));
    }

    tracing::debug!(added, ignored, path = ?path, "Loaded trust roots");
    Ok(roots)
}

/// Build the default WebPKI verifier the pinning verifier delegates to.
pub fn default_verifier(
    roots: RootCertStore,
) -> Result<Arc<dyn ServerCertVerifier>, VerifierBuilderError> {
    let verifier = WebPkiServerVerifier::builder_with_provider(
        Arc::new(roots),
        Arc::new(ring::default_provider()),
    )
    .build()?;
    Ok(verifier)
}

/// Client TLS configuration whose every handshake goes through `verifier`.
pub fn pinned_client_config(verifier: Arc<PinningVerifier>) -> Result<ClientConfig, rustls::Error> {
    let config = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();
    Ok(config)
}
