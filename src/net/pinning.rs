//! Pinning certificate verifier.
//!
//! # Responsibilities
//! - Run the platform default verification first
//! - Then require a certificate in the chain whose public key hash is in the
//!   attestation service's current pin set for the host
//!
//! # Design Decisions
//! - Pins are read from the attester on every handshake, so dynamic pin
//!   updates apply to the next connection without rebuilding the verifier
//! - A host without pins (and no `*` entry) is only default verified
//! - The verifier is built once at initialization and shared via `Arc`

use std::fmt;
use std::sync::Arc;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::server::ParsedCertificate;
use rustls::{CertificateError, DigitallySignedStruct, Error as TlsError, SignatureScheme};
use sha2::{Digest, Sha256};

use crate::attestation::client::{Attester, PIN_TYPE_PUBLIC_KEY_SHA256};

/// Pin set entry applied to hosts without their own pins.
pub const WILDCARD_PIN_HOST: &str = "*";

/// Base64 encoded SHA-256 of a DER SubjectPublicKeyInfo.
pub fn spki_pin(spki_der: &[u8]) -> String {
    BASE64.encode(Sha256::digest(spki_der))
}

/// Verifier that pins connections against the attestation service's pin set.
pub struct PinningVerifier {
    inner: Arc<dyn ServerCertVerifier>,
    attester: Arc<dyn Attester>,
}

impl fmt::Debug for PinningVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinningVerifier")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl PinningVerifier {
    /// Wrap the platform default verifier `inner`.
    pub fn new(inner: Arc<dyn ServerCertVerifier>, attester: Arc<dyn Attester>) -> Self {
        Self { inner, attester }
    }

    /// Check the chain against the pins for `host`.
    pub fn check_pins(&self, host: &str, chain: &[&CertificateDer<'_>]) -> Result<(), TlsError> {
        let all_pins = self.attester.pins(PIN_TYPE_PUBLIC_KEY_SHA256);
        let pins = match all_pins.get(host).or_else(|| all_pins.get(WILDCARD_PIN_HOST)) {
            Some(pins) if !pins.is_empty() => pins,
            _ => return Ok(()),
        };

        for cert in chain {
            let Ok(parsed) = ParsedCertificate::try_from(*cert) else {
                continue;
            };
            let pin = spki_pin(parsed.subject_public_key_info().as_ref());
            if pins.iter().any(|p| *p == pin) {
                return Ok(());
            }
        }

        tracing::warn!(host, "pinning rejected connection, no matching public key");
        Err(TlsError::InvalidCertificate(
            CertificateError::ApplicationVerificationFailure,
        ))
    }
}

impl ServerCertVerifier for PinningVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        let verified = self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        )?;

        let host = match server_name {
            ServerName::DnsName(dns) => dns.as_ref(),
            _ => "",
        };
        let chain: Vec<&CertificateDer<'_>> =
            std::iter::once(end_entity).chain(intermediates.iter()).collect();
        self.check_pins(host, &chain)?;

        Ok(verified)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}
