//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use async_trait::async_trait;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};

use attestation_mediator::{AttestationService, Attester, AttesterError, FetchOutcome, FetchStatus};

/// Scripted attester. Every async call logs `enter:<call>` and
/// `exit:<call>` around an optional delay, so tests can check ordering.
pub struct ScriptedAttester {
    pub events: Mutex<Vec<String>>,
    pub token: Mutex<FetchOutcome>,
    pub secrets: Mutex<HashMap<String, FetchOutcome>>,
    pub delay: Duration,
}

impl Default for ScriptedAttester {
    fn default() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            token: Mutex::new(FetchOutcome::token("TOKEN")),
            secrets: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
        }
    }
}

impl ScriptedAttester {
    pub fn with_token(self, outcome: FetchOutcome) -> Self {
        *self.token.lock().unwrap() = outcome;
        self
    }

    pub fn with_secret(self, key: &str, outcome: FetchOutcome) -> Self {
        self.secrets.lock().unwrap().insert(key.to_string(), outcome);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn log(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    async fn around<T>(&self, call: String, result: T) -> T {
        self.log(format!("enter:{call}"));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.log(format!("exit:{call}"));
        result
    }
}

#[async_trait]
impl Attester for ScriptedAttester {
    fn initialize(&self, config: &str, _mode: &str) -> Result<(), AttesterError> {
        self.log(format!("initialize:{config}"));
        Ok(())
    }

    fn set_user_property(&self, _property: &str) {}

    fn set_data_hash_in_token(&self, data: &str) -> Result<(), AttesterError> {
        self.log(format!("set_data_hash_in_token:{data}"));
        Ok(())
    }

    fn fetch_config(&self) {
        self.log("fetch_config".to_string());
    }

    fn device_id(&self) -> Result<String, AttesterError> {
        Err(AttesterError::InvalidState("not initialized".to_string()))
    }

    fn message_signature(&self, _message: &str) -> Result<Option<String>, AttesterError> {
        Ok(None)
    }

    fn set_dev_key(&self, key: &str) -> Result<(), AttesterError> {
        self.log(format!("set_dev_key:{key}"));
        Ok(())
    }

    fn pins(&self, _pin_type: &str) -> HashMap<String, Vec<String>> {
        HashMap::new()
    }

    async fn fetch_token(&self, host: &str) -> FetchOutcome {
        let outcome = self.token.lock().unwrap().clone();
        self.around(format!("fetch_token:{host}"), outcome).await
    }

    async fn fetch_secure_string(&self, key: &str, new_definition: Option<&str>) -> FetchOutcome {
        let outcome = match new_definition {
            Some(value) => FetchOutcome::secret(value),
            None => self
                .secrets
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .unwrap_or_else(|| FetchOutcome::new(FetchStatus::UnknownKey)),
        };
        self.around(format!("fetch_secure_string:{key}"), outcome).await
    }

    async fn fetch_custom_jwt(&self, _payload: &str) -> FetchOutcome {
        self.around("fetch_custom_jwt".to_string(), FetchOutcome::token("JWT")).await
    }
}

/// Platform verifier stand-in accepting every chain.
#[derive(Debug)]
pub struct AcceptAll;

impl ServerCertVerifier for AcceptAll {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![SignatureScheme::ECDSA_NISTP256_SHA256]
    }
}

/// Initialized service over `attester`.
pub fn ready_service(attester: Arc<ScriptedAttester>) -> Arc<AttestationService> {
    let service = AttestationService::new(attester, Arc::new(AcceptAll));
    service.initialize("test-config").unwrap();
    Arc::new(service)
}
