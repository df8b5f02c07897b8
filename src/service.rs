//! Attestation service facade.
//!
//! # Responsibilities
//! - Own the attester, mediation store and initialization state
//! - Serialize mediation passes and URL rewrites
//! - Implement [`TransportHook`] for host transports
//! - Expose the attester's explicit operations with classified results
//!
//! # Design Decisions
//! - One `tokio::sync::Mutex` per algorithm, held across attester awaits so
//!   two passes never interleave attester calls
//! - Store mutations never take those locks; a pass works on a snapshot
//! - One service per attester; hosts share it as `Arc<AttestationService>`

use std::sync::Arc;
use std::time::Instant;
use async_trait::async_trait;
use rustls::client::danger::ServerCertVerifier;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use url::Url;

use crate::attestation::client::Attester;
use crate::attestation::types::FetchStatus;
use crate::config::schema::MediatorConfig;
use crate::error::{MediationError, MediationResult};
use crate::http::hook::TransportHook;
use crate::http::request::MediatedRequest;
use crate::mediation::classify::{classify, ClassifyPolicy, Expected};
use crate::mediation::init::{config_fingerprint, InitState, Initializer};
use crate::mediation::mediator::{mediate_request, MediationOutcome};
use crate::mediation::query::{substitute_query_params, Rewrite};
use crate::mediation::store::MediationStore;
use crate::observability::metrics;

/// Placeholder host fetched by [`AttestationService::prefetch`].
pub const PREFETCH_HOST: &str = "approov.io";

/// Secure string key fetched by [`AttestationService::precheck`].
pub const PRECHECK_KEY: &str = "precheck-dummy-key";

pub struct AttestationService {
    attester: Arc<dyn Attester>,
    default_verifier: Arc<dyn ServerCertVerifier>,
    store: MediationStore,
    init: Initializer,
    mediation_lock: Mutex<()>,
    rewrite_lock: Mutex<()>,
}

impl std::fmt::Debug for AttestationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttestationService")
            .field("state", &self.state())
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl AttestationService {
    /// Create an uninitialized service. `default_verifier` is the platform
    /// verifier pinning is layered on.
    pub fn new(attester: Arc<dyn Attester>, default_verifier: Arc<dyn ServerCertVerifier>) -> Self {
        Self {
            attester,
            default_verifier,
            store: MediationStore::new(),
            init: Initializer::new(),
            mediation_lock: Mutex::new(()),
            rewrite_lock: Mutex::new(()),
        }
    }

    /// Runtime configuration surface.
    pub fn store(&self) -> &MediationStore {
        &self.store
    }

    pub fn state(&self) -> InitState {
        self.init.state()
    }

    /// Initialize the attester with `config`. Repeating the same config is a
    /// no-op; a different config is a configuration error.
    pub fn initialize(&self, config: &str) -> MediationResult<()> {
        self.init
            .initialize(config, &self.attester, &self.default_verifier)
    }

    /// Initialize from a file config: attestation section, development key,
    /// then token and rule sections.
    pub fn initialize_from(&self, config: &MediatorConfig) -> MediationResult<()> {
        self.initialize(&config.attestation.config)?;
        if let Some(key) = config.attestation.dev_key.as_deref() {
            self.set_dev_key(key)?;
        }
        self.apply_config(config);
        Ok(())
    }

    /// Apply the token and rule sections of `config`.
    ///
    /// The attestation section cannot change after initialization; a
    /// differing one is reported and ignored.
    pub fn apply_config(&self, config: &MediatorConfig) {
        if let Some(ready) = self.init.ready() {
            if ready.fingerprint != config_fingerprint(&config.attestation.config) {
                tracing::warn!("Attestation config changed; restart required to apply it");
            }
        }
        self.store.apply_rules(&config.token, &config.rules);
    }

    /// Apply every config received on `updates` until the sender closes.
    pub fn watch_config(
        self: &Arc<Self>,
        mut updates: mpsc::UnboundedReceiver<MediatorConfig>,
    ) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(config) = updates.recv().await {
                service.apply_config(&config);
            }
            tracing::debug!("Config update channel closed");
        })
    }

    /// Substitute secure strings into the query parameters of `url`.
    pub async fn rewrite_url(&self, url: &Url) -> MediationResult<Url> {
        let start = Instant::now();
        let _guard = self.rewrite_lock.lock().await;

        if self.init.ready().is_none() {
            metrics::record_rewrite("passthrough", start);
            return Ok(url.clone());
        }

        let snapshot = self.store.snapshot();
        match substitute_query_params(self.attester.as_ref(), &snapshot, url).await {
            Ok(rewrite) => {
                metrics::record_rewrite(rewrite.as_str(), start);
                match rewrite {
                    Rewrite::Substituted(rewritten) => Ok(rewritten),
                    Rewrite::Unchanged | Rewrite::Excluded => Ok(url.clone()),
                }
            }
            Err(e) => {
                metrics::record_rewrite(e.kind(), start);
                tracing::warn!(error = %e, "URL rewrite failed");
                Err(e)
            }
        }
    }

    /// Mediate `request` immediately before its connection is opened.
    pub async fn mediate(&self, request: &mut dyn MediatedRequest) -> MediationResult<()> {
        let start = Instant::now();
        let _guard = self.mediation_lock.lock().await;

        let Some(ready) = self.init.ready() else {
            metrics::record_mediation(MediationOutcome::Passthrough.as_str(), start);
            return Ok(());
        };

        let snapshot = self.store.snapshot();
        match mediate_request(self.attester.as_ref(), &ready.verifier, &snapshot, request).await {
            Ok(outcome) => {
                metrics::record_mediation(outcome.as_str(), start);
                Ok(())
            }
            Err(e) => {
                metrics::record_mediation(e.kind(), start);
                tracing::warn!(error = %e, "Mediation failed");
                Err(e)
            }
        }
    }

    /// Fetch a token for a placeholder host in the background so later
    /// fetches are fast. Must be called within a Tokio runtime.
    pub fn prefetch(&self) -> JoinHandle<()> {
        let attester = Arc::clone(&self.attester);
        tokio::spawn(async move {
            let outcome = attester.fetch_token(PREFETCH_HOST).await;
            metrics::record_fetch("prefetch", outcome.status);
            // The placeholder host is never protected.
            let status = match outcome.status {
                FetchStatus::UnknownUrl => FetchStatus::Success,
                status => status,
            };
            tracing::info!(status = %status, "Prefetch complete");
        })
    }

    /// Check the device passes attestation by fetching a dummy secure string.
    pub async fn precheck(&self) -> MediationResult<()> {
        let outcome = self.attester.fetch_secure_string(PRECHECK_KEY, None).await;
        metrics::record_fetch("precheck", outcome.status);
        if outcome.status == FetchStatus::Success {
            return Ok(());
        }
        classify("precheck", &outcome, &ClassifyPolicy::secret(false))
            .into_result()
            .map(|_| ())
    }

    /// Explicit token fetch for `url` (a full URL or a bare host).
    pub async fn fetch_token(&self, url: &str) -> MediationResult<String> {
        let host = Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_string))
            .unwrap_or_else(|| url.to_string());

        let outcome = self.attester.fetch_token(&host).await;
        metrics::record_fetch("explicit_token", outcome.status);
        let context = format!("fetch token for {host}");
        let verdict = classify(&context, &outcome, &ClassifyPolicy::strict(Expected::Token));
        require_value(verdict.into_result(), &context)
    }

    /// Look up secure string `key`, or define it when `new_definition` is
    /// given. An unknown key is `Ok(None)`.
    pub async fn fetch_secure_string(
        &self,
        key: &str,
        new_definition: Option<&str>,
    ) -> MediationResult<Option<String>> {
        let outcome = self.attester.fetch_secure_string(key, new_definition).await;
        metrics::record_fetch("explicit_secret", outcome.status);
        let kind = if new_definition.is_some() { "definition" } else { "lookup" };
        let context = format!("fetch secure string {kind} for {key}");
        classify(&context, &outcome, &ClassifyPolicy::secret(false)).into_result()
    }

    /// Fetch a custom JWT carrying the JSON `payload`.
    pub async fn fetch_custom_jwt(&self, payload: &str) -> MediationResult<String> {
        serde_json::from_str::<serde_json::Value>(payload)
            .map_err(|e| MediationError::Permanent(format!("custom JWT payload is not valid JSON: {e}")))?;

        let outcome = self.attester.fetch_custom_jwt(payload).await;
        metrics::record_fetch("custom_jwt", outcome.status);
        let context = "fetch custom JWT";
        let verdict = classify(context, &outcome, &ClassifyPolicy::strict(Expected::Token));
        require_value(verdict.into_result(), context)
    }

    pub fn device_id(&self) -> MediationResult<String> {
        self.attester
            .device_id()
            .map_err(|e| MediationError::Permanent(format!("device ID: {e}")))
    }

    /// Bind the next token to a hash of `data`.
    pub fn set_data_hash_in_token(&self, data: &str) -> MediationResult<()> {
        self.attester
            .set_data_hash_in_token(data)
            .map_err(|e| MediationError::Permanent(format!("set data hash: {e}")))
    }

    /// Signature of `message` with the attester's message signing key.
    pub fn message_signature(&self, message: &str) -> MediationResult<String> {
        match self.attester.message_signature(message) {
            Ok(Some(signature)) => Ok(signature),
            Ok(None) => Err(MediationError::Permanent("no signature available".to_string())),
            Err(e) => Err(MediationError::Permanent(format!("message signature: {e}"))),
        }
    }

    pub fn set_dev_key(&self, key: &str) -> MediationResult<()> {
        self.attester
            .set_dev_key(key)
            .map_err(|e| MediationError::Permanent(format!("set dev key: {e}")))
    }
}

// Strict policies have no benign statuses, so `Ok(None)` is unreachable.
fn require_value(result: MediationResult<Option<String>>, context: &str) -> MediationResult<String> {
    result?.ok_or_else(|| MediationError::Permanent(format!("{context}: no value")))
}

#[async_trait]
impl TransportHook for AttestationService {
    async fn rewrite_url(&self, url: &Url) -> MediationResult<Url> {
        AttestationService::rewrite_url(self, url).await
    }

    async fn mediate(&self, request: &mut dyn MediatedRequest) -> MediationResult<()> {
        AttestationService::mediate(self, request).await
    }
}
