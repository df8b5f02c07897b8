//! Initialization state machine.
//!
//! ```text
//! Uninitialized ──initialize(config)──▶ Ready(fingerprint)
//! Ready ──initialize(same config)──▶ Ready        (no-op)
//! Ready ──initialize(other config)──▶ error, stays Ready
//! ```
//!
//! There is no transition out of `Ready`. An empty config reaches `Ready`
//! without initializing the attester, so a host may initialize it itself.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use rustls::client::danger::ServerCertVerifier;
use sha2::{Digest, Sha256};

use crate::attestation::client::Attester;
use crate::error::{MediationError, MediationResult};
use crate::net::pinning::PinningVerifier;

/// Mode string the attester is initialized with.
pub const INIT_MODE: &str = "auto";

/// User property identifying this integration to the attestation service.
pub const USER_PROPERTY: &str = "attestation-mediator";

/// Stable fingerprint of an initialization config.
pub fn config_fingerprint(config: &str) -> String {
    hex::encode(Sha256::digest(config.as_bytes()))
}

/// Current lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    Uninitialized,
    Ready,
}

/// Everything that exists only once initialized.
#[derive(Debug)]
pub struct Ready {
    pub fingerprint: String,
    pub verifier: Arc<PinningVerifier>,
}

/// Guards the single `Uninitialized → Ready` transition.
#[derive(Debug, Default)]
pub struct Initializer {
    ready: OnceLock<Ready>,
    transition: Mutex<()>,
}

impl Initializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InitState {
        if self.ready.get().is_some() {
            InitState::Ready
        } else {
            InitState::Uninitialized
        }
    }

    /// Ready state, once initialized. Never blocks.
    pub fn ready(&self) -> Option<&Ready> {
        self.ready.get()
    }

    /// Perform or confirm initialization with `config`.
    pub fn initialize(
        &self,
        config: &str,
        attester: &Arc<dyn Attester>,
        default_verifier: &Arc<dyn ServerCertVerifier>,
    ) -> MediationResult<()> {
        let _guard = self.transition.lock().unwrap_or_else(PoisonError::into_inner);
        let fingerprint = config_fingerprint(config);

        if let Some(ready) = self.ready.get() {
            if ready.fingerprint != fingerprint {
                tracing::warn!("Rejected reinitialization with a different config");
                return Err(MediationError::Configuration(
                    "attempt to reinitialize with a different config".to_string(),
                ));
            }
            tracing::debug!("Already initialized with the same config");
            return Ok(());
        }

        if !config.is_empty() {
            attester.initialize(config, INIT_MODE).map_err(|e| {
                tracing::error!(error = %e, "Attester initialization failed");
                MediationError::Permanent(format!("initialization failed: {e}"))
            })?;
        }
        attester.set_user_property(USER_PROPERTY);

        let verifier = Arc::new(PinningVerifier::new(
            Arc::clone(default_verifier),
            Arc::clone(attester),
        ));
        // Only this guarded path sets the cell, so it is still empty here.
        let _ = self.ready.set(Ready { fingerprint, verifier });

        tracing::info!(attester_initialized = !config.is_empty(), "Attestation mediation ready");
        Ok(())
    }
}
