//! Attestation SDK contract.
//!
//! # Responsibilities
//! - Fetch attestation tokens, secure strings and custom JWTs
//! - Expose the current pin set for the pinning verifier
//! - Provide device identity and message signing
//!
//! The fetch operations may wait on the network for as long as the SDK's own
//! timeout policy allows. Nothing in this crate cancels them.

use std::collections::HashMap;
use async_trait::async_trait;

use crate::attestation::types::{AttesterError, FetchOutcome};

/// Pin type requested by the pinning verifier.
pub const PIN_TYPE_PUBLIC_KEY_SHA256: &str = "public-key-sha256";

/// The attestation service as seen by the mediator.
#[async_trait]
pub trait Attester: Send + Sync {
    /// Initializes the SDK with its configuration string.
    fn initialize(&self, config: &str, mode: &str) -> Result<(), AttesterError>;

    /// Tags the device/user for analytics on the service side.
    fn set_user_property(&self, property: &str);

    /// Binds subsequently fetched tokens to the hash of `data`.
    fn set_data_hash_in_token(&self, data: &str) -> Result<(), AttesterError>;

    /// Clears a pending dynamic configuration update.
    fn fetch_config(&self);

    /// Device identifier used by the service for this app install.
    fn device_id(&self) -> Result<String, AttesterError>;

    /// Signs `message` with the account message signing key, if one is available.
    fn message_signature(&self, message: &str) -> Result<Option<String>, AttesterError>;

    /// Marks the app as a development build.
    fn set_dev_key(&self, key: &str) -> Result<(), AttesterError>;

    /// Current pins keyed by host, each a base64 encoded hash of `pin_type`.
    /// The `*` host holds pins applied to hosts without their own entry.
    fn pins(&self, pin_type: &str) -> HashMap<String, Vec<String>>;

    /// Fetches an attestation token for `host`.
    async fn fetch_token(&self, host: &str) -> FetchOutcome;

    /// Looks up, or with `new_definition` defines, the secure string `key`.
    async fn fetch_secure_string(&self, key: &str, new_definition: Option<&str>) -> FetchOutcome;

    /// Fetches a custom JWT carrying the given JSON claims.
    async fn fetch_custom_jwt(&self, payload: &str) -> FetchOutcome;
}
