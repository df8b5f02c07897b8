//! Scripted attester for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use async_trait::async_trait;

use crate::attestation::client::Attester;
use crate::attestation::types::{AttesterError, FetchOutcome, FetchStatus};

/// Records every call and answers from scripted outcomes.
pub(crate) struct MockAttester {
    pub calls: Mutex<Vec<String>>,
    pub token: Mutex<FetchOutcome>,
    pub secrets: Mutex<HashMap<String, FetchOutcome>>,
    pub pins: Mutex<HashMap<String, Vec<String>>>,
    pub init_error: Mutex<Option<AttesterError>>,
}

impl Default for MockAttester {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            token: Mutex::new(FetchOutcome::token("TOKEN")),
            secrets: Mutex::new(HashMap::new()),
            pins: Mutex::new(HashMap::new()),
            init_error: Mutex::new(None),
        }
    }
}

impl MockAttester {
    pub fn with_token(self, outcome: FetchOutcome) -> Self {
        *self.token.lock().unwrap() = outcome;
        self
    }

    pub fn with_secret(self, key: &str, outcome: FetchOutcome) -> Self {
        self.secrets.lock().unwrap().insert(key.to_string(), outcome);
        self
    }

    pub fn with_pins(self, host: &str, pins: &[&str]) -> Self {
        self.pins
            .lock()
            .unwrap()
            .insert(host.to_string(), pins.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Attester for MockAttester {
    fn initialize(&self, config: &str, mode: &str) -> Result<(), AttesterError> {
        self.record(format!("initialize:{config}:{mode}"));
        match self.init_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn set_user_property(&self, property: &str) {
        self.record(format!("set_user_property:{property}"));
    }

    fn set_data_hash_in_token(&self, data: &str) -> Result<(), AttesterError> {
        self.record(format!("set_data_hash_in_token:{data}"));
        Ok(())
    }

    fn fetch_config(&self) {
        self.record("fetch_config".to_string());
    }

    fn device_id(&self) -> Result<String, AttesterError> {
        Ok("device-1".to_string())
    }

    fn message_signature(&self, _message: &str) -> Result<Option<String>, AttesterError> {
        Ok(Some("c2lnbmF0dXJl".to_string()))
    }

    fn set_dev_key(&self, key: &str) -> Result<(), AttesterError> {
        self.record(format!("set_dev_key:{key}"));
        Ok(())
    }

    fn pins(&self, _pin_type: &str) -> HashMap<String, Vec<String>> {
        self.pins.lock().unwrap().clone()
    }

    async fn fetch_token(&self, host: &str) -> FetchOutcome {
        self.record(format!("fetch_token:{host}"));
        self.token.lock().unwrap().clone()
    }

    async fn fetch_secure_string(&self, key: &str, new_definition: Option<&str>) -> FetchOutcome {
        self.record(format!("fetch_secure_string:{key}"));
        if let Some(value) = new_definition {
            return FetchOutcome::secret(value);
        }
        self.secrets
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_else(|| FetchOutcome::new(FetchStatus::UnknownKey))
    }

    async fn fetch_custom_jwt(&self, payload: &str) -> FetchOutcome {
        self.record(format!("fetch_custom_jwt:{payload}"));
        FetchOutcome::token("JWT")
    }
}
