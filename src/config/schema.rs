//! Configuration schema definitions.
//!
//! All sections default so that an empty file is a valid configuration that
//! mediates nothing beyond the token header.

use serde::{Deserialize, Serialize};

/// Header carrying the attestation token unless configured otherwise.
pub const DEFAULT_TOKEN_HEADER: &str = "Approov-Token";

/// Root configuration for the mediator.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct MediatorConfig {
    /// SDK initialization settings (applied once).
    pub attestation: AttestationConfig,

    /// Where and how the token is attached.
    pub token: TokenConfig,

    /// Exclusion, binding and substitution rules (hot reloadable).
    pub rules: RulesConfig,

    /// Log level and format.
    pub logging: LoggingConfig,
}

/// Attestation SDK initialization settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AttestationConfig {
    /// Opaque SDK configuration string. Empty when the SDK is initialized elsewhere.
    pub config: String,

    /// Development key marking this build as a development version.
    pub dev_key: Option<String>,
}

/// Token header configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TokenConfig {
    /// Header name the token is added on.
    pub header: String,

    /// Prefix placed before the token, e.g. "Bearer ".
    pub prefix: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            header: DEFAULT_TOKEN_HEADER.to_string(),
            prefix: String::new(),
        }
    }
}

/// Mediation rules.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    /// Header whose value is hashed into the token, if present on a request.
    pub binding_header: Option<String>,

    /// Let requests proceed without token or secrets on network failures.
    pub proceed_on_network_failure: bool,

    /// Headers whose values are replaced with secure strings.
    pub substitution_headers: Vec<SubstitutionHeaderConfig>,

    /// Query parameter keys whose values are replaced with secure strings.
    pub substitution_query_params: Vec<String>,

    /// URL regexes excluded from token and secret mediation.
    pub exclusion_url_regexes: Vec<String>,
}

/// A header substitution rule.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SubstitutionHeaderConfig {
    /// Header name.
    pub header: String,

    /// Required prefix before the secure string key (e.g. "Bearer ").
    #[serde(default)]
    pub prefix: Option<String>,
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,

    /// Pretty for development, JSON for production.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
