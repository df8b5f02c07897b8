//! Mediation configuration store.
//!
//! # Responsibilities
//! - Hold token header, binding header and network failure policy
//! - Hold the three rule sets: substitution headers, substitution query
//!   parameters and exclusion URL regexes
//! - Hand out point-in-time snapshots to mediation passes
//!
//! # Design Decisions
//! - One `ArcSwap` per field: writers to different fields never contend and
//!   readers never lock
//! - Rule sets are immutable maps replaced wholesale (`rcu`), so a snapshot
//!   held by an in-flight pass never changes under it
//! - Regexes compile at registration; a pattern that fails to compile is
//!   logged and dropped

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use arc_swap::{ArcSwap, ArcSwapOption};
use regex::Regex;

use crate::config::schema::{RulesConfig, TokenConfig, DEFAULT_TOKEN_HEADER};

/// Compile the pattern that locates the value of query parameter `key`.
///
/// `key` is used as a regex fragment; capture group 1 is the value.
pub fn query_param_regex(key: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"[?&]{key}=([^&;]+)"))
}

/// Header the token is placed on, with its prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    pub name: String,
    pub prefix: String,
}

impl Default for TokenHeader {
    fn default() -> Self {
        Self {
            name: DEFAULT_TOKEN_HEADER.to_string(),
            prefix: String::new(),
        }
    }
}

/// Point-in-time copy of the whole store, captured at the start of a pass.
#[derive(Debug, Clone)]
pub struct MediationSnapshot {
    pub token_header: Arc<TokenHeader>,
    pub binding_header: Option<Arc<String>>,
    pub proceed_on_network_failure: bool,
    pub substitution_headers: Arc<BTreeMap<String, String>>,
    pub substitution_query_params: Arc<BTreeMap<String, Regex>>,
    pub exclusion_patterns: Arc<BTreeMap<String, Regex>>,
}

impl MediationSnapshot {
    /// Returns the first exclusion regex matching `url`, if any.
    pub fn excluded_by(&self, url: &str) -> Option<&str> {
        self.exclusion_patterns
            .iter()
            .find(|(_, pattern)| pattern.is_match(url))
            .map(|(raw, _)| raw.as_str())
    }

    /// True when `url` matches any exclusion regex.
    pub fn is_excluded(&self, url: &str) -> bool {
        self.excluded_by(url).is_some()
    }
}

/// Process-lifetime mediation policy with per-field atomic updates.
#[derive(Debug)]
pub struct MediationStore {
    token_header: ArcSwap<TokenHeader>,
    binding_header: ArcSwapOption<String>,
    proceed_on_network_failure: AtomicBool,
    substitution_headers: ArcSwap<BTreeMap<String, String>>,
    substitution_query_params: ArcSwap<BTreeMap<String, Regex>>,
    exclusion_patterns: ArcSwap<BTreeMap<String, Regex>>,
}

impl Default for MediationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MediationStore {
    /// Create a store with the default token header and no rules.
    pub fn new() -> Self {
        Self {
            token_header: ArcSwap::from_pointee(TokenHeader::default()),
            binding_header: ArcSwapOption::empty(),
            proceed_on_network_failure: AtomicBool::new(false),
            substitution_headers: ArcSwap::from_pointee(BTreeMap::new()),
            substitution_query_params: ArcSwap::from_pointee(BTreeMap::new()),
            exclusion_patterns: ArcSwap::from_pointee(BTreeMap::new()),
        }
    }

    /// Capture every field for one mediation pass.
    pub fn snapshot(&self) -> MediationSnapshot {
        MediationSnapshot {
            token_header: self.token_header.load_full(),
            binding_header: self.binding_header.load_full(),
            proceed_on_network_failure: self.proceed_on_network_failure(),
            substitution_headers: self.substitution_headers.load_full(),
            substitution_query_params: self.substitution_query_params.load_full(),
            exclusion_patterns: self.exclusion_patterns.load_full(),
        }
    }

    /// Set the header the token is added on and the prefix placed before it.
    pub fn set_token_header(&self, header: &str, prefix: &str) {
        tracing::debug!(header, prefix, "set token header");
        self.token_header.store(Arc::new(TokenHeader {
            name: header.to_string(),
            prefix: prefix.to_string(),
        }));
    }

    pub fn token_header(&self) -> Arc<TokenHeader> {
        self.token_header.load_full()
    }

    /// Set the header whose value binds issued tokens.
    pub fn set_binding_header(&self, header: &str) {
        tracing::debug!(header, "set binding header");
        self.binding_header.store(Some(Arc::new(header.to_string())));
    }

    pub fn binding_header(&self) -> Option<Arc<String>> {
        self.binding_header.load_full()
    }

    /// Let requests proceed without a token or secrets on network failures.
    ///
    /// This may let a connection be made before any dynamic pins arrive.
    pub fn set_proceed_on_network_failure(&self) {
        tracing::debug!("set proceed on network failure");
        self.proceed_on_network_failure.store(true, Ordering::SeqCst);
    }

    pub fn proceed_on_network_failure(&self) -> bool {
        self.proceed_on_network_failure.load(Ordering::SeqCst)
    }

    /// Mark `header` for secure string substitution. `None` means no prefix.
    pub fn add_substitution_header(&self, header: &str, required_prefix: Option<&str>) {
        let prefix = required_prefix.unwrap_or_default();
        tracing::debug!(header, prefix, "add substitution header");
        self.substitution_headers.rcu(|current| {
            let mut next = BTreeMap::clone(current);
            next.insert(header.to_string(), prefix.to_string());
            next
        });
    }

    pub fn remove_substitution_header(&self, header: &str) {
        tracing::debug!(header, "remove substitution header");
        self.substitution_headers.rcu(|current| {
            let mut next = BTreeMap::clone(current);
            next.remove(header);
            next
        });
    }

    /// Substitution headers mapped to their required prefix.
    pub fn substitution_headers(&self) -> Arc<BTreeMap<String, String>> {
        self.substitution_headers.load_full()
    }

    /// Mark query parameter `key` for secure string substitution.
    pub fn add_substitution_query_param(&self, key: &str) {
        match query_param_regex(key) {
            Ok(pattern) => {
                self.substitution_query_params.rcu(|current| {
                    let mut next = BTreeMap::clone(current);
                    next.insert(key.to_string(), pattern.clone());
                    next
                });
                tracing::debug!(key, "add substitution query param");
            }
            Err(e) => {
                tracing::error!(key, error = %e, "add substitution query param failed");
            }
        }
    }

    pub fn remove_substitution_query_param(&self, key: &str) {
        tracing::debug!(key, "remove substitution query param");
        self.substitution_query_params.rcu(|current| {
            let mut next = BTreeMap::clone(current);
            next.remove(key);
            next
        });
    }

    /// Substitution query parameter keys mapped to their compiled patterns.
    pub fn substitution_query_params(&self) -> Arc<BTreeMap<String, Regex>> {
        self.substitution_query_params.load_full()
    }

    /// Exclude URLs matching `url_regex` from token and secret mediation.
    ///
    /// Excluded URLs on pinned domains are still pinned, but never refresh
    /// the pins themselves.
    pub fn add_exclusion_url_regex(&self, url_regex: &str) {
        match Regex::new(url_regex) {
            Ok(pattern) => {
                self.exclusion_patterns.rcu(|current| {
                    let mut next = BTreeMap::clone(current);
                    next.insert(url_regex.to_string(), pattern.clone());
                    next
                });
                tracing::debug!(url_regex, "add exclusion url regex");
            }
            Err(e) => {
                tracing::error!(url_regex, error = %e, "add exclusion url regex failed");
            }
        }
    }

    pub fn remove_exclusion_url_regex(&self, url_regex: &str) {
        tracing::debug!(url_regex, "remove exclusion url regex");
        self.exclusion_patterns.rcu(|current| {
            let mut next = BTreeMap::clone(current);
            next.remove(url_regex);
            next
        });
    }

    /// Exclusion regexes mapped to their compiled patterns.
    pub fn exclusion_url_regexes(&self) -> Arc<BTreeMap<String, Regex>> {
        self.exclusion_patterns.load_full()
    }

    /// Replace token settings and every rule set from file configuration.
    ///
    /// Each field is swapped on its own; the network failure flag follows the
    /// file in both directions.
    pub fn apply_rules(&self, token: &TokenConfig, rules: &RulesConfig) {
        self.set_token_header(&token.header, &token.prefix);

        match &rules.binding_header {
            Some(header) => self.set_binding_header(header),
            None => self.binding_header.store(None),
        }
        self.proceed_on_network_failure
            .store(rules.proceed_on_network_failure, Ordering::SeqCst);

        let headers: BTreeMap<String, String> = rules
            .substitution_headers
            .iter()
            .map(|rule| (rule.header.clone(), rule.prefix.clone().unwrap_or_default()))
            .collect();
        self.substitution_headers.store(Arc::new(headers));

        let mut params = BTreeMap::new();
        for key in &rules.substitution_query_params {
            match query_param_regex(key) {
                Ok(pattern) => {
                    params.insert(key.clone(), pattern);
                }
                Err(e) => tracing::error!(key, error = %e, "dropping substitution query param"),
            }
        }
        self.substitution_query_params.store(Arc::new(params));

        let mut exclusions = BTreeMap::new();
        for raw in &rules.exclusion_url_regexes {
            match Regex::new(raw) {
                Ok(pattern) => {
                    exclusions.insert(raw.clone(), pattern);
                }
                Err(e) => tracing::error!(url_regex = %raw, error = %e, "dropping exclusion url regex"),
            }
        }
        self.exclusion_patterns.store(Arc::new(exclusions));

        tracing::info!(
            substitution_headers = rules.substitution_headers.len(),
            substitution_query_params = rules.substitution_query_params.len(),
            exclusion_url_regexes = rules.exclusion_url_regexes.len(),
            "Mediation rules applied"
        );
    }
}
