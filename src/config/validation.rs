//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Compile every regex the store would compile
//! - Check header names are valid HTTP header names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MediatorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use hyper::header::HeaderName;
use regex::Regex;
use thiserror::Error;

use crate::config::schema::MediatorConfig;
use crate::mediation::store::query_param_regex;

/// A single semantic problem in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid regex '{pattern}': {reason}")]
    InvalidRegex {
        field: &'static str,
        pattern: String,
        reason: String,
    },

    #[error("{field}: invalid header name '{name}'")]
    InvalidHeaderName { field: &'static str, name: String },

    #[error("token.header must not be empty")]
    EmptyTokenHeader,

    #[error("rules.substitution_headers: '{0}' is listed more than once")]
    DuplicateSubstitutionHeader(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &MediatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.token.header.is_empty() {
        errors.push(ValidationError::EmptyTokenHeader);
    } else {
        check_header_name("token.header", &config.token.header, &mut errors);
    }

    if let Some(binding) = &config.rules.binding_header {
        check_header_name("rules.binding_header", binding, &mut errors);
    }

    let mut seen = HashSet::new();
    for rule in &config.rules.substitution_headers {
        check_header_name("rules.substitution_headers", &rule.header, &mut errors);
        if !seen.insert(rule.header.to_ascii_lowercase()) {
            errors.push(ValidationError::DuplicateSubstitutionHeader(rule.header.clone()));
        }
    }

    for key in &config.rules.substitution_query_params {
        if let Err(e) = query_param_regex(key) {
            errors.push(ValidationError::InvalidRegex {
                field: "rules.substitution_query_params",
                pattern: key.clone(),
                reason: e.to_string(),
            });
        }
    }

    for pattern in &config.rules.exclusion_url_regexes {
        if let Err(e) = Regex::new(pattern) {
            errors.push(ValidationError::InvalidRegex {
                field: "rules.exclusion_url_regexes",
                pattern: pattern.clone(),
                reason: e.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_header_name(field: &'static str, name: &str, errors: &mut Vec<ValidationError>) {
    if HeaderName::from_bytes(name.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidHeaderName {
            field,
            name: name.to_string(),
        });
    }
}
