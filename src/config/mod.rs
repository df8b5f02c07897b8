//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MediatorConfig (validated)
//!     → AttestationService::initialize (attestation section, once)
//!     → AttestationService::apply_config (token + rules sections)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → channel → apply_config swaps each rule set atomically
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The attestation section is never re-applied on reload

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AttestationConfig, LogFormat, LoggingConfig, MediatorConfig, RulesConfig,
    SubstitutionHeaderConfig, TokenConfig, DEFAULT_TOKEN_HEADER,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
