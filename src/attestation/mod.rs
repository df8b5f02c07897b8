//! Attestation collaborator subsystem.
//!
//! # Data Flow
//! ```text
//! Mediator / query engine / service operations
//!     → client.rs (Attester trait, implemented by the host's SDK binding)
//!     → types.rs (FetchOutcome returned, immutable)
//!     → mediation::classify (verdict)
//! ```
//!
//! # Security Constraints
//! - Tokens and secrets are never logged; only `loggable_token` is
//! - Secure strings are never cached by this crate

pub mod client;
pub mod types;

pub use client::{Attester, PIN_TYPE_PUBLIC_KEY_SHA256};
pub use types::{AttesterError, FetchOutcome, FetchStatus};

#[cfg(test)]
pub(crate) mod mock;
