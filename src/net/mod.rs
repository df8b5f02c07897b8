//! Network trust subsystem.
//!
//! # Data Flow
//! ```text
//! CA bundle (PEM) or platform roots
//!     → tls.rs (RootCertStore → default WebPKI verifier)
//!     → pinning.rs (PinningVerifier wraps the default verifier,
//!                   checks attester pins per handshake)
//!     → installed on each mediated request
//!     → tls.rs pinned_client_config for the host's connector
//! ```
//!
//! # Design Decisions
//! - ring provider selected explicitly; no process-wide provider install
//! - Pinning is additive: default verification must pass first

pub mod pinning;
pub mod tls;

pub use pinning::{spki_pin, PinningVerifier};
pub use tls::{default_verifier, load_root_store, pinned_client_config};
