//! Attestation mediation for outbound HTTPS requests.
//!
//! Attaches attestation tokens, pins connections and substitutes secure
//! strings into headers and query parameters on behalf of a host transport.

pub mod attestation;
pub mod config;
pub mod error;
pub mod http;
pub mod mediation;
pub mod net;
pub mod observability;
pub mod service;

pub use attestation::{Attester, AttesterError, FetchOutcome, FetchStatus};
pub use config::schema::MediatorConfig;
pub use error::{MediationError, MediationResult};
pub use http::{AttestationLayer, MediatedRequest, TransportHook};
pub use net::PinningVerifier;
pub use service::AttestationService;
