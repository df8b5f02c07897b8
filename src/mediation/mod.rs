//! Mediation subsystem.
//!
//! # Data Flow
//! ```text
//! host transport
//!     → rewrite_url: query.rs (secure strings into query parameters)
//!     → mediate:     mediator.rs (pin, token header, header secrets)
//!
//! Both read one store.rs snapshot per pass and route every attester
//! outcome through classify.rs. init.rs gates both: until Ready they pass
//! requests through untouched.
//! ```

pub mod classify;
pub mod init;
pub mod mediator;
pub mod query;
pub mod store;

pub use classify::{classify, ClassifyPolicy, Expected, MediationVerdict};
pub use init::{config_fingerprint, InitState, Initializer};
pub use mediator::{mediate_request, MediationOutcome};
pub use query::{substitute_query_params, Rewrite};
pub use store::{MediationSnapshot, MediationStore, TokenHeader};
