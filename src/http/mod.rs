//! Transport integration subsystem.
//!
//! # Data Flow
//! ```text
//! host client call
//!     → layer.rs (tower layer, or the host calls the hook directly)
//!     → hook.rs (TransportHook: rewrite_url, then mediate)
//!     → request.rs (MediatedRequest view of hyper::Request)
//!     → inner client service, verifier in request extensions
//! ```

pub mod hook;
pub mod layer;
pub mod request;

pub use hook::TransportHook;
pub use layer::{AttestationLayer, Attested};
pub use request::{installed_verifier, InstalledVerifier, MediatedRequest};
