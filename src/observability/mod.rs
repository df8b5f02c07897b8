//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! service / mediation / query engine produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms via the metrics facade)
//!
//! Consumers:
//!     → whatever subscriber / recorder the host installs
//! ```
//!
//! # Design Decisions
//! - The crate never installs a metrics recorder; hosts choose the exporter
//! - Tokens and secrets never appear in log fields or metric labels

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
