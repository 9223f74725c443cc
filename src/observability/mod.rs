//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! HTTP layer produces:
//!     → access_log.rs (one morgan-style line per request, target "access")
//!
//! Consumers:
//!     → stdout (fmt subscriber)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through all request-scoped events
//! - Metrics are cheap (no-ops without a recorder)

pub mod access_log;
pub mod logging;
pub mod metrics;

pub use access_log::AccessLogFormat;
pub use logging::init_tracing;
