//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber
//! - Honor `RUST_LOG`, falling back to the crate's default filter
//!
//! # Design Decisions
//! - Human-readable `fmt` output; this is a development server
//! - Access lines and lambda `console` output are ordinary events under the
//!   `access` and `lambda` targets, so `RUST_LOG` can silence either

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "now_serve=info,tower_http=info,access=info,lambda=info";

/// Install the global subscriber. Safe to call more than once; later
/// calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
