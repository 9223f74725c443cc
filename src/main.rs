//! now-serve
//!
//! Serves a project's lambdas locally, routed the way the deployment
//! platform routes them.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────┐
//!                          │                    NOW-SERVE                     │
//!                          │                                                  │
//!     Client Request       │  ┌─────────┐    ┌───────────┐                    │
//!     ─────────────────────┼─▶│  http   │───▶│  access   │                    │
//!                          │  │ server  │    │ log/reqid │                    │
//!                          │  └─────────┘    └─────┬─────┘                    │
//!                          │                       │ mpsc job                 │
//!                          │                       ▼                          │
//!                          │  ┌───────────────────────────────────────────┐   │
//!                          │  │            lambda runtime thread          │   │
//!                          │  │  routing ─▶ cache (invalidate) ─▶ engine  │   │
//!                          │  └───────────────────────┬───────────────────┘   │
//!                          │                          │ oneshot reply         │
//!     Client Response      │  ┌─────────┐             │                       │
//!     ◀────────────────────┼──│response │◀────────────┘                       │
//!                          │  └─────────┘                                     │
//!                          │                                                  │
//!                          │  config (now.json) · observability · lifecycle   │
//!                          └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;

use now_serve::cli::Cli;
use now_serve::lifecycle::{boot, shutdown_signal, Shutdown};
use now_serve::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let options = Cli::parse().into_options();

    tracing::debug!(
        root = %options.root.display(),
        bind_address = %options.bind_address,
        access_log = %options.access_log,
        request_timeout_secs = options.request_timeout_secs,
        "Configuration loaded"
    );

    let running = boot(&options).await?;
    running.serve(shutdown_signal(Shutdown::new())).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
