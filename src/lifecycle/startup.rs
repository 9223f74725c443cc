//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate the project's `now.json`
//! - Compile routes and build globs into a `Resolver`
//! - Start the lambda runtime thread
//! - Start the metrics endpoint when configured
//! - Bind the listener last
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and happens before binding
//! - Subsystems initialize in order, not concurrently

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{load_config, ConfigError, ServeOptions};
use crate::http::LambdaServer;
use crate::lambda::worker::DEFAULT_QUEUE_DEPTH;
use crate::lambda::{DispatcherHandle, LambdaError, ScriptRuntime};
use crate::observability::metrics;
use crate::routing::pattern::PatternError;
use crate::routing::resolver::normalize_path;
use crate::routing::Resolver;

/// Error type for startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to resolve project root {}: {source}", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("Failed to start lambda runtime: {0}")]
    Runtime(#[source] LambdaError),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start metrics endpoint: {0}")]
    Metrics(String),
}

/// A bound, ready-to-serve instance.
pub struct Running {
    server: LambdaServer,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Running {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.server.run(self.listener, shutdown).await
    }
}

/// The project root as an absolute, lexically normalized path.
pub fn project_root(root: &Path) -> Result<PathBuf, StartupError> {
    std::path::absolute(root)
        .map(|path| normalize_path(&path))
        .map_err(|source| StartupError::Root {
            path: root.to_path_buf(),
            source,
        })
}

/// Bring every subsystem up in order and bind the listener.
pub async fn boot(options: &ServeOptions) -> Result<Running, StartupError> {
    let root = project_root(&options.root)?;
    let config = load_config(&root)?;
    let resolver = Resolver::new(&root, &config)?;

    tracing::debug!(
        root = %resolver.root().display(),
        builds = resolver.matcher().builds().len(),
        routes = resolver.routes().len(),
        "Configuration loaded"
    );

    let module_root = resolver.root().to_path_buf();
    let lambdas = DispatcherHandle::spawn(
        resolver,
        move || ScriptRuntime::new(&module_root),
        DEFAULT_QUEUE_DEPTH,
    )
    .map_err(StartupError::Runtime)?;

    if let Some(address) = options.metrics_address {
        metrics::init_metrics(address).map_err(StartupError::Metrics)?;
    }

    let server = LambdaServer::new(options, lambdas);

    let listener = TcpListener::bind(options.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: options.bind_address,
            source,
        })?;
    let local_addr = listener.local_addr().map_err(|source| StartupError::Bind {
        address: options.bind_address,
        source,
    })?;

    tracing::info!("Serving lambdas at http://localhost:{}", local_addr.port());

    Ok(Running {
        server,
        listener,
        local_addr,
    })
}
