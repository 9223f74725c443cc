//! Local development server for `now.json` projects.
//!
//! Reads the project's routes and builds, maps every request URL to a
//! lambda source file, and runs it in an embedded JavaScript engine with
//! hot reload on every request.

pub mod cli;
pub mod config;
pub mod http;
pub mod lambda;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::{DeploymentConfig, ServeOptions};
pub use http::LambdaServer;
pub use lifecycle::Shutdown;
