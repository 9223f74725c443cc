//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! <root>/now.json
//!     → loader.rs (read & deserialize)
//!     → validation.rs (node builds present, route patterns compile)
//!     → DeploymentConfig (validated, immutable)
//!     → compiled into the routing::Resolver at startup
//! ```
//!
//! # Design Decisions
//! - The configuration is a snapshot: loaded once, never reloaded
//! - Only lambda source code is hot-reloaded, never `now.json`
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, CONFIG_FILE_NAME};
pub use schema::{BuildEntry, DeploymentConfig, RouteRule, ServeOptions};
pub use validation::ValidationError;
