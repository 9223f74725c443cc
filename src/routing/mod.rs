//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request URL
//!     → router.rs (first matching route, rewrite via rewrite.rs)
//!     → URL candidates  [raw, rewritten?]
//!     → candidates.rs (normalize to relative paths)
//!     → matcher.rs (first candidate accepted by a node build glob)
//!     → resolver.rs (absolute path, existence check)
//!     → ResolvedLambda or LambdaError
//!
//! Compilation (at startup):
//!     RouteRule[]  → pattern.rs (degrade named groups, compile regex)
//!     BuildEntry[] → glob.rs (compile node build globs)
//!     → Freeze as immutable Resolver
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always resolves to the same file
//! - First match wins, both for routes and for candidates
//! - The literal URL is tried before its rewrite

pub mod candidates;
pub mod glob;
pub mod matcher;
pub mod pattern;
pub mod resolver;
pub mod rewrite;
pub mod router;

pub use resolver::{ResolvedLambda, Resolver};
