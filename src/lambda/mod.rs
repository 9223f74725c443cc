//! Lambda execution subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP task
//!     → worker.rs (DispatcherHandle: mpsc job + oneshot reply)
//!     → runtime thread
//!         → dispatcher.rs (resolve via routing::Resolver)
//!         → cache.rs (drop project modules, load on miss)
//!         → script.rs (evaluate module, call handler(req, res))
//!     → LambdaResponse or LambdaError
//!     → back to the HTTP task
//! ```
//!
//! # Design Decisions
//! - Everything that touches the engine or the cache runs on one thread
//! - Hot reload by invalidation on every request, no file watcher
//! - The engine sits behind the `LambdaRuntime` trait so the dispatch
//!   pipeline is testable without it

pub mod cache;
pub mod dispatcher;
pub mod error;
pub mod runtime;
pub mod script;
pub mod worker;

pub use dispatcher::Dispatcher;
pub use error::LambdaError;
pub use runtime::{ExportStyle, LambdaRequest, LambdaResponse, LambdaRuntime};
pub use script::ScriptRuntime;
pub use worker::DispatcherHandle;
