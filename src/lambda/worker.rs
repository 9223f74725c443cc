//! Runtime thread and its async handle.
//!
//! # Responsibilities
//! - Own the `Dispatcher` (resolver, cache, engine) on one dedicated thread
//! - Accept jobs from any number of HTTP tasks over a bounded channel
//! - Reply to each job over its own oneshot channel
//!
//! # Design Decisions
//! - Resolution, invalidation and loading for one request never interleave
//!   with another's; jobs are served strictly in arrival order
//! - A panic while serving a job is caught and reported as a protocol
//!   error; the thread keeps serving
//! - Once the thread is gone every dispatch fails with `Unavailable`

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc as std_mpsc;
use std::thread;

use tokio::sync::{mpsc, oneshot};

use crate::lambda::dispatcher::Dispatcher;
use crate::lambda::error::LambdaError;
use crate::lambda::runtime::{LambdaRequest, LambdaResponse, LambdaRuntime};
use crate::routing::Resolver;

/// Jobs waiting for the runtime thread before senders start waiting.
pub const DEFAULT_QUEUE_DEPTH: usize = 256;

type Reply = oneshot::Sender<Result<LambdaResponse, LambdaError>>;

struct Job {
    request: LambdaRequest,
    reply: Reply,
}

/// Cloneable handle to the runtime thread.
#[derive(Clone, Debug)]
pub struct DispatcherHandle {
    tx: mpsc::Sender<Job>,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job").field("url", &self.request.url).finish()
    }
}

impl DispatcherHandle {
    /// Start the runtime thread.
    ///
    /// `make_runtime` runs on the new thread, so the runtime itself need not
    /// be `Send`. Returns once the runtime is built, or with its error.
    pub fn spawn<R, F>(resolver: Resolver, make_runtime: F, queue_depth: usize) -> Result<Self, LambdaError>
    where
        R: LambdaRuntime + 'static,
        F: FnOnce() -> Result<R, LambdaError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(queue_depth.max(1));
        let (ready_tx, ready_rx) = std_mpsc::channel();

        thread::Builder::new()
            .name("lambda-runtime".to_string())
            .spawn(move || {
                let runtime = match make_runtime() {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                serve(Dispatcher::new(resolver, runtime), rx);
            })
            .map_err(|err| LambdaError::Protocol(format!("failed to start runtime thread: {err}")))?;

        ready_rx.recv().map_err(|_| LambdaError::Unavailable)??;
        Ok(Self { tx })
    }

    /// Hand a request to the runtime thread and wait for its response.
    pub async fn dispatch(&self, request: LambdaRequest) -> Result<LambdaResponse, LambdaError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Job { request, reply })
            .await
            .map_err(|_| LambdaError::Unavailable)?;
        response.await.map_err(|_| LambdaError::Unavailable)?
    }
}

fn serve<R: LambdaRuntime>(mut dispatcher: Dispatcher<R>, mut rx: mpsc::Receiver<Job>) {
    tracing::debug!(root = %dispatcher.resolver().root().display(), "Lambda runtime started");

    while let Some(job) = rx.blocking_recv() {
        let result = catch_unwind(AssertUnwindSafe(|| dispatcher.dispatch(&job.request)))
            .unwrap_or_else(|_| {
                tracing::error!(url = %job.request.url, "Lambda runtime panicked");
                Err(LambdaError::Protocol("lambda runtime panicked".into()))
            });
        if job.reply.send(result).is_err() {
            tracing::debug!(url = %job.request.url, "Client went away before the lambda finished");
        }
    }

    tracing::debug!("Lambda runtime stopped");
}
