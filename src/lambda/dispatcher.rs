//! Per-request orchestration: resolve, invalidate, load, invoke.

use std::time::Instant;

use crate::lambda::cache::LambdaCache;
use crate::lambda::error::LambdaError;
use crate::lambda::runtime::{LambdaRequest, LambdaResponse, LambdaRuntime};
use crate::observability::metrics;
use crate::routing::{ResolvedLambda, Resolver};

/// Serves requests with lambdas from one project.
pub struct Dispatcher<R: LambdaRuntime> {
    resolver: Resolver,
    cache: LambdaCache<R::Handler>,
    runtime: R,
}

impl<R: LambdaRuntime> Dispatcher<R> {
    pub fn new(resolver: Resolver, runtime: R) -> Self {
        Self {
            resolver,
            cache: LambdaCache::new(),
            runtime,
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn cache(&self) -> &LambdaCache<R::Handler> {
        &self.cache
    }

    /// Resolve the request URL and return the handler for it.
    ///
    /// Every project module is invalidated first, so the handler always
    /// reflects the file as it is on disk now.
    pub fn lookup(&mut self, url: &str) -> Result<(ResolvedLambda, R::Handler), LambdaError> {
        let lambda = self.resolver.resolve(url);
        metrics::record_resolution(match &lambda {
            Ok(_) => "resolved",
            Err(err) => err.kind(),
        });
        let lambda = lambda?;

        self.invalidate();
        let handler = self.handler_for(&lambda)?;
        Ok((lambda, handler))
    }

    /// Drop every cached handler and runtime module under the project root.
    pub fn invalidate(&mut self) -> usize {
        let root = self.resolver.root();
        let dropped = self.cache.invalidate_under(root) + self.runtime.invalidate_under(root);
        metrics::record_cache_invalidation(dropped);
        dropped
    }

    /// The cached handler for a resolved lambda, loading it on a miss.
    pub fn handler_for(&mut self, lambda: &ResolvedLambda) -> Result<R::Handler, LambdaError> {
        let runtime = &mut self.runtime;
        let style = lambda.style;
        self.cache.get_or_load(&lambda.path, |path| {
            tracing::debug!(lambda = %path.display(), style = style.as_str(), "Loading lambda");
            let handler = runtime.load(path, style)?;
            metrics::record_lambda_load(style.as_str());
            Ok(handler)
        })
    }

    /// Serve one request.
    pub fn dispatch(&mut self, request: &LambdaRequest) -> Result<LambdaResponse, LambdaError> {
        let started = Instant::now();
        let (lambda, handler) = self.lookup(&request.url)?;

        tracing::debug!(
            url = %request.url,
            lambda = %lambda.relative,
            "Invoking lambda"
        );

        let response = self.runtime.invoke(&handler, request);
        metrics::record_invocation(&lambda.relative, started);
        response
    }
}
