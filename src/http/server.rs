//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all lambda handler
//! - Wire up middleware (tracing, request ID, access log, timeout)
//! - Buffer request bodies up to the configured limit
//! - Hand requests to the lambda runtime thread and translate the result
//! - Serve on a listener until the shutdown future resolves

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServeOptions;
use crate::http::request::{lambda_request, propagate_request_id_layer, set_request_id_layer};
use crate::http::response::{error_response, lambda_response};
use crate::lambda::DispatcherHandle;
use crate::observability::access_log::access_log;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub lambdas: DispatcherHandle,
    pub max_body_bytes: usize,
}

/// HTTP front end serving every path from project lambdas.
pub struct LambdaServer {
    router: Router,
}

impl LambdaServer {
    pub fn new(options: &ServeOptions, lambdas: DispatcherHandle) -> Self {
        let state = AppState {
            lambdas,
            max_body_bytes: options.max_body_bytes,
        };
        Self {
            router: Self::build_router(options, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(options: &ServeOptions, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(serve_lambda))
            .route("/", any(serve_lambda))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer())
                    .layer(middleware::from_fn_with_state(options.access_log, access_log))
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        options.request_timeout_secs,
                    ))),
            )
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` resolves, then drain in-flight
    /// requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::debug!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: every path is a candidate lambda.
async fn serve_lambda(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let remote = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(
                url = %parts.uri,
                limit = state.max_body_bytes,
                error = %err,
                "Rejected request body"
            );
            return (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large").into_response();
        }
    };

    let request = lambda_request(&parts, &body, remote);
    let url = request.url.clone();
    let request_id = request.request_id.clone();

    match state.lambdas.dispatch(request).await {
        Ok(response) => lambda_response(response),
        Err(err) => error_response(&err, &url, request_id.as_deref()),
    }
}
