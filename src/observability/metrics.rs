//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define server metrics (requests, latency, resolutions, reloads)
//! - Expose a Prometheus-compatible scrape endpoint when configured
//!
//! # Metrics
//! - `now_serve_requests_total` (counter): requests by method, status
//! - `now_serve_request_duration_seconds` (histogram): end-to-end latency
//! - `now_serve_resolutions_total` (counter): URL resolutions by outcome
//! - `now_serve_lambda_loads_total` (counter): module loads by export style
//! - `now_serve_cache_invalidations_total` (counter): modules dropped for reload
//! - `now_serve_lambda_duration_seconds` (histogram): resolve + invoke time by lambda
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Histogram buckets tuned for local development latencies

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Install the Prometheus recorder and its HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(DURATION_BUCKETS)
        .map_err(|err| err.to_string())?
        .install()
        .map_err(|err| err.to_string())?;

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// One served HTTP request.
pub fn record_request(method: &str, status: u16, started: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("now_serve_requests_total", &labels).increment(1);
    metrics::histogram!("now_serve_request_duration_seconds", &labels)
        .record(started.elapsed().as_secs_f64());
}

/// Outcome of resolving a URL to a lambda file.
pub fn record_resolution(outcome: &'static str) {
    metrics::counter!("now_serve_resolutions_total", "outcome" => outcome).increment(1);
}

pub fn record_lambda_load(style: &'static str) {
    metrics::counter!("now_serve_lambda_loads_total", "style" => style).increment(1);
}

pub fn record_cache_invalidation(dropped: usize) {
    metrics::counter!("now_serve_cache_invalidations_total").increment(dropped as u64);
}

/// Time spent resolving and invoking one lambda.
pub fn record_invocation(lambda: &str, started: Instant) {
    metrics::histogram!("now_serve_lambda_duration_seconds", "lambda" => lambda.to_string())
        .record(started.elapsed().as_secs_f64());
}
