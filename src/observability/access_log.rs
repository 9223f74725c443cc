//! HTTP access log.
//!
//! One line per request in one of the classic morgan formats, emitted under
//! the `access` tracing target once the response is ready.
//!
//! | Format | Line |
//! |--------|------|
//! | `combined` | `addr - user [date] "METHOD url HTTP/v" status length "referrer" "agent"` |
//! | `common` | `addr - user [date] "METHOD url HTTP/v" status length` |
//! | `dev` | `METHOD url status time ms - length` |
//! | `short` | `addr user METHOD url HTTP/v status length - time ms` |
//! | `tiny` | `METHOD url status length - time ms` |

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, Version},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::observability::metrics;

const MISSING: &str = "-";

/// Access log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum AccessLogFormat {
    #[default]
    Combined,
    Common,
    Dev,
    Short,
    Tiny,
}

impl AccessLogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLogFormat::Combined => "combined",
            AccessLogFormat::Common => "common",
            AccessLogFormat::Dev => "dev",
            AccessLogFormat::Short => "short",
            AccessLogFormat::Tiny => "tiny",
        }
    }
}

impl fmt::Display for AccessLogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a log line can mention about one request.
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_addr: Option<String>,
    pub date: DateTime<Utc>,
    pub method: String,
    pub url: String,
    pub http_version: String,
    pub status: u16,
    pub content_length: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub response_time: Duration,
}

impl AccessLogEntry {
    pub fn format_line(&self, format: AccessLogFormat) -> String {
        let addr = or_missing(&self.remote_addr);
        let length = or_missing(&self.content_length);
        let time = format!("{:.3}", self.response_time.as_secs_f64() * 1000.0);
        let date = self.date.format("%d/%b/%Y:%H:%M:%S %z");
        let (method, url, version, status) =
            (&self.method, &self.url, &self.http_version, self.status);

        match format {
            AccessLogFormat::Combined => format!(
                "{addr} - {MISSING} [{date}] \"{method} {url} HTTP/{version}\" {status} {length} \"{}\" \"{}\"",
                or_missing(&self.referrer),
                or_missing(&self.user_agent),
            ),
            AccessLogFormat::Common => format!(
                "{addr} - {MISSING} [{date}] \"{method} {url} HTTP/{version}\" {status} {length}"
            ),
            AccessLogFormat::Dev => format!("{method} {url} {status} {time} ms - {length}"),
            AccessLogFormat::Short => format!(
                "{addr} {MISSING} {method} {url} HTTP/{version} {status} {length} - {time} ms"
            ),
            AccessLogFormat::Tiny => format!("{method} {url} {status} {length} - {time} ms"),
        }
    }
}

fn or_missing(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(MISSING)
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// `1.1`, `2.0`, ... as morgan prints `:http-version`.
pub fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "1.1",
    }
}

/// Middleware writing one access log line per request.
pub async fn access_log(
    State(format): State<AccessLogFormat>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let date = Utc::now();
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    let method = request.method().to_string();
    let url = request.uri().to_string();
    let http_version = version_label(request.version()).to_string();
    let referrer = header_value(request.headers(), header::REFERER);
    let user_agent = header_value(request.headers(), header::USER_AGENT);

    let response = next.run(request).await;

    let entry = AccessLogEntry {
        remote_addr,
        date,
        method,
        url,
        http_version,
        status: response.status().as_u16(),
        content_length: header_value(response.headers(), header::CONTENT_LENGTH),
        referrer,
        user_agent,
        response_time: started.elapsed(),
    };
    tracing::info!(target: "access", "{}", entry.format_line(format));
    metrics::record_request(&entry.method, entry.status, started);

    response
}
