//! Request handling and translation.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) when the client sent none
//! - Translate an HTTP request into the `LambdaRequest` a handler sees
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The lambda sees the raw request target (path plus query), not a
//!   parsed form
//! - Header names are lower-case; repeated headers are joined with `, `

use axum::http::{request::Parts, HeaderName, HeaderValue, Request};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use uuid::Uuid;

use crate::lambda::LambdaRequest;
use crate::observability::access_log::version_label;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Layer that stamps `x-request-id` on requests lacking one.
pub fn set_request_id_layer() -> SetRequestIdLayer<UuidRequestId> {
    SetRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID), UuidRequestId)
}

/// Layer that copies the request's `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID))
}

/// Access to the request ID on request types.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&str>;
}

impl RequestIdExt for Parts {
    fn request_id(&self) -> Option<&str> {
        self.headers
            .get(X_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
    }
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<&str> {
        self.headers()
            .get(X_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
    }
}

/// Build the lambda's view of a request from its head and buffered body.
pub fn lambda_request(parts: &Parts, body: &[u8], remote: Option<SocketAddr>) -> LambdaRequest {
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in &parts.headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        headers
            .entry(name.as_str().to_string())
            .and_modify(|joined| {
                joined.push_str(", ");
                joined.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }

    let url = parts
        .uri
        .path_and_query()
        .map(|target| target.as_str())
        .unwrap_or("/");

    LambdaRequest {
        method: parts.method.to_string(),
        url: url.to_string(),
        http_version: version_label(parts.version).to_string(),
        headers,
        body: String::from_utf8_lossy(body).into_owned(),
        request_id: parts.request_id().map(str::to_string),
        remote_address: remote.map(|addr| addr.ip().to_string()),
    }
}
