//! Response handling and translation.
//!
//! # Responsibilities
//! - Turn a lambda's `LambdaResponse` into an HTTP response
//! - Map `LambdaError` to a status code and a plain-text body
//!
//! # Design Decisions
//! - Responses are fully buffered; `content-length` is always recomputed
//! - Hop-by-hop headers set by a lambda are dropped
//! - Header names or values that are not valid HTTP are skipped, not fatal
//! - 5xx bodies are generic; the detail (and stack, if any) goes to the log

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::Response,
};

use crate::lambda::{LambdaError, LambdaResponse};

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "content-length",
    "keep-alive",
    "transfer-encoding",
    "upgrade",
];

/// Build the HTTP response for what a lambda produced.
pub fn lambda_response(lambda: LambdaResponse) -> Response {
    let status = StatusCode::from_u16(lambda.status).unwrap_or_else(|_| {
        tracing::warn!(status = lambda.status, "Lambda set an invalid status code");
        StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut response = buffered(status, lambda.body);
    let headers = response.headers_mut();
    for (name, values) in &lambda.headers {
        if HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        let Ok(header_name) = HeaderName::from_bytes(name.as_bytes()) else {
            tracing::debug!(header = %name, "Skipping invalid header name from lambda");
            continue;
        };
        for value in values.iter() {
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    headers.append(header_name.clone(), value);
                }
                Err(_) => tracing::debug!(header = %name, "Skipping invalid header value from lambda"),
            }
        }
    }
    response
}

/// Build the HTTP response for a failed request.
pub fn error_response(err: &LambdaError, url: &str, request_id: Option<&str>) -> Response {
    let status = err.status_code();
    let request_id = request_id.unwrap_or("-");

    if status.is_server_error() {
        match err {
            LambdaError::Handler {
                stack: Some(stack), ..
            } => tracing::error!(request_id, url, error = %err, stack = %stack, "Lambda failed"),
            _ => tracing::error!(request_id, url, error = %err, "Lambda failed"),
        }
    } else {
        tracing::debug!(request_id, url, status = status.as_u16(), error = %err, "Request not served");
    }

    let mut response = buffered(status, err.public_message());
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

fn buffered(status: StatusCode, body: String) -> Response {
    let length = HeaderValue::from(body.len());
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(header::CONTENT_LENGTH, length);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lambda::runtime::HeaderValues;

    #[test]
    fn test_lambda_response_headers() {
        let mut lambda = LambdaResponse::new(201, "created");
        lambda.headers.insert("x-one".into(), HeaderValues::One("1".into()));
        lambda.headers.insert(
            "set-cookie".into(),
            HeaderValues::Many(vec!["a=1".into(), "b=2".into()]),
        );
        lambda.headers.insert("content-length".into(), HeaderValues::One("999".into()));
        lambda.headers.insert("bad header".into(), HeaderValues::One("x".into()));

        let response = lambda_response(lambda);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-one"], "1");
        assert_eq!(response.headers().get_all("set-cookie").iter().count(), 2);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "7");
        assert_eq!(response.headers().len(), 4);
    }

    #[test]
    fn test_invalid_status_becomes_500() {
        let response = lambda_response(LambdaResponse::new(42, ""));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_response_status_and_length() {
        let err = LambdaError::NotMatched { url: "/x".into() };
        let response = error_response(&err, "/x", None);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::CONTENT_LENGTH],
            "No lambda matching requested path".len().to_string().as_str()
        );

        let err = LambdaError::Handler {
            status: Some(503),
            message: "db down".into(),
            stack: Some("Error: db down\n    at handler".into()),
        };
        let response = error_response(&err, "/y", Some("req-1"));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "21");
    }
}
