//! Per-request lambda errors.

use axum::http::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Why a request could not be served by a lambda.
#[derive(Debug, Error)]
pub enum LambdaError {
    /// No path candidate matched a node build glob.
    #[error("No lambda matching requested path")]
    NotMatched { url: String },

    /// A candidate matched, but the file is not on disk.
    #[error("Expected lambda file not found")]
    FileMissing { path: PathBuf },

    /// The module could not be read or evaluated.
    #[error("Failed to load lambda {}: {message}", path.display())]
    Load { path: PathBuf, message: String },

    /// The module's export is not a function.
    #[error("Lambdas must be functions")]
    InvalidLambda { path: PathBuf },

    /// The handler threw or rejected.
    #[error("{message}")]
    Handler {
        status: Option<u16>,
        message: String,
        stack: Option<String>,
    },

    /// The engine returned something the server cannot interpret.
    #[error("Lambda runtime protocol error: {0}")]
    Protocol(String),

    /// The runtime worker is gone.
    #[error("Lambda runtime unavailable")]
    Unavailable,
}

impl LambdaError {
    /// HTTP status reported to the requester.
    pub fn status_code(&self) -> StatusCode {
        match self {
            LambdaError::NotMatched { .. } | LambdaError::FileMissing { .. } => {
                StatusCode::NOT_FOUND
            }
            LambdaError::Handler { status, .. } => status
                .and_then(|code| StatusCode::from_u16(code).ok())
                .filter(|code| code.is_client_error() || code.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            LambdaError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            LambdaError::Load { .. }
            | LambdaError::InvalidLambda { .. }
            | LambdaError::Protocol(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body sent with the error status. Server errors stay generic except
    /// for the messages that describe the project layout.
    pub fn public_message(&self) -> String {
        match self {
            LambdaError::Handler { .. } if self.status_code().is_server_error() => {
                "Internal Server Error".to_string()
            }
            LambdaError::Protocol(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            LambdaError::NotMatched { .. } => "not_matched",
            LambdaError::FileMissing { .. } => "file_missing",
            LambdaError::Load { .. } => "load_failed",
            LambdaError::InvalidLambda { .. } => "invalid_lambda",
            LambdaError::Handler { .. } => "handler_error",
            LambdaError::Protocol(_) => "protocol_error",
            LambdaError::Unavailable => "unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_messages_are_distinct() {
        let no_match = LambdaError::NotMatched { url: "/x".into() };
        let missing = LambdaError::FileMissing { path: "/p/x.js".into() };

        assert_eq!(no_match.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        assert_ne!(no_match.public_message(), missing.public_message());
    }

    #[test]
    fn test_handler_status() {
        let err = LambdaError::Handler {
            status: Some(418),
            message: "short and stout".into(),
            stack: None,
        };
        assert_eq!(err.status_code().as_u16(), 418);
        assert_eq!(err.public_message(), "short and stout");

        let err = LambdaError::Handler {
            status: None,
            message: "boom".into(),
            stack: Some("Error: boom".into()),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal Server Error");

        let err = LambdaError::Handler {
            status: Some(200),
            message: "not an error status".into(),
            stack: None,
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_invalid_lambda_is_server_error() {
        let err = LambdaError::InvalidLambda { path: "/p/a.js".into() };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Lambdas must be functions");
    }
}
