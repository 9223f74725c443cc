//! Configuration validation.
//!
//! # Responsibilities
//! - Require at least one node-runtime build
//! - Compile every route `src` so malformed patterns fail at startup
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function of the parsed configuration

use thiserror::Error;

use crate::config::schema::DeploymentConfig;
use crate::routing::pattern::{PatternError, RoutePattern};

/// A semantic problem with a parsed `now.json`.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("No @now/node builds found")]
    NoQualifyingBuilds,

    #[error("route #{index} has an invalid src: {source}")]
    InvalidRoute {
        index: usize,
        #[source]
        source: PatternError,
    },
}

/// Validate a parsed deployment configuration.
pub fn validate_config(config: &DeploymentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.node_builds().next().is_none() {
        errors.push(ValidationError::NoQualifyingBuilds);
    }

    for (index, route) in config.routes.iter().enumerate() {
        if let Err(source) = RoutePattern::compile(&route.src) {
            errors.push(ValidationError::InvalidRoute { index, source });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{BuildEntry, RouteRule};

    #[test]
    fn test_valid_config() {
        let config = DeploymentConfig {
            builds: vec![BuildEntry::new("@now/node", "api/*.js")],
            routes: vec![RouteRule::new("/api/(?<id>[0-9]+)", "/api/show.js")],
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let config = DeploymentConfig {
            builds: vec![BuildEntry::new("@now/static", "*.html")],
            routes: vec![
                RouteRule::new("/ok", "/ok.js"),
                RouteRule::new("/broken/(", "/x.js"),
            ],
        };

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], ValidationError::NoQualifyingBuilds));
        assert!(matches!(errors[1], ValidationError::InvalidRoute { index: 1, .. }));
    }
}
