//! Configuration schema definitions.
//!
//! `DeploymentConfig` mirrors the parts of a `now.json` deployment file the
//! server understands. `ServeOptions` carries the process-level settings
//! collected from the command line.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Prefix of the `use` field identifying node-runtime builds.
pub const NODE_RUNTIME: &str = "@now/node";

/// Root of a deployment configuration file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Build entries mapping source globs to runtimes.
    pub builds: Vec<BuildEntry>,

    /// Route rewrite rules, evaluated in declaration order.
    pub routes: Vec<RouteRule>,
}

impl DeploymentConfig {
    /// Build entries handled by the node runtime, in declaration order.
    pub fn node_builds(&self) -> impl Iterator<Item = &BuildEntry> {
        self.builds.iter().filter(|build| build.is_node())
    }
}

/// Declares that files matching `src` are implemented by the `use` runtime.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BuildEntry {
    /// Runtime identifier (e.g. `@now/node@canary`).
    #[serde(rename = "use")]
    pub runtime: String,

    /// Glob pattern of source files, relative to the project root.
    pub src: String,

    /// Runtime-specific options. Carried through, never interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

impl BuildEntry {
    pub fn new(runtime: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            runtime: runtime.into(),
            src: src.into(),
            config: None,
        }
    }

    /// True when this entry participates in lambda matching.
    pub fn is_node(&self) -> bool {
        self.runtime.starts_with(NODE_RUNTIME)
    }
}

/// A regex-to-template rewrite rule.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RouteRule {
    /// Regex matched against the raw request URL.
    pub src: String,

    /// Destination template; `$name` references named groups of `src`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
}

impl RouteRule {
    pub fn new(src: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dest: Some(dest.into()),
        }
    }
}

/// Process-level settings for one `now-serve` run.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Directory containing `now.json` and every lambda source.
    pub root: PathBuf,

    /// Address the HTTP listener binds to.
    pub bind_address: SocketAddr,

    /// Access log line format.
    pub access_log: crate::observability::access_log::AccessLogFormat,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Largest request body handed to a lambda.
    pub max_body_bytes: usize,

    /// Optional Prometheus scrape endpoint.
    pub metrics_address: Option<SocketAddr>,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            access_log: Default::default(),
            request_timeout_secs: 60,
            max_body_bytes: 5 * 1024 * 1024,
            metrics_address: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_now_json() {
        let raw = r#"{
            "version": 2,
            "builds": [
                { "src": "api/*.js", "use": "@now/node" },
                { "src": "www/**", "use": "@now/static" }
            ],
            "routes": [
                { "src": "/api/(?<id>[0-9]+)", "dest": "/api/show.js?id=$id" },
                { "src": "/health" }
            ]
        }"#;

        let config: DeploymentConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.builds.len(), 2);
        assert_eq!(config.builds[0].runtime, "@now/node");
        assert_eq!(config.routes[0].dest.as_deref(), Some("/api/show.js?id=$id"));
        assert_eq!(config.routes[1].dest, None);
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let config: DeploymentConfig = serde_json::from_str("{}").unwrap();
        assert!(config.builds.is_empty());
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_node_runtime_detection() {
        assert!(BuildEntry::new("@now/node", "*.js").is_node());
        assert!(BuildEntry::new("@now/node@canary", "*.js").is_node());
        assert!(!BuildEntry::new("@now/static", "*.html").is_node());
        assert!(!BuildEntry::new("now/node", "*.js").is_node());

        let config = DeploymentConfig {
            builds: vec![
                BuildEntry::new("@now/static", "www/**"),
                BuildEntry::new("@now/node@1.0.0", "api/*.js"),
            ],
            routes: vec![],
        };
        let node: Vec<_> = config.node_builds().map(|b| b.src.as_str()).collect();
        assert_eq!(node, vec!["api/*.js"]);
    }
}
