//! Route lookup and URL candidate generation.
//!
//! # Responsibilities
//! - Store compiled route rules in declaration order
//! - Find the first rule whose `src` matches the request URL
//! - Produce the ordered URL candidate list for the request
//!
//! # Design Decisions
//! - Immutable after construction (shared without locks)
//! - O(n) scan over rules, first match wins
//! - The raw URL is always candidate 0; a rewrite is appended, never
//!   substituted

use crate::config::schema::RouteRule;
use crate::routing::pattern::{PatternError, RoutePattern};
use crate::routing::rewrite::rewrite;

/// A route rule with its compiled `src`.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    pub pattern: RoutePattern,
    pub dest: Option<String>,
}

/// Ordered table of compiled route rules.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
}

impl RouteTable {
    /// Compile every rule. Fails on the first malformed `src`.
    pub fn from_config(rules: &[RouteRule]) -> Result<Self, PatternError> {
        let routes = rules
            .iter()
            .map(|rule| {
                Ok(CompiledRoute {
                    pattern: RoutePattern::compile(&rule.src)?,
                    dest: rule.dest.clone(),
                })
            })
            .collect::<Result<Vec<_>, PatternError>>()?;

        Ok(Self { routes })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// The first route whose `src` matches `url`.
    pub fn find(&self, url: &str) -> Option<&CompiledRoute> {
        self.routes.iter().find(|route| route.pattern.is_match(url))
    }

    /// URL candidates for `url`: the raw URL, then its rewrite (if any).
    pub fn url_candidates(&self, url: &str) -> Vec<String> {
        let mut urls = vec![url.to_string()];

        if let Some(route) = self.find(url) {
            tracing::trace!(url = %url, src = %route.pattern.as_str(), "Route matched");
            if let Some(rewritten) = route
                .dest
                .as_deref()
                .and_then(|dest| rewrite(&route.pattern, dest, url))
            {
                urls.push(rewritten);
            }
        }

        urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rules: &[(&str, Option<&str>)]) -> RouteTable {
        let rules: Vec<RouteRule> = rules
            .iter()
            .map(|(src, dest)| RouteRule {
                src: src.to_string(),
                dest: dest.map(str::to_string),
            })
            .collect();
        RouteTable::from_config(&rules).unwrap()
    }

    #[test]
    fn test_no_routes_yields_raw_url() {
        let routes = RouteTable::default();
        assert!(routes.is_empty());
        assert_eq!(routes.url_candidates("/hello"), vec!["/hello"]);
    }

    #[test]
    fn test_rewrite_is_appended() {
        let routes = table(&[("/api/(?<id>[0-9]+)", Some("/functions/show.js"))]);
        assert_eq!(
            routes.url_candidates("/api/42"),
            vec!["/api/42", "/functions/show.js"]
        );
    }

    #[test]
    fn test_first_match_wins() {
        let routes = table(&[
            ("^/a", Some("/first.js")),
            ("^/a/b", Some("/second.js")),
        ]);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes.url_candidates("/a/b"), vec!["/a/b", "/first.js"]);
    }

    #[test]
    fn test_route_without_dest_consumes_match() {
        let routes = table(&[("^/health", None), ("^/health", Some("/status.js"))]);
        assert_eq!(routes.url_candidates("/health"), vec!["/health"]);
    }

    #[test]
    fn test_malformed_rule_fails() {
        let rules = vec![RouteRule::new("/(unclosed", "/x.js")];
        assert!(RouteTable::from_config(&rules).is_err());
    }
}
