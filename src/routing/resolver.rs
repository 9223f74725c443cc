//! Request URL → lambda file resolution.
//!
//! # Responsibilities
//! - Run the full resolution pipeline for one URL:
//!   routes → URL candidates → path candidates → build match → file
//! - Distinguish "nothing matched" from "matched file is missing"
//!
//! # Design Decisions
//! - Built once from the configuration snapshot; immutable afterwards
//! - Path normalization is lexical: `.` and `..` are folded without
//!   touching the filesystem, and a result outside the root counts as
//!   missing

use std::path::{Component, Path, PathBuf};

use crate::config::schema::DeploymentConfig;
use crate::lambda::error::LambdaError;
use crate::lambda::runtime::ExportStyle;
use crate::routing::candidates::path_candidates;
use crate::routing::matcher::LambdaMatcher;
use crate::routing::pattern::PatternError;
use crate::routing::router::RouteTable;

/// A lambda file chosen for a request.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLambda {
    /// The winning path candidate, relative to the project root.
    pub relative: String,

    /// Absolute path of the source file.
    pub path: PathBuf,

    /// How the handler is taken from the module's exports.
    pub style: ExportStyle,
}

/// Resolves request URLs to lambda files under a project root.
#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
    routes: RouteTable,
    matcher: LambdaMatcher,
}

impl Resolver {
    /// Compile the configuration for `root`.
    ///
    /// `root` must be absolute; startup resolves it once before building
    /// the resolver.
    pub fn new(root: &Path, config: &DeploymentConfig) -> Result<Self, PatternError> {
        debug_assert!(root.is_absolute(), "project root must be absolute");
        let root = normalize_path(root);

        Ok(Self {
            root,
            routes: RouteTable::from_config(&config.routes)?,
            matcher: LambdaMatcher::from_builds(&config.builds),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn matcher(&self) -> &LambdaMatcher {
        &self.matcher
    }

    /// The relative path a URL maps to, without checking the filesystem.
    pub fn match_url(&self, url: &str) -> Result<String, LambdaError> {
        let urls = self.routes.url_candidates(url);
        let paths = path_candidates(&urls);

        tracing::trace!(url = %url, candidates = ?paths, "Path candidates");

        self.matcher
            .find(&paths)
            .map(str::to_string)
            .ok_or_else(|| LambdaError::NotMatched {
                url: url.to_string(),
            })
    }

    /// Resolve a URL to an existing lambda file.
    pub fn resolve(&self, url: &str) -> Result<ResolvedLambda, LambdaError> {
        let relative = self.match_url(url)?;
        let path = normalize_path(&self.root.join(&relative));

        if !path.starts_with(&self.root) || !path.is_file() {
            return Err(LambdaError::FileMissing { path });
        }

        let style = ExportStyle::for_path(&path);
        Ok(ResolvedLambda {
            relative,
            path,
            style,
        })
    }
}

/// Lexically fold `.` and `..` components.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{BuildEntry, RouteRule};
    use std::fs;

    fn project(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "module.exports = () => {}").unwrap();
        }
        dir
    }

    fn config(builds: &[&str], routes: &[(&str, &str)]) -> DeploymentConfig {
        DeploymentConfig {
            builds: builds
                .iter()
                .map(|src| BuildEntry::new("@now/node", *src))
                .collect(),
            routes: routes
                .iter()
                .map(|(src, dest)| RouteRule::new(*src, *dest))
                .collect(),
        }
    }

    #[test]
    fn test_resolves_literal_path() {
        let dir = project(&["api/hello.js"]);
        let resolver = Resolver::new(dir.path(), &config(&["api/*.js"], &[])).unwrap();

        let lambda = resolver.resolve("/api/hello").unwrap();
        assert_eq!(lambda.relative, "api/hello.js");
        assert_eq!(lambda.path, normalize_path(&dir.path().join("api/hello.js")));
        assert_eq!(lambda.style, ExportStyle::Direct);
    }

    #[test]
    fn test_prefix_mismatch_is_not_matched() {
        let dir = project(&["api/hello.js"]);
        let resolver = Resolver::new(dir.path(), &config(&["api/*.js"], &[])).unwrap();

        let err = resolver.resolve("/hello").unwrap_err();
        assert!(matches!(err, LambdaError::NotMatched { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = project(&[]);
        let resolver = Resolver::new(dir.path(), &config(&["api/*.js"], &[])).unwrap();

        let err = resolver.resolve("/api/ghost").unwrap_err();
        assert!(matches!(err, LambdaError::FileMissing { .. }));
    }

    #[test]
    fn test_rewritten_candidate_is_used_as_fallback() {
        let dir = project(&["functions/show.js"]);
        let resolver = Resolver::new(
            dir.path(),
            &config(&["functions/*.js"], &[("/api/(?<id>[0-9]+)", "/functions/show.js")]),
        )
        .unwrap();

        let lambda = resolver.resolve("/api/42").unwrap();
        assert_eq!(lambda.relative, "functions/show.js");
    }

    #[test]
    fn test_literal_candidate_takes_precedence() {
        let dir = project(&["api/42.js", "functions/show.js"]);
        let resolver = Resolver::new(
            dir.path(),
            &config(&["**/*.js"], &[("/api/(?<id>[0-9]+)", "/functions/show.js")]),
        )
        .unwrap();

        assert_eq!(resolver.resolve("/api/42").unwrap().relative, "api/42.js");
    }

    #[test]
    fn test_typescript_uses_default_export() {
        let dir = project(&["api/index.ts"]);
        let resolver = Resolver::new(dir.path(), &config(&["api/*.ts"], &[])).unwrap();

        let lambda = resolver.resolve("/api/index.ts").unwrap();
        assert_eq!(lambda.style, ExportStyle::Default);
    }

    #[test]
    fn test_directory_is_not_a_lambda() {
        let dir = project(&["api.js/inner.js"]);
        let resolver = Resolver::new(dir.path(), &config(&["*.js"], &[])).unwrap();

        assert!(matches!(
            resolver.resolve("/api.js").unwrap_err(),
            LambdaError::FileMissing { .. }
        ));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_path(Path::new("/a/b/../../..")), PathBuf::from("/"));
    }
}
