//! Lambda matching against build globs.
//!
//! # Responsibilities
//! - Hold the compiled globs of every node-runtime build
//! - Pick the first path candidate any build glob accepts
//!
//! # Design Decisions
//! - Candidates are tried in list order; builds are tried in declaration
//!   order for each candidate
//! - Non-node builds never participate

use crate::config::schema::BuildEntry;
use crate::routing::glob::GlobPattern;

/// A node-runtime build with its compiled `src` glob.
#[derive(Debug, Clone)]
pub struct LambdaBuild {
    pub runtime: String,
    pub pattern: GlobPattern,
}

/// Matches path candidates against node-runtime build globs.
#[derive(Debug, Clone, Default)]
pub struct LambdaMatcher {
    builds: Vec<LambdaBuild>,
}

impl LambdaMatcher {
    /// Compile the globs of every node-runtime build in `builds`.
    pub fn from_builds<'a>(builds: impl IntoIterator<Item = &'a BuildEntry>) -> Self {
        let builds = builds
            .into_iter()
            .filter(|build| build.is_node())
            .map(|build| LambdaBuild {
                runtime: build.runtime.clone(),
                pattern: GlobPattern::new(&build.src),
            })
            .collect();

        Self { builds }
    }

    pub fn builds(&self) -> &[LambdaBuild] {
        &self.builds
    }

    /// The build whose glob accepts `path`, if any.
    pub fn build_for(&self, path: &str) -> Option<&LambdaBuild> {
        self.builds.iter().find(|build| build.pattern.matches(path))
    }

    /// The first candidate accepted by any build glob.
    pub fn find<'c, S: AsRef<str>>(&self, candidates: &'c [S]) -> Option<&'c str> {
        candidates
            .iter()
            .map(AsRef::as_ref)
            .find(|path| self.build_for(path).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(builds: &[(&str, &str)]) -> LambdaMatcher {
        let entries: Vec<BuildEntry> = builds
            .iter()
            .map(|(runtime, src)| BuildEntry::new(*runtime, *src))
            .collect();
        LambdaMatcher::from_builds(&entries)
    }

    #[test]
    fn test_ignores_non_node_builds() {
        let m = matcher(&[("@now/static", "**"), ("@now/node", "api/*.js")]);
        assert_eq!(m.builds().len(), 1);
        assert_eq!(m.find(&["index.html.js"]), None);
    }

    #[test]
    fn test_prefix_must_match() {
        let m = matcher(&[("@now/node", "api/*.js")]);
        assert_eq!(m.find(&["hello.js"]), None);
        assert_eq!(m.find(&["api/hello.js"]), Some("api/hello.js"));
    }

    #[test]
    fn test_first_candidate_wins() {
        let m = matcher(&[("@now/node", "**/*.js")]);
        let candidates = vec!["api/42.js".to_string(), "functions/show.js".to_string()];
        assert_eq!(m.find(&candidates), Some("api/42.js"));
    }

    #[test]
    fn test_falls_back_to_later_candidates() {
        let m = matcher(&[("@now/node", "functions/*.js")]);
        let candidates = ["api/42.js", "functions/show.js"];
        assert_eq!(m.find(&candidates), Some("functions/show.js"));
    }

    #[test]
    fn test_any_build_may_accept() {
        let m = matcher(&[("@now/node", "api/*.js"), ("@now/node@canary", "lib/*.ts")]);
        assert_eq!(m.find(&["lib/util.ts"]), Some("lib/util.ts"));
        assert_eq!(
            m.build_for("lib/util.ts").map(|b| b.runtime.as_str()),
            Some("@now/node@canary")
        );
    }
}
