//! Loaded-handler cache with subtree invalidation.
//!
//! # Responsibilities
//! - Map absolute source paths to loaded handlers
//! - Drop every entry under the project root before each request
//! - Load lazily on a miss, at most once per path between invalidations
//!
//! # Design Decisions
//! - Owned by the single runtime thread; no locking
//! - Invalidation is a full sweep of the project subtree, not per-file,
//!   so edits to any module are picked up on the next request
//! - The sweep is proportional to the number of cached entries
//! - Traceable, so engine objects can be cached inside the engine's heap

use boa_gc::{Finalize, Trace};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Cache of loaded handlers keyed by absolute path.
#[derive(Debug, Trace, Finalize)]
pub struct LambdaCache<H> {
    entries: HashMap<PathBuf, H>,
    loads: u64,
}

impl<H> Default for LambdaCache<H> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            loads: 0,
        }
    }
}

impl<H: Clone> LambdaCache<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every handler whose path lies strictly under `root`.
    /// Returns how many entries were dropped.
    pub fn invalidate_under(&mut self, root: &Path) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|path, _| !(path.starts_with(root) && path != root));
        before - self.entries.len()
    }

    /// The cached handler for `path`, loading it with `load` on a miss.
    /// A failed load leaves the cache untouched.
    pub fn get_or_load<E, F>(&mut self, path: &Path, load: F) -> Result<H, E>
    where
        F: FnOnce(&Path) -> Result<H, E>,
    {
        if let Some(handler) = self.entries.get(path) {
            return Ok(handler.clone());
        }

        let handler = load(path)?;
        self.loads += 1;
        self.entries.insert(path.to_path_buf(), handler.clone());
        Ok(handler)
    }

    pub fn get(&self, path: &Path) -> Option<H> {
        self.entries.get(path).cloned()
    }

    /// Store an entry loaded outside `get_or_load`, replacing any previous one.
    pub fn insert(&mut self, path: &Path, handler: H) {
        self.loads += 1;
        self.entries.insert(path.to_path_buf(), handler);
    }

    pub fn remove(&mut self, path: &Path) -> Option<H> {
        self.entries.remove(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total successful loads since creation.
    pub fn loads(&self) -> u64 {
        self.loads
    }
}
