//! Tree copy filtering
//!
//! Narrows which files of a source tree take part in a copy: glob
//! include/exclude patterns plus an optional metadata predicate.
//! Filtering decides participation, the skip strategy then decides
//! whether a participating file actually needs transferring.

use ferry_core::{FerryError, FerryResult, Node};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::resolver::{self, NodeMetadata};

/// Metadata predicate over one candidate file
///
/// Receives the resolved source metadata and the tree-relative path.
/// Returning false drops the file from the copy; a panic inside the
/// predicate drops the file as well rather than aborting the batch.
pub type FilterPredicate = Arc<dyn Fn(&NodeMetadata, &str) -> bool + Send + Sync>;

/// Filter applied to each file during tree enumeration
///
/// A pattern containing `/` is matched against the tree-relative path;
/// a bare pattern is matched against the file name alone, so `*.py`
/// reaches into subdirectories while `build/*` stays anchored.
#[derive(Clone, Default)]
pub struct TreeFilter {
    include: Vec<glob::Pattern>,
    exclude: Vec<glob::Pattern>,
    predicate: Option<FilterPredicate>,
}

impl TreeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only files matching at least one include pattern.
    pub fn include(mut self, pattern: &str) -> FerryResult<Self> {
        self.include.push(parse_pattern(pattern)?);
        Ok(self)
    }

    /// Drop files matching any exclude pattern, applied after includes.
    pub fn exclude(mut self, pattern: &str) -> FerryResult<Self> {
        self.exclude.push(parse_pattern(pattern)?);
        Ok(self)
    }

    /// Drop files for which the predicate returns false.
    pub fn predicate<F>(mut self, f: F) -> Self
    where
        F: Fn(&NodeMetadata, &str) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(f));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty() && self.predicate.is_none()
    }

    /// Why `rel` is dropped from the copy, or `None` to keep it.
    pub(crate) async fn rejection(&self, node: &Node, rel: &str) -> FerryResult<Option<String>> {
        if !self.include.is_empty() && !self.include.iter().any(|p| pattern_hits(p, rel)) {
            return Ok(Some("not included".to_string()));
        }
        if let Some(p) = self.exclude.iter().find(|p| pattern_hits(p, rel)) {
            return Ok(Some(format!("excluded: {}", p.as_str())));
        }
        if let Some(predicate) = &self.predicate {
            let meta = resolver::resolve(node).await?;
            let kept = catch_unwind(AssertUnwindSafe(|| predicate(&meta, rel))).unwrap_or(false);
            if !kept {
                return Ok(Some("filtered out".to_string()));
            }
        }
        Ok(None)
    }
}

impl std::fmt::Debug for TreeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeFilter")
            .field("include", &self.include)
            .field("exclude", &self.exclude)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

fn parse_pattern(pattern: &str) -> FerryResult<glob::Pattern> {
    glob::Pattern::new(pattern)
        .map_err(|e| FerryError::InvalidConfig(format!("bad glob pattern '{}': {}", pattern, e)))
}

fn pattern_hits(pattern: &glob::Pattern, rel: &str) -> bool {
    if pattern.as_str().contains('/') {
        pattern.matches(rel)
    } else {
        let name = rel.rsplit('/').next().unwrap_or(rel);
        pattern.matches(name)
    }
}
