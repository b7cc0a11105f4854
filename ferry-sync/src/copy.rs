//! Copy engine
//!
//! Single-file and tree copies across backends, with skip strategies
//! deciding what actually moves. Tree copies enumerate first and
//! transfer second, so progress totals are known up front; one item
//! failing never aborts the batch.

use ferry_core::{FerryError, FerryResult, Node, NodePath};
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::filter::TreeFilter;
use crate::skip::{SkipDecision, SkipEvaluator, SkipStrategy};

/// Observer callbacks for a copy operation
///
/// All callbacks are synchronous and may be called from the middle of a
/// batch. A panic inside `on_file`/`on_skip` is contained and charged
/// to the item being processed.
#[derive(Default)]
pub struct CopyCallbacks {
    progress: Option<Box<dyn Fn(usize, usize) + Send + Sync>>,
    on_file: Option<Box<dyn Fn(&Node) + Send + Sync>>,
    on_skip: Option<Box<dyn Fn(&Node, &str) + Send + Sync>>,
}

impl CopyCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once per completed item with `(done, total)`. `total` is
    /// the number of files in the batch and never changes mid-run.
    pub fn progress(mut self, f: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    /// Called with the destination node after each successful transfer.
    pub fn on_file(mut self, f: impl Fn(&Node) + Send + Sync + 'static) -> Self {
        self.on_file = Some(Box::new(f));
        self
    }

    /// Called with the destination node and the skip reason.
    pub fn on_skip(mut self, f: impl Fn(&Node, &str) + Send + Sync + 'static) -> Self {
        self.on_skip = Some(Box::new(f));
        self
    }

    fn fire_progress(&self, done: usize, total: usize) -> FerryResult<()> {
        match &self.progress {
            Some(cb) => contain(|| cb(done, total)),
            None => Ok(()),
        }
    }

    fn fire_file(&self, node: &Node) -> FerryResult<()> {
        match &self.on_file {
            Some(cb) => contain(|| cb(node)),
            None => Ok(()),
        }
    }

    fn fire_skip(&self, node: &Node, reason: &str) -> FerryResult<()> {
        match &self.on_skip {
            Some(cb) => contain(|| cb(node, reason)),
            None => Ok(()),
        }
    }
}

fn contain<F: FnOnce()>(f: F) -> FerryResult<()> {
    catch_unwind(AssertUnwindSafe(f))
        .map_err(|_| FerryError::TransferFailed("callback panicked".into()))
}

/// What happened to one item
#[derive(Debug)]
pub enum CopyOutcome {
    Copied,
    Skipped(String),
    Failed(FerryError),
}

/// One item of a batch report
#[derive(Debug)]
pub struct BatchItem {
    pub path: NodePath,
    pub outcome: CopyOutcome,
}

/// Per-item results of a tree copy
///
/// The call itself only fails on setup and enumeration problems; item
/// failures land here instead.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn copied(&self) -> usize {
        self.count(|o| matches!(o, CopyOutcome::Copied))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, CopyOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, CopyOutcome::Failed(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = &BatchItem> {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, CopyOutcome::Failed(_)))
    }

    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&CopyOutcome) -> bool) -> usize {
        self.items.iter().filter(|i| pred(&i.outcome)).count()
    }
}

/// Copy engine bound to one skip strategy
pub struct CopyEngine {
    evaluator: SkipEvaluator,
}

impl CopyEngine {
    pub fn new(strategy: SkipStrategy) -> Self {
        Self {
            evaluator: SkipEvaluator::new(strategy),
        }
    }

    /// Copy a file or a whole tree, dispatching on what `source` is.
    /// A missing source is an error here, not a report entry.
    pub async fn copy(
        &self,
        source: &Node,
        dest: &Node,
        callbacks: &CopyCallbacks,
    ) -> FerryResult<BatchReport> {
        let info = source.backend().stat(&source.relative()).await?;
        if info.is_dir {
            self.copy_tree(source, dest, callbacks).await
        } else {
            let outcome = self.copy_file(source, dest, callbacks).await?;
            Ok(BatchReport {
                items: vec![BatchItem {
                    path: source.path().clone(),
                    outcome,
                }],
            })
        }
    }

    /// Copy a single file. `NotAFile` when `source` is a directory.
    pub async fn copy_file(
        &self,
        source: &Node,
        dest: &Node,
        callbacks: &CopyCallbacks,
    ) -> FerryResult<CopyOutcome> {
        let info = source.backend().stat(&source.relative()).await?;
        if info.is_dir {
            return Err(FerryError::NotAFile(source.address()));
        }
        let outcome = self.transfer(source, dest, callbacks).await?;
        callbacks.fire_progress(1, 1)?;
        Ok(outcome)
    }

    /// Copy a directory tree.
    ///
    /// Phase one enumerates the full source tree (children sorted per
    /// directory) and mirrors the directory shape at the destination,
    /// empty directories included. Phase two transfers the files, with
    /// per-item fault isolation: a failure is recorded in the report and
    /// the batch continues. Enumeration and directory-creation failures
    /// abort the whole call instead.
    pub async fn copy_tree(
        &self,
        source: &Node,
        dest: &Node,
        callbacks: &CopyCallbacks,
    ) -> FerryResult<BatchReport> {
        self.copy_tree_filtered(source, dest, &TreeFilter::default(), callbacks)
            .await
    }

    /// [`copy_tree`] narrowed by a [`TreeFilter`]. Files the filter
    /// rejects stay in the report as skipped items with the rejection
    /// reason; directories are mirrored regardless of the filter.
    ///
    /// [`copy_tree`]: CopyEngine::copy_tree
    pub async fn copy_tree_filtered(
        &self,
        source: &Node,
        dest: &Node,
        filter: &TreeFilter,
        callbacks: &CopyCallbacks,
    ) -> FerryResult<BatchReport> {
        let info = source.backend().stat(&source.relative()).await?;
        if !info.is_dir {
            return Err(FerryError::NotADirectory(source.address()));
        }
        dest.mkdir().await?;

        let mut dirs: Vec<String> = Vec::new();
        let mut files: Vec<String> = Vec::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        queue.push_back(String::new());
        while let Some(rel) = queue.pop_front() {
            let dir = descend(source, &rel);
            let mut entries = dir.backend().list(&dir.relative()).await?;
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            for entry in entries {
                let child_rel = if rel.is_empty() {
                    entry.name
                } else {
                    format!("{}/{}", rel, entry.name)
                };
                if entry.is_dir {
                    dirs.push(child_rel.clone());
                    queue.push_back(child_rel);
                } else {
                    files.push(child_rel);
                }
            }
        }

        for rel in &dirs {
            descend(dest, rel).mkdir().await?;
        }

        let total = files.len();
        tracing::debug!(
            source = %source.address(),
            dest = %dest.address(),
            files = total,
            dirs = dirs.len(),
            "tree copy starting"
        );

        let mut report = BatchReport::default();
        for (index, rel) in files.iter().enumerate() {
            let src = descend(source, rel);
            let dst = descend(dest, rel);
            let outcome = match filter.rejection(&src, rel).await {
                Ok(Some(reason)) => match callbacks.fire_skip(&dst, &reason) {
                    Ok(()) => CopyOutcome::Skipped(reason),
                    Err(e) => CopyOutcome::Failed(e),
                },
                Ok(None) => match self.transfer(&src, &dst, callbacks).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::warn!(item = %src.address(), error = %e, "item failed");
                        CopyOutcome::Failed(e)
                    }
                },
                Err(e) => CopyOutcome::Failed(e),
            };
            report.items.push(BatchItem {
                path: src.path().clone(),
                outcome,
            });
            if let Err(e) = callbacks.fire_progress(index + 1, total) {
                // A faulty progress observer is charged to this item,
                // never aborts the batch
                if let Some(last) = report.items.last_mut() {
                    if !matches!(last.outcome, CopyOutcome::Failed(_)) {
                        last.outcome = CopyOutcome::Failed(e);
                    }
                }
            }
        }
        Ok(report)
    }

    /// Move a file or tree. Within one backend this is a rename; across
    /// backends it is a clean copy followed by source deletion. A copy
    /// with any failed item leaves the source untouched.
    pub async fn move_node(&self, source: &Node, dest: &Node) -> FerryResult<()> {
        if source.backend().id() == dest.backend().id()
            && source.backend().capabilities().rename
        {
            if let Some(parent) = dest.path().parent() {
                if !parent.is_root() {
                    dest.backend().mkdir_if_absent(&parent.relative()).await?;
                }
            }
            return source
                .backend()
                .rename(&source.relative(), &dest.relative())
                .await;
        }

        let report = self.copy(source, dest, &CopyCallbacks::new()).await?;
        if !report.is_clean() {
            return Err(FerryError::TransferFailed(format!(
                "move {} -> {}: {} of {} items failed, source kept",
                source,
                dest,
                report.failed(),
                report.items.len()
            )));
        }
        let recursive = source.is_dir().await?;
        source.delete(recursive).await
    }

    async fn transfer(
        &self,
        source: &Node,
        dest: &Node,
        callbacks: &CopyCallbacks,
    ) -> FerryResult<CopyOutcome> {
        match self.evaluator.evaluate(source, dest).await? {
            SkipDecision::Skip(reason) => {
                tracing::debug!(item = %source.address(), reason = %reason, "skipped");
                callbacks.fire_skip(dest, &reason)?;
                Ok(CopyOutcome::Skipped(reason))
            }
            SkipDecision::Copy => {
                let size_hint = source.size().await.ok();
                let stream = source.read_stream().await?;
                dest.write_stream(stream, size_hint).await.map_err(|e| {
                    match e {
                        e @ FerryError::NotFound(_) => e,
                        other => FerryError::TransferFailed(format!(
                            "{} -> {}: {}",
                            source, dest, other
                        )),
                    }
                })?;
                callbacks.fire_file(dest)?;
                Ok(CopyOutcome::Copied)
            }
        }
    }
}

fn descend(node: &Node, rel: &str) -> Node {
    if rel.is_empty() {
        return node.clone();
    }
    rel.split('/').fold(node.clone(), |n, part| n.child(part))
}
