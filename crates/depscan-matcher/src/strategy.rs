//! The matcher contract shared by every strategy

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use depscan_core::{GraphStore, base_name, stem};
use serde::Serialize;

use crate::cancel::CancelFlag;
use crate::error::MatchResult;
use crate::word::StemPattern;

/// The ordered, immutable file list of one run, with the per-file data every
/// worker needs precomputed once.
#[derive(Debug)]
pub struct FileSet {
    paths: Vec<PathBuf>,
    base_names: Vec<String>,
    patterns: Vec<StemPattern>,
}

impl FileSet {
    pub fn new(paths: Vec<PathBuf>) -> MatchResult<Self> {
        let base_names = paths.iter().map(|p| base_name(p)).collect();
        let patterns = paths
            .iter()
            .map(|p| StemPattern::new(&stem(p)))
            .collect::<MatchResult<Vec<_>>>()?;
        Ok(Self {
            paths,
            base_names,
            patterns,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn path(&self, index: usize) -> &Path {
        &self.paths[index]
    }

    pub fn base_name(&self, index: usize) -> &str {
        &self.base_names[index]
    }

    pub fn pattern(&self, index: usize) -> &StemPattern {
        &self.patterns[index]
    }
}

/// Counters reported by a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub files: usize,
    pub lines: usize,
    pub edges: usize,
    pub elapsed_ms: u64,
}

impl RunStats {
    pub(crate) fn finish(mut self, started: Instant) -> Self {
        self.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self
    }
}

/// A way of filling a [`GraphStore`] with the dependency edges of a file list.
pub trait Matcher: Send + Sync {
    /// Short strategy name for logs.
    fn name(&self) -> &'static str;

    /// Scan `files` into `store`, which is empty on entry.
    fn scan(
        &self,
        files: Arc<FileSet>,
        store: &Arc<GraphStore>,
        cancel: &CancelFlag,
    ) -> MatchResult<RunStats>;

    /// Release long-lived resources. Later runs may fail.
    fn shutdown(&self) {}

    /// Reset `store`, run one full scan over `paths`, and guarantee that a
    /// failed run leaves the store empty rather than half-populated.
    fn run(
        &self,
        paths: Vec<PathBuf>,
        store: &Arc<GraphStore>,
        cancel: &CancelFlag,
    ) -> MatchResult<RunStats> {
        let started = Instant::now();
        store.reset();
        let files = Arc::new(FileSet::new(paths)?);
        tracing::info!("Matching {} files with the {} strategy", files.len(), self.name());

        match self.scan(files, store, cancel) {
            Ok(stats) => {
                let stats = stats.finish(started);
                tracing::info!(
                    "Matched {} files, {} lines, {} edges in {:?}",
                    stats.files,
                    stats.lines,
                    stats.edges,
                    Duration::from_millis(stats.elapsed_ms)
                );
                Ok(stats)
            }
            Err(e) => {
                store.reset();
                tracing::error!("Matcher run aborted: {}", e);
                Err(e)
            }
        }
    }
}

/// Check one line of file `dependent` against the remaining `candidates`.
///
/// Every candidate whose stem occurs in `line` is removed, so later lines of
/// the same file skip it; the matched candidates other than `dependent`
/// itself are appended to `staged`.
pub(crate) fn match_line(
    files: &FileSet,
    dependent: usize,
    line: &str,
    candidates: &mut Vec<usize>,
    staged: &mut Vec<usize>,
) {
    candidates.retain(|&candidate| {
        if !files.pattern(candidate).is_match(line) {
            return true;
        }
        if candidate != dependent {
            staged.push(candidate);
        }
        false
    });
}

/// Commit staged dependencies of `dependent` in one critical section.
///
/// Nothing is written once the store has moved past `generation`, i.e. after
/// the run that staged the edges was reset.
pub(crate) fn commit(
    files: &FileSet,
    dependent: usize,
    staged: &[usize],
    store: &GraphStore,
    generation: u64,
) -> usize {
    if staged.is_empty() {
        return 0;
    }
    let target = files.base_name(dependent);
    store
        .add_edges_if(
            generation,
            staged.iter().map(|&dependency| (files.base_name(dependency), target)),
        )
        .unwrap_or(0)
}
