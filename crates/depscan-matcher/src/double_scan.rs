//! Sequential matcher: every file against every candidate, on the caller's thread

use std::sync::Arc;

use depscan_core::GraphStore;

use crate::cancel::CancelFlag;
use crate::error::{MatchError, MatchResult};
use crate::lines::LossyLines;
use crate::strategy::{FileSet, Matcher, RunStats, commit, match_line};

/// O(F²) double loop without threads or rounds. Produces exactly the edge set
/// of [`crate::MatcherPool`] and is the cheaper choice for small trees.
#[derive(Debug, Default, Clone, Copy)]
pub struct DoubleScan;

impl Matcher for DoubleScan {
    fn name(&self) -> &'static str {
        "double-scan"
    }

    fn scan(
        &self,
        files: Arc<FileSet>,
        store: &Arc<GraphStore>,
        cancel: &CancelFlag,
    ) -> MatchResult<RunStats> {
        let mut stats = RunStats::default();
        let mut staged = Vec::new();
        let generation = store.generation();

        for dependent in 0..files.len() {
            let path = files.path(dependent);
            tracing::debug!("Scanning {}", path.display());
            let lines = LossyLines::open(path).map_err(|e| MatchError::file_access(path, e))?;
            let mut candidates: Vec<usize> = (0..files.len()).collect();

            for line in lines {
                if cancel.is_cancelled() {
                    return Err(MatchError::Cancelled);
                }
                let line = line.map_err(|e| MatchError::file_access(path, e))?;
                stats.lines += 1;
                if candidates.is_empty() {
                    continue;
                }

                staged.clear();
                match_line(&files, dependent, &line, &mut candidates, &mut staged);
                stats.edges += commit(&files, dependent, &staged, store, generation);
            }
            stats.files += 1;
        }

        Ok(stats)
    }
}
