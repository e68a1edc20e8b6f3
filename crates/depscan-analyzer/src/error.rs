//! Orchestrator error types.

use depscan_core::CoreError;
use depscan_git::GitError;
use depscan_matcher::MatchError;
use thiserror::Error;

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// A fresh run finished but its snapshot could not be read back.
    #[error("No snapshot for {key} after analysis")]
    SnapshotMissing { key: String },

    #[error("Unknown demo size `{0}` (expected small, medium or large)")]
    UnknownDemoSize(String),

    #[error("Analyzer is shut down")]
    ShutDown,
}

impl AnalyzerError {
    /// Failures caused by the request rather than by the service: bad
    /// repositories or revisions and unreadable trees.
    pub fn is_client_error(&self) -> bool {
        match self {
            AnalyzerError::Git(_) | AnalyzerError::UnknownDemoSize(_) => true,
            AnalyzerError::Match(e) => matches!(
                e,
                MatchError::FileAccess { .. } | MatchError::Crawl { .. }
            ),
            _ => false,
        }
    }
}
