//! Matcher error types.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for matcher runs.
pub type MatchResult<T> = Result<T, MatchError>;

/// Failures that abort a matcher run. None of them leave a partial graph
/// behind: the store is reset before the error is returned.
#[derive(Debug, Error)]
pub enum MatchError {
    /// A crawled file could not be opened or read mid-scan.
    #[error("Failed to read {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The directory to analyse could not be enumerated.
    #[error("Failed to list files under {path}: {message}")]
    Crawl { path: PathBuf, message: String },

    /// A stem could not be compiled into a whole-word pattern.
    #[error("Invalid pattern for stem `{stem}`: {source}")]
    Pattern {
        stem: String,
        #[source]
        source: regex::Error,
    },

    /// The worker pool lost lock-step.
    #[error("Concurrency fault: {0}")]
    Concurrency(#[from] ConcurrencyFault),

    /// The run was cancelled through its [`crate::CancelFlag`].
    #[error("Matcher run cancelled")]
    Cancelled,

    /// The pool has been shut down and accepts no more runs.
    #[error("Matcher pool is shut down")]
    PoolShutDown,

    /// A worker thread could not be started.
    #[error("Failed to spawn matcher worker: {0}")]
    Spawn(#[source] std::io::Error),
}

impl MatchError {
    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileAccess {
            path: path.into(),
            source,
        }
    }

    pub fn is_concurrency_fault(&self) -> bool {
        matches!(self, MatchError::Concurrency(_))
    }
}

/// Conditions that would otherwise leave the round barrier unsatisfied.
#[derive(Debug, Error)]
pub enum ConcurrencyFault {
    /// A worker reported an error or panicked while handling a round.
    #[error("worker {worker} failed: {message}")]
    WorkerFailed { worker: usize, message: String },

    /// A worker's command channel is closed; its thread is gone.
    #[error("worker {worker} is no longer running")]
    WorkerLost { worker: usize },

    /// Not every worker finished the round in time.
    #[error("round timed out after {timeout:?} with {pending} worker(s) outstanding")]
    RoundTimeout { timeout: Duration, pending: usize },
}
