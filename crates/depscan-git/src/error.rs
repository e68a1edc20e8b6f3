//! Error types for repository operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for repository operations.
pub type GitResult<T> = Result<T, GitError>;

/// Checkout, fetch, log and clone failures. Surfaced to the caller as-is and
/// never retried.
#[derive(Debug, Error)]
pub enum GitError {
    /// No clone with this name under the repository directory.
    #[error("Repository `{name}` not found under {root}")]
    RepositoryNotFound { name: String, root: PathBuf },

    /// The name would escape the repository directory.
    #[error("Invalid repository name `{0}`")]
    InvalidName(String),

    /// The revision does not resolve to a commit.
    #[error("Unknown revision `{revision}` in {repo}: {source}")]
    UnknownRevision {
        repo: String,
        revision: String,
        #[source]
        source: git2::Error,
    },

    /// The repository has no commit to report.
    #[error("Repository `{0}` has no commits")]
    EmptyRepository(String),

    /// A clone target already exists.
    #[error("Repository directory {path} already exists")]
    AlreadyExists { path: PathBuf },

    /// The URL has no usable last path segment.
    #[error("Cannot derive a repository name from `{0}`")]
    InvalidUrl(String),

    /// Cloning failed.
    #[error("Failed to clone repository {url}: {message}")]
    CloneFailed { url: String, message: String },

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
