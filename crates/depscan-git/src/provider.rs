//! The repository provider seam

use std::path::PathBuf;

use crate::error::GitResult;

/// Everything the analyzer and the HTTP layer need from version control.
///
/// Repositories are addressed by name: the directory name of the clone under
/// the provider's root.
pub trait RepositoryProvider: Send + Sync {
    /// Working tree of `repo`.
    fn repository_path(&self, repo: &str) -> PathBuf;

    /// Force the working tree of `repo` to `version` (commit id, branch, tag
    /// or any other revision expression).
    fn checkout(&self, repo: &str, version: &str) -> GitResult<()>;

    /// Commit id HEAD currently points at.
    fn current_commit(&self, repo: &str) -> GitResult<String>;

    /// Commit ids reachable from `from` (HEAD when `None`), newest first, at
    /// most `limit` of them. With `all`, every ref is a starting point too.
    fn commit_log(
        &self,
        repo: &str,
        from: Option<&str>,
        limit: usize,
        all: bool,
    ) -> GitResult<Vec<String>>;

    /// The complete log over all refs.
    fn log_all(&self, repo: &str) -> GitResult<Vec<String>> {
        self.commit_log(repo, None, usize::MAX, true)
    }

    /// Fetch every configured remote of `repo`.
    fn fetch_all(&self, repo: &str) -> GitResult<()>;

    /// Names of the repositories available locally, sorted.
    fn list_local_repositories(&self) -> GitResult<Vec<String>>;

    /// Clone a public repository; returns a status message.
    fn download(&self, url: &str) -> GitResult<String>;

    /// Delete the most recently downloaded repository, or every repository
    /// when nothing has been downloaded by this provider. Returns a status
    /// message.
    fn delete(&self) -> GitResult<String>;
}
