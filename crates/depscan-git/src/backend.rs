//! libgit2-backed repository provider

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use depscan_core::stem;
use depscan_matcher::list_immediate_subdirectories;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Repository, Sort};

use crate::error::{GitError, GitResult};
use crate::provider::RepositoryProvider;

/// Repositories cloned side by side under one root directory.
#[derive(Debug)]
pub struct GitBackend {
    root: PathBuf,
    last_downloaded: Mutex<Option<PathBuf>>,
}

impl GitBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            last_downloaded: Mutex::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn open(&self, repo: &str) -> GitResult<Repository> {
        validate_name(repo)?;
        let path = self.root.join(repo);
        if !path.is_dir() {
            return Err(GitError::RepositoryNotFound {
                name: repo.to_string(),
                root: self.root.clone(),
            });
        }
        Ok(Repository::open(&path)?)
    }
}

/// Repository names are single path components.
fn validate_name(repo: &str) -> GitResult<()> {
    if repo.is_empty() || repo == "." || repo == ".." || repo.contains(['/', '\\']) {
        return Err(GitError::InvalidName(repo.to_string()));
    }
    Ok(())
}

/// `https://host/org/name.git` -> `name`
fn name_from_url(url: &str) -> GitResult<String> {
    let segment = url
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\', ':'])
        .next()
        .unwrap_or_default();
    let name = stem(Path::new(segment));
    validate_name(&name).map_err(|_| GitError::InvalidUrl(url.to_string()))?;
    Ok(name)
}

impl RepositoryProvider for GitBackend {
    fn repository_path(&self, repo: &str) -> PathBuf {
        self.root.join(repo)
    }

    fn checkout(&self, repo: &str, version: &str) -> GitResult<()> {
        let repository = self.open(repo)?;
        let (object, reference) =
            repository
                .revparse_ext(version)
                .map_err(|source| GitError::UnknownRevision {
                    repo: repo.to_string(),
                    revision: version.to_string(),
                    source,
                })?;
        let commit = object.peel_to_commit()?;

        repository.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))?;
        match reference.as_ref().filter(|r| r.is_branch()).and_then(|r| r.name()) {
            Some(branch) => repository.set_head(branch)?,
            None => repository.set_head_detached(commit.id())?,
        }

        tracing::info!("Checked out {} at {} ({})", repo, version, commit.id());
        Ok(())
    }

    fn current_commit(&self, repo: &str) -> GitResult<String> {
        self.commit_log(repo, None, 1, false)?
            .into_iter()
            .next()
            .ok_or_else(|| GitError::EmptyRepository(repo.to_string()))
    }

    fn commit_log(
        &self,
        repo: &str,
        from: Option<&str>,
        limit: usize,
        all: bool,
    ) -> GitResult<Vec<String>> {
        let repository = self.open(repo)?;
        let mut walk = repository.revwalk()?;
        walk.set_sorting(Sort::TIME)?;

        match from {
            Some(revision) => {
                let commit = repository
                    .revparse_single(revision)
                    .and_then(|object| object.peel_to_commit())
                    .map_err(|source| GitError::UnknownRevision {
                        repo: repo.to_string(),
                        revision: revision.to_string(),
                        source,
                    })?;
                walk.push(commit.id())?;
            }
            // unborn HEAD: nothing to walk unless other refs exist
            None => match repository.head() {
                Ok(_) => walk.push_head()?,
                Err(_) if all => {}
                Err(_) => return Ok(Vec::new()),
            },
        }
        if all {
            walk.push_glob("refs/*")?;
        }

        let mut commits = Vec::new();
        for oid in walk.take(limit) {
            commits.push(oid?.to_string());
        }
        Ok(commits)
    }

    fn fetch_all(&self, repo: &str) -> GitResult<()> {
        let repository = self.open(repo)?;
        let remotes = repository.remotes()?;

        for name in remotes.iter().flatten() {
            let mut remote = repository.find_remote(name)?;
            let refspecs: Vec<String> = remote
                .fetch_refspecs()?
                .iter()
                .flatten()
                .map(str::to_string)
                .collect();
            tracing::info!("Fetching {} from remote {}", repo, name);
            remote.fetch(&refspecs, None, None)?;
        }
        Ok(())
    }

    fn list_local_repositories(&self) -> GitResult<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        Ok(list_immediate_subdirectories(&self.root)?)
    }

    fn download(&self, url: &str) -> GitResult<String> {
        let name = name_from_url(url)?;
        let target = self.root.join(&name);
        if target.exists() {
            return Err(GitError::AlreadyExists { path: target });
        }
        std::fs::create_dir_all(&self.root)?;

        tracing::info!("Cloning {} into {}", url, target.display());
        RepoBuilder::new()
            .clone(url, &target)
            .map_err(|e| GitError::CloneFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        *self
            .last_downloaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(target);
        Ok("Repository downloaded successfully!".to_string())
    }

    fn delete(&self) -> GitResult<String> {
        let mut last = self
            .last_downloaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(target) = last.take() else {
            tracing::info!("Deleting every repository under {}", self.root.display());
            if self.root.exists() {
                std::fs::remove_dir_all(&self.root)?;
            }
            std::fs::create_dir_all(&self.root)?;
            return Ok("All repositories have been deleted.".to_string());
        };

        if !target.is_dir() {
            return Ok("Repository directory not found!".to_string());
        }
        tracing::info!("Deleting repository directory {}", target.display());
        if let Err(e) = std::fs::remove_dir_all(&target) {
            tracing::error!("Failed to delete {}: {}", target.display(), e);
            *last = Some(target);
            return Err(e.into());
        }
        Ok("Repository directory deleted!".to_string())
    }
}
