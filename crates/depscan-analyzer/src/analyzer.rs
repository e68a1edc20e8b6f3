//! The analysis orchestrator

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use depscan_core::{
    CoreError, DependencyEdge, GraphStore, MatchStrategy, Settings, SnapshotCache, SnapshotKey,
    repository_name, to_dot,
};
use depscan_git::{GitBackend, GitError, RepositoryProvider};
use depscan_matcher::{CancelFlag, DoubleScan, Matcher, MatcherPool, RunStats, list_files};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::demo::{DemoSize, demo_graph};
use crate::error::{AnalyzerError, AnalyzerResult};

/// Result of one successful analysis.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub repository: String,
    pub version: String,
    pub snapshot: PathBuf,
    pub vertices: usize,
    pub edges: usize,
    pub stats: RunStats,
}

/// Per-repository entry of a batch analysis.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub repository: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<AnalysisReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Sequences checkout, crawl, one matcher run and persistence.
///
/// Runs share one [`GraphStore`]. `graph_lock` is held from the store reset
/// until the snapshot is written (or read back), and checkouts of the same
/// repository are serialized through `repo_locks`. Lock order is always
/// repository first, then graph.
pub struct Analyzer {
    provider: Arc<dyn RepositoryProvider>,
    matcher: Box<dyn Matcher>,
    store: Arc<GraphStore>,
    cache: SnapshotCache,
    graph_lock: Mutex<()>,
    repo_locks: DashMap<String, Arc<Mutex<()>>>,
    active_run: Mutex<Option<CancelFlag>>,
    runs: AtomicUsize,
    shut_down: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Analyzer {
    /// Analyzer over the git repositories in `settings.repository_directory`.
    pub fn new(settings: &Settings) -> AnalyzerResult<Self> {
        let provider = Arc::new(GitBackend::new(settings.repository_directory.clone()));
        Self::with_provider(settings, provider)
    }

    pub fn with_provider(
        settings: &Settings,
        provider: Arc<dyn RepositoryProvider>,
    ) -> AnalyzerResult<Self> {
        let matcher: Box<dyn Matcher> = match settings.strategy {
            MatchStrategy::Streaming => Box::new(MatcherPool::new(
                settings.threads,
                settings.round_timeout(),
            )?),
            MatchStrategy::DoubleScan => Box::new(DoubleScan),
        };
        info!(
            "Analyzer ready: {} strategy, snapshots in {}",
            matcher.name(),
            settings.analysis_directory.display()
        );

        Ok(Self {
            provider,
            matcher,
            store: Arc::new(GraphStore::new()),
            cache: SnapshotCache::new(settings.analysis_directory.clone()),
            graph_lock: Mutex::new(()),
            repo_locks: DashMap::new(),
            active_run: Mutex::new(None),
            runs: AtomicUsize::new(0),
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn provider(&self) -> &Arc<dyn RepositoryProvider> {
        &self.provider
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    pub fn strategy(&self) -> &'static str {
        self.matcher.name()
    }

    /// Matcher runs started since construction.
    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> AnalyzerResult<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(AnalyzerError::ShutDown);
        }
        Ok(())
    }

    fn repo_lock(&self, repo: &str) -> Arc<Mutex<()>> {
        Arc::clone(&self.repo_locks.entry(repo.to_string()).or_default())
    }

    /// Analyse the repository checked out at `repository_path` at `version`
    /// (its current HEAD when `None`) and persist the graph under
    /// `(repository name, version)`.
    pub fn analyse(
        &self,
        repository_path: &Path,
        version: Option<&str>,
    ) -> AnalyzerResult<AnalysisReport> {
        self.ensure_running()?;
        let repo = repository_name(repository_path);
        let repo_lock = self.repo_lock(&repo);
        let _checkout = lock(&repo_lock);

        let version = match version {
            Some(version) => version.to_string(),
            None => self.provider.current_commit(&repo)?,
        };
        info!("Analysing {} at {}", repo, version);
        self.provider.checkout(&repo, &version)?;
        let files = list_files(repository_path)?;

        let _graph = lock(&self.graph_lock);
        self.ensure_running()?;
        let cancel = CancelFlag::new();
        *lock(&self.active_run) = Some(cancel.clone());
        self.runs.fetch_add(1, Ordering::SeqCst);
        let outcome = self.matcher.run(files, &self.store, &cancel);
        *lock(&self.active_run) = None;
        let stats = outcome?;

        let key = SnapshotKey::new(repo.as_str(), version.as_str());
        let snapshot = self.store.serialize(&self.cache, &key)?;
        info!("Snapshot for {} written to {}", key, snapshot.display());

        Ok(AnalysisReport {
            repository: repo,
            version,
            snapshot,
            vertices: self.store.vertex_count(),
            edges: self.store.edge_count(),
            stats,
        })
    }

    /// Analyse every local repository at its current HEAD. A failing
    /// repository is logged and reported; the batch carries on.
    pub fn analyse_all(&self) -> AnalyzerResult<Vec<BatchOutcome>> {
        self.ensure_running()?;
        let repositories = self.provider.list_local_repositories()?;
        info!("Analysing {} local repositories", repositories.len());

        let mut outcomes = Vec::with_capacity(repositories.len());
        for repo in repositories {
            let path = self.provider.repository_path(&repo);
            match self.analyse(&path, None) {
                Ok(report) => outcomes.push(BatchOutcome {
                    repository: repo,
                    report: Some(report),
                    error: None,
                }),
                Err(AnalyzerError::ShutDown) => return Err(AnalyzerError::ShutDown),
                Err(e) => {
                    warn!("Analysis of {} failed: {}", repo, e);
                    outcomes.push(BatchOutcome {
                        repository: repo,
                        report: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
        info!(
            "Batch analysis finished: {} succeeded, {} failed",
            outcomes.len() - failed,
            failed
        );
        Ok(outcomes)
    }

    /// Edges of the graph for `(repo, version)`. A cache miss analyses the
    /// repository once, then reads the fresh snapshot back.
    pub fn query(&self, repo: &str, version: &str) -> AnalyzerResult<Vec<DependencyEdge>> {
        if repo.is_empty() || repo == "." || repo == ".." || repo.contains(['/', '\\']) {
            return Err(GitError::InvalidName(repo.to_string()).into());
        }
        let key = SnapshotKey::new(repo, version);
        if let Some(edges) = self.read_back(&key)? {
            debug!("Snapshot cache hit for {}", key);
            return Ok(edges);
        }

        info!("No snapshot for {}, analysing", key);
        self.analyse(&self.provider.repository_path(repo), Some(version))?;
        self.read_back(&key)?
            .ok_or_else(|| AnalyzerError::SnapshotMissing {
                key: key.to_string(),
            })
    }

    fn read_back(&self, key: &SnapshotKey) -> AnalyzerResult<Option<Vec<DependencyEdge>>> {
        let _graph = lock(&self.graph_lock);
        let loaded = match self.store.deserialize(&self.cache, key) {
            Ok(loaded) => loaded,
            Err(e @ CoreError::MalformedSnapshot { .. }) => {
                warn!("Discarding unreadable snapshot {}: {}", key, e);
                self.cache.invalidate(key).map_err(CoreError::from)?;
                false
            }
            Err(e) => return Err(e.into()),
        };
        if !loaded {
            return Ok(None);
        }
        let mut edges = Vec::with_capacity(self.store.edge_count());
        for vertex in self.store.vertices() {
            edges.extend(self.store.outgoing_edges(&vertex));
        }
        Ok(Some(edges))
    }

    /// Load a synthetic ring graph into the store, persist it as
    /// `demo_<size>` and return its DOT text.
    pub fn visualize_demo(&self, size: DemoSize) -> AnalyzerResult<String> {
        self.ensure_running()?;
        let graph = demo_graph(size);
        let dot = to_dot(&graph);

        let _graph = lock(&self.graph_lock);
        self.store.replace(graph);
        let key = SnapshotKey::new("demo", size.name());
        let path = self.store.serialize(&self.cache, &key)?;
        info!("Demo graph ({}) written to {}", size, path.display());
        Ok(dot)
    }

    /// Remove every persisted snapshot.
    pub fn clear_cache(&self) -> AnalyzerResult<()> {
        let _graph = lock(&self.graph_lock);
        self.cache.clear().map_err(CoreError::from)?;
        info!("Cleared snapshot cache {}", self.cache.dir().display());
        Ok(())
    }

    /// Cancel the in-flight run, refuse new ones and stop the matcher.
    /// Idempotent.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(cancel) = lock(&self.active_run).as_ref() {
            cancel.cancel();
        }
        self.matcher.shutdown();
        info!("Analyzer shut down");
    }
}

impl Drop for Analyzer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
