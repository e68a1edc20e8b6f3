//! Orchestrator tests with a scripted provider and with real git repositories

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use depscan_core::{DependencyEdge, MatchStrategy, Settings};
use depscan_git::{GitBackend, GitError, GitResult, RepositoryProvider};
use depscan_matcher::list_immediate_subdirectories;
use tempfile::TempDir;

use crate::*;

const HEAD: &str = "abc123";

/// Plain directories standing in for repositories. Every repository is at
/// [`HEAD`]; names starting with `broken` have no commits.
struct ScriptedProvider {
    root: PathBuf,
    checkouts: AtomicUsize,
}

impl ScriptedProvider {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            checkouts: AtomicUsize::new(0),
        }
    }

    fn require(&self, repo: &str) -> GitResult<()> {
        if !self.root.join(repo).is_dir() {
            return Err(GitError::RepositoryNotFound {
                name: repo.to_string(),
                root: self.root.clone(),
            });
        }
        if repo.starts_with("broken") {
            return Err(GitError::EmptyRepository(repo.to_string()));
        }
        Ok(())
    }
}

impl RepositoryProvider for ScriptedProvider {
    fn repository_path(&self, repo: &str) -> PathBuf {
        self.root.join(repo)
    }

    fn checkout(&self, repo: &str, _version: &str) -> GitResult<()> {
        self.require(repo)?;
        self.checkouts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn current_commit(&self, repo: &str) -> GitResult<String> {
        self.require(repo)?;
        Ok(HEAD.to_string())
    }

    fn commit_log(&self, repo: &str, _: Option<&str>, _: usize, _: bool) -> GitResult<Vec<String>> {
        self.require(repo)?;
        Ok(vec![HEAD.to_string()])
    }

    fn fetch_all(&self, repo: &str) -> GitResult<()> {
        self.require(repo)
    }

    fn list_local_repositories(&self) -> GitResult<Vec<String>> {
        Ok(list_immediate_subdirectories(&self.root)?)
    }

    fn download(&self, _url: &str) -> GitResult<String> {
        Ok("Repository downloaded successfully!".to_string())
    }

    fn delete(&self) -> GitResult<String> {
        Ok("All repositories have been deleted.".to_string())
    }
}

fn write_files(dir: &Path, files: &[(&str, &str)]) {
    for (rel, content) in files {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
}

fn settings(root: &Path, strategy: MatchStrategy) -> Settings {
    Settings {
        repository_directory: root.join("repositories"),
        analysis_directory: root.join("analysis"),
        threads: 3,
        strategy,
        round_timeout_secs: 10,
        ..Settings::default()
    }
}

struct Fixture {
    dir: TempDir,
    provider: Arc<ScriptedProvider>,
    analyzer: Analyzer,
}

fn fixture(strategy: MatchStrategy) -> Fixture {
    let dir = TempDir::new().unwrap();
    let settings = settings(dir.path(), strategy);
    write_files(
        &settings.repository_directory.join("app"),
        &[
            ("util.py", ""),
            ("main.py", "import util\n"),
            ("utility.py", "this mentions utility directly"),
        ],
    );
    write_files(
        &settings.repository_directory.join("lib"),
        &[("core.rs", "pub fn run() {}\n"), ("api.rs", "use crate::core;\n")],
    );

    let provider = Arc::new(ScriptedProvider::new(&settings.repository_directory));
    let analyzer = Analyzer::with_provider(&settings, provider.clone()).unwrap();
    Fixture {
        dir,
        provider,
        analyzer,
    }
}

fn edge_set(edges: &[DependencyEdge]) -> BTreeSet<(String, String)> {
    edges
        .iter()
        .map(|e| (e.source.clone(), e.target.clone()))
        .collect()
}

#[test]
fn test_query_runs_once_then_hits_cache() {
    let f = fixture(MatchStrategy::Streaming);

    let edges = f.analyzer.query("app", HEAD).unwrap();
    assert_eq!(edges, vec![DependencyEdge::import("util.py", "main.py")]);
    assert_eq!(f.analyzer.run_count(), 1);
    assert_eq!(f.provider.checkouts.load(Ordering::SeqCst), 1);

    let again = f.analyzer.query("app", HEAD).unwrap();
    assert_eq!(again, edges);
    assert_eq!(f.analyzer.run_count(), 1);
    assert_eq!(f.provider.checkouts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unreadable_snapshot_is_rebuilt() {
    let f = fixture(MatchStrategy::Streaming);
    let analysis = f.dir.path().join("analysis");
    std::fs::create_dir_all(&analysis).unwrap();
    std::fs::write(
        analysis.join(format!("app_{HEAD}.gv")),
        "strict digraph G {\n  1 [ label=\"evil\n",
    )
    .unwrap();

    let edges = f.analyzer.query("app", HEAD).unwrap();
    assert_eq!(edges, vec![DependencyEdge::import("util.py", "main.py")]);
    assert_eq!(f.analyzer.run_count(), 1);

    f.analyzer.query("app", HEAD).unwrap();
    assert_eq!(f.analyzer.run_count(), 1);
}

#[test]
fn test_analyse_defaults_to_current_commit() {
    let f = fixture(MatchStrategy::Streaming);
    let path = f.dir.path().join("repositories").join("app");

    let report = f.analyzer.analyse(&path, None).unwrap();
    assert_eq!(report.repository, "app");
    assert_eq!(report.version, HEAD);
    assert_eq!(report.edges, 1);
    assert_eq!(report.vertices, 2);
    assert_eq!(report.stats.files, 3);
    assert_eq!(
        report.snapshot,
        f.dir.path().join("analysis").join("app_abc123.gv")
    );
    assert!(report.snapshot.is_file());
}

#[test]
fn test_batch_reports_partial_success() {
    let f = fixture(MatchStrategy::Streaming);
    write_files(
        &f.dir.path().join("repositories").join("broken-repo"),
        &[("a.txt", "")],
    );

    let outcomes = f.analyzer.analyse_all().unwrap();
    let summary: Vec<(&str, bool)> = outcomes
        .iter()
        .map(|o| (o.repository.as_str(), o.succeeded()))
        .collect();
    assert_eq!(summary, vec![("app", true), ("broken-repo", false), ("lib", true)]);

    let cache = f.analyzer.cache();
    assert!(cache.contains(&depscan_core::SnapshotKey::new("app", HEAD)));
    assert!(cache.contains(&depscan_core::SnapshotKey::new("lib", HEAD)));

    let failed = serde_json::to_value(&outcomes[1]).unwrap();
    assert!(failed.get("report").is_none());
    assert!(failed["error"].as_str().unwrap().contains("broken-repo"));
}

#[test]
fn test_unknown_repository_is_a_client_error() {
    let f = fixture(MatchStrategy::DoubleScan);

    let err = f.analyzer.query("ghost", HEAD).unwrap_err();
    assert!(matches!(err, AnalyzerError::Git(GitError::RepositoryNotFound { .. })));
    assert!(err.is_client_error());
    assert_eq!(f.analyzer.run_count(), 0);

    let err = f.analyzer.query("../app", HEAD).unwrap_err();
    assert!(matches!(err, AnalyzerError::Git(GitError::InvalidName(_))));
}

#[test]
fn test_strategies_agree() {
    let streaming = fixture(MatchStrategy::Streaming);
    let sequential = fixture(MatchStrategy::DoubleScan);
    assert_eq!(streaming.analyzer.strategy(), "streaming");
    assert_eq!(sequential.analyzer.strategy(), "double-scan");

    for repo in ["app", "lib"] {
        assert_eq!(
            edge_set(&streaming.analyzer.query(repo, HEAD).unwrap()),
            edge_set(&sequential.analyzer.query(repo, HEAD).unwrap()),
        );
    }
}

#[test]
fn test_demo_graph_is_persisted_and_queryable() {
    let f = fixture(MatchStrategy::DoubleScan);

    let dot = f.analyzer.visualize_demo(DemoSize::Small).unwrap();
    assert!(dot.starts_with("strict digraph G {"));
    assert!(dot.contains(r#"label="D""#));

    let edges = f.analyzer.query("demo", "small").unwrap();
    assert_eq!(edges.len(), 4);
    assert_eq!(f.analyzer.run_count(), 0);

    f.analyzer.clear_cache().unwrap();
    assert!(!f.analyzer.cache().dir().exists());
}

#[test]
fn test_shutdown_refuses_new_work() {
    let f = fixture(MatchStrategy::Streaming);
    f.analyzer.shutdown();
    f.analyzer.shutdown();

    let path = f.dir.path().join("repositories").join("app");
    assert!(matches!(f.analyzer.analyse(&path, None), Err(AnalyzerError::ShutDown)));
    assert!(matches!(f.analyzer.analyse_all(), Err(AnalyzerError::ShutDown)));
}

mod git {
    use super::*;
    use git2::{Commit, Oid, Repository, Signature, Time};

    fn commit_all(repo: &Repository, files: &[(&str, &str)], seq: i64) -> Oid {
        write_files(repo.workdir().unwrap(), files);
        let mut index = repo.index().unwrap();
        for (rel, _) in files {
            index.add_path(Path::new(rel)).unwrap();
        }
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let signature = Signature::new(
            "depscan",
            "depscan@example.com",
            &Time::new(1_700_000_000 + seq * 60, 0),
        )
        .unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &signature, &signature, "change", &tree, &parents)
            .unwrap()
    }

    #[test]
    fn test_versions_are_analysed_independently() {
        let dir = TempDir::new().unwrap();
        let settings = settings(dir.path(), MatchStrategy::Streaming);
        let repo = Repository::init(settings.repository_directory.join("proj")).unwrap();
        let first = commit_all(&repo, &[("util.py", ""), ("main.py", "import util\n")], 1);
        let second = commit_all(&repo, &[("cli.py", "from main import run\n")], 2);

        let analyzer = Analyzer::new(&settings).unwrap();
        let old = analyzer.query("proj", &first.to_string()).unwrap();
        let new = analyzer.query("proj", &second.to_string()).unwrap();

        assert_eq!(
            edge_set(&old),
            BTreeSet::from([("util.py".to_string(), "main.py".to_string())])
        );
        assert_eq!(
            edge_set(&new),
            BTreeSet::from([
                ("main.py".to_string(), "cli.py".to_string()),
                ("util.py".to_string(), "main.py".to_string()),
            ])
        );
        assert_eq!(analyzer.run_count(), 2);

        // batch mode analyses HEAD, which the last query left at `second`
        let outcomes = analyzer.analyse_all().unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(
            outcomes[0].report.as_ref().unwrap().version,
            second.to_string()
        );
    }

    #[test]
    fn test_git_backend_is_the_default_provider() {
        let dir = TempDir::new().unwrap();
        let settings = settings(dir.path(), MatchStrategy::DoubleScan);
        std::fs::create_dir_all(&settings.repository_directory).unwrap();
        let analyzer = Analyzer::new(&settings).unwrap();

        assert_eq!(
            analyzer.provider().repository_path("x"),
            GitBackend::new(settings.repository_directory.clone()).repository_path("x")
        );
        assert!(analyzer.analyse_all().unwrap().is_empty());
    }
}
