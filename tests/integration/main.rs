//! Integration tests for depscan
//!
//! These tests drive the built binary and the library crates together.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use git2::{Commit, Repository, Signature, Time};
use tempfile::TempDir;

fn depscan(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_depscan"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute depscan")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// `<root>/repositories/proj` with one commit; returns the commit id.
fn create_repository(root: &Path) -> String {
    let repo = Repository::init(root.join("repositories").join("proj")).unwrap();
    let workdir = repo.workdir().unwrap().to_path_buf();
    std::fs::write(workdir.join("util.py"), "").unwrap();
    std::fs::write(workdir.join("main.py"), "import util\n").unwrap();
    std::fs::write(workdir.join("utility.py"), "this mentions utility directly").unwrap();

    let mut index = repo.index().unwrap();
    for file in ["util.py", "main.py", "utility.py"] {
        index.add_path(Path::new(file)).unwrap();
    }
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let signature =
        Signature::new("depscan", "depscan@example.com", &Time::new(1_700_000_000, 0)).unwrap();
    let parents: [&Commit; 0] = [];
    repo.commit(Some("HEAD"), &signature, &signature, "init", &tree, &parents)
        .unwrap()
        .to_string()
}

fn dir_arg(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_invocation() {
    let output = depscan(&["--help"]);
    let text = stdout(&output);
    assert!(output.status.success());
    assert!(text.contains("depscan"));
    assert!(text.contains("Naive textual file-dependency graphs"));

    let output = depscan(&["version"]);
    assert!(stdout(&output).starts_with("depscan v"));
}

#[test]
fn test_demo_prints_dot() {
    let temp = TempDir::new().unwrap();
    let analysis = dir_arg(temp.path().join("analysis"));

    let output = depscan(&["demo", "--size", "small", "--analysis", &analysis]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let dot = stdout(&output);
    assert!(dot.starts_with("strict digraph G {"));
    assert_eq!(dot.matches("->").count(), 4);
    assert!(temp.path().join("analysis").join("demo_small.gv").is_file());
}

#[test]
fn test_analyse_query_and_clear() {
    let temp = TempDir::new().unwrap();
    let head = create_repository(temp.path());
    let repositories = dir_arg(temp.path().join("repositories"));
    let analysis = dir_arg(temp.path().join("analysis"));
    let common = ["--repositories", repositories.as_str(), "--analysis", analysis.as_str()];

    let repo_path = dir_arg(temp.path().join("repositories").join("proj"));
    let mut args = vec!["analyse", repo_path.as_str(), "-j", "3"];
    args.extend(common);
    let output = depscan(&args);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("1 edges"));
    let snapshot = temp.path().join("analysis").join(format!("proj_{head}.gv"));
    assert!(snapshot.is_file());

    let mut args = vec!["query", "proj", head.as_str(), "--strategy", "double-scan"];
    args.extend(common);
    let output = depscan(&args);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "util.py -> main.py (import)\n");

    let mut args = vec!["clear"];
    args.extend(common);
    assert!(depscan(&args).status.success());
    assert!(!snapshot.exists());
}

#[test]
fn test_analyse_all_fails_when_a_repository_fails() {
    let temp = TempDir::new().unwrap();
    create_repository(temp.path());
    // not a git repository
    std::fs::create_dir_all(temp.path().join("repositories").join("plain")).unwrap();
    let repositories = dir_arg(temp.path().join("repositories"));
    let analysis = dir_arg(temp.path().join("analysis"));

    let output = depscan(&[
        "analyse-all",
        "--repositories",
        &repositories,
        "--analysis",
        &analysis,
    ]);
    assert!(!output.status.success());
    let text = stdout(&output);
    assert!(text.contains("failed  plain"));
    assert!(text.contains("ok      proj"));
}

/// Test that the server can be assembled around an analyzer
#[test]
fn test_server_state() {
    use depscan_analyzer::Analyzer;
    use depscan_core::Settings;
    use depscan_server::{DepscanServer, ServerConfig};

    let temp = TempDir::new().unwrap();
    let settings = Settings {
        repository_directory: temp.path().join("repositories"),
        analysis_directory: temp.path().join("analysis"),
        threads: 2,
        ..Settings::default()
    };
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0, // Let OS assign port
    };

    let server = DepscanServer::new(Analyzer::new(&settings).unwrap(), config);
    assert_eq!(server.state().analyzer.strategy(), "streaming");
}
