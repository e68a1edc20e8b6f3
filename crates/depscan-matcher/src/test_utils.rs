use std::path::PathBuf;

use tempfile::TempDir;

/// Write `(relative path, content)` pairs into a fresh temp directory and
/// return it with the written paths in input order.
pub fn write_tree(files: &[(&str, &str)]) -> (TempDir, Vec<PathBuf>) {
    // Default temp names start with a dot, which the crawler treats as hidden.
    let dir = tempfile::Builder::new().prefix("depscan-").tempdir().unwrap();
    let paths = files
        .iter()
        .map(|(rel, content)| {
            let path = dir.path().join(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&path, content).unwrap();
            path
        })
        .collect();
    (dir, paths)
}
