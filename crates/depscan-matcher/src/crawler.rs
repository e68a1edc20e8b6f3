//! File discovery for analysis runs

use std::io;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::{MatchError, MatchResult};

/// Every regular file under `dir`, recursively, in path order.
///
/// Hidden files and directories (leading `.`) are skipped, which keeps `.git`
/// out of the graph. Ignore files are not consulted: a generated file that
/// mentions a source stem is still a dependent of it. Entries that cannot be
/// read are logged and left out.
pub fn list_files(dir: &Path) -> MatchResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(MatchError::Crawl {
            path: dir.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }

    let walker = WalkBuilder::new(dir)
        .hidden(true)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .follow_links(false)
        .sort_by_file_path(|a, b| a.cmp(b))
        .build();

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_some_and(|t| t.is_file()) {
                    files.push(entry.into_path());
                }
            }
            Err(e) => tracing::warn!("Skipping unreadable entry under {}: {}", dir.display(), e),
        }
    }

    tracing::debug!("Found {} files under {}", files.len(), dir.display());
    Ok(files)
}

/// Names of the non-hidden directories directly inside `dir`, sorted.
pub fn list_immediate_subdirectories(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with('.') {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::write_tree;

    #[test]
    fn test_lists_files_recursively_in_order() {
        let (dir, _) = write_tree(&[
            ("b.py", "x"),
            ("a.py", "x"),
            ("pkg/inner/deep.rs", "x"),
            ("pkg/mod.rs", "x"),
        ]);

        let files: Vec<_> = list_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();

        assert_eq!(files, vec!["a.py", "b.py", "pkg/inner/deep.rs", "pkg/mod.rs"]);
    }

    #[test]
    fn test_skips_hidden_entries() {
        let (dir, _) = write_tree(&[
            ("main.py", "x"),
            (".env", "SECRET=1"),
            (".git/HEAD", "ref: refs/heads/main"),
            ("src/.cache/blob", "x"),
        ]);

        let files = list_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("main.py"));
    }

    #[test]
    fn test_ignore_files_are_not_honoured() {
        let (dir, _) = write_tree(&[("build.log", "x"), ("main.py", "x")]);
        std::fs::write(dir.path().join(".gitignore"), "*.log\n").unwrap();
        std::fs::write(dir.path().join(".ignore"), "*.log\n").unwrap();

        assert_eq!(list_files(dir.path()).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_directory_is_a_crawl_error() {
        let (dir, _) = write_tree(&[]);
        let err = list_files(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, MatchError::Crawl { .. }));
    }

    #[test]
    fn test_immediate_subdirectories() {
        let (dir, _) = write_tree(&[
            ("zeta/a.txt", "x"),
            ("alpha/nested/b.txt", "x"),
            (".hidden/c.txt", "x"),
            ("file.txt", "x"),
        ]);

        let names = list_immediate_subdirectories(dir.path()).unwrap();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
