//! Core data structures for file dependency graphs

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Base name of a file without its last extension (`src/util.py` -> `util`).
///
/// A name without a dot is returned unchanged; only the final extension is
/// removed, so `archive.tar.gz` yields `archive.tar`.
pub fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Base name of a file including its extension (`src/util.py` -> `util.py`).
/// Used as the vertex label in dependency graphs.
pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Repository name for a repository path: its last path component.
pub fn repository_name(path: &Path) -> String {
    base_name(path)
}

/// Relationship recorded between two files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// The dependent file mentions the dependency's stem as a whole word.
    Import,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Import => write!(f, "import"),
        }
    }
}

/// A directed edge `source -> target` where `source` is the dependency and
/// `target` the file that mentions it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

impl DependencyEdge {
    pub fn import(dependency: impl Into<String>, dependent: impl Into<String>) -> Self {
        Self {
            source: dependency.into(),
            target: dependent.into(),
            kind: EdgeKind::Import,
        }
    }
}

/// Identifies one persisted graph: a repository at a specific version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    pub repo: String,
    pub version: String,
}

impl SnapshotKey {
    pub fn new(repo: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.repo, self.version)
    }
}
