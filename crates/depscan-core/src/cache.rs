//! Snapshot cache: one DOT file per (repository, version)

use std::path::{Path, PathBuf};

use crate::dot::{from_dot, to_dot};
use crate::error::CoreResult;
use crate::graph::Graph;
use crate::model::SnapshotKey;

/// Snapshot file extension.
pub const SNAPSHOT_EXTENSION: &str = "gv";

/// Directory of persisted dependency graphs, `<dir>/<repo>_<version>.gv`.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    dir: PathBuf,
}

fn encode_file_name(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            '\\' => out.push_str("%5C"),
            c => out.push(c),
        }
    }
    out
}

impl SnapshotCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get snapshot file path for a key. Path separators in the key (branch
    /// names like `feature/x`) and `%` are percent-encoded.
    pub fn snapshot_path(&self, key: &SnapshotKey) -> PathBuf {
        let name = encode_file_name(&key.to_string());
        self.dir.join(format!("{name}.{SNAPSHOT_EXTENSION}"))
    }

    pub fn contains(&self, key: &SnapshotKey) -> bool {
        self.snapshot_path(key).is_file()
    }

    /// Ensure cache directory exists
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir)?;
        }
        Ok(())
    }

    /// Write `graph` under `key`, replacing any previous snapshot.
    ///
    /// The text is written to a sibling temporary file first and renamed into
    /// place, so readers never observe a half-written snapshot.
    pub fn save_graph(&self, graph: &Graph, key: &SnapshotKey) -> CoreResult<PathBuf> {
        self.ensure_dir()?;
        let path = self.snapshot_path(key);
        let tmp = path.with_extension(format!("{SNAPSHOT_EXTENSION}.tmp"));

        std::fs::write(&tmp, to_dot(graph))?;
        std::fs::rename(&tmp, &path)?;

        tracing::debug!(
            "Snapshot {} saved: {} vertices, {} edges",
            path.display(),
            graph.vertex_count(),
            graph.edge_count()
        );
        Ok(path)
    }

    /// Load the snapshot for `key`. `Ok(None)` is a cache miss.
    pub fn load_graph(&self, key: &SnapshotKey) -> CoreResult<Option<Graph>> {
        let path = self.snapshot_path(key);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Snapshot cache miss: {}", key);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let graph = from_dot(&text)?;
        tracing::debug!("Snapshot loaded from: {}", path.display());
        Ok(Some(graph))
    }

    /// Remove the snapshot for `key` if present.
    pub fn invalidate(&self, key: &SnapshotKey) -> std::io::Result<()> {
        match std::fs::remove_file(self.snapshot_path(key)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Clear cache directory
    pub fn clear(&self) -> std::io::Result<()> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }
}
