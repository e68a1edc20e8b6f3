//! Shared dependency graph mutated concurrently by matcher workers

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::cache::SnapshotCache;
use crate::error::CoreResult;
use crate::graph::Graph;
use crate::model::{DependencyEdge, SnapshotKey};

/// Thread-safe graph store. Every mutation happens inside one critical
/// section, so inserts from different workers never interleave.
///
/// The store carries a generation number that changes whenever its contents
/// are discarded ([`GraphStore::reset`], [`GraphStore::replace`]). Writers
/// that captured an older generation are turned away by
/// [`GraphStore::add_edges_if`].
#[derive(Debug, Default)]
pub struct GraphStore {
    graph: RwLock<Graph>,
    // only changed while the write lock is held
    generation: AtomicU64,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_graph(graph: Graph) -> Self {
        Self {
            graph: RwLock::new(graph),
            generation: AtomicU64::new(0),
        }
    }

    // A panicking writer cannot leave the graph half-updated: each operation
    // below completes its petgraph calls before returning.
    fn read(&self) -> RwLockReadGuard<'_, Graph> {
        self.graph.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Graph> {
        self.graph.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear all vertices and edges and start a new generation.
    pub fn reset(&self) {
        let mut graph = self.write();
        graph.clear();
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Current generation; pass it to [`GraphStore::add_edges_if`].
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Insert `dependency -> dependent`, creating missing vertices.
    /// Returns `false` if the edge already existed.
    pub fn add_edge(&self, dependency: &str, dependent: &str) -> bool {
        self.write().add_edge(dependency, dependent)
    }

    /// Commit a batch of edges under a single lock acquisition.
    /// Returns how many were new.
    pub fn add_edges<'a, I>(&self, edges: I) -> usize
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut graph = self.write();
        edges
            .into_iter()
            .filter(|(dependency, dependent)| graph.add_edge(dependency, dependent))
            .count()
    }

    /// Like [`GraphStore::add_edges`], but only while the store is still at
    /// `generation`. Returns `None` without touching the graph otherwise.
    pub fn add_edges_if<'a, I>(&self, generation: u64, edges: I) -> Option<usize>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut graph = self.write();
        if self.generation.load(Ordering::SeqCst) != generation {
            return None;
        }
        Some(
            edges
                .into_iter()
                .filter(|(dependency, dependent)| graph.add_edge(dependency, dependent))
                .count(),
        )
    }

    pub fn vertices(&self) -> BTreeSet<String> {
        self.read().vertex_set()
    }

    pub fn outgoing_edges(&self, vertex: &str) -> Vec<DependencyEdge> {
        self.read().outgoing_edges(vertex)
    }

    pub fn edges(&self) -> Vec<DependencyEdge> {
        self.read().edges().collect()
    }

    pub fn vertex_count(&self) -> usize {
        self.read().vertex_count()
    }

    pub fn edge_count(&self) -> usize {
        self.read().edge_count()
    }

    /// Copy of the current graph.
    pub fn snapshot(&self) -> Graph {
        self.read().clone()
    }

    /// Swap in a whole graph, e.g. one loaded from the snapshot cache.
    pub fn replace(&self, graph: Graph) {
        let mut current = self.write();
        *current = graph;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Persist the current graph under `key`, overwriting any prior snapshot.
    pub fn serialize(&self, cache: &SnapshotCache, key: &SnapshotKey) -> CoreResult<PathBuf> {
        let graph = self.read();
        cache.save_graph(&graph, key)
    }

    /// Load the snapshot for `key` into the store. Returns `false` on a cache miss.
    pub fn deserialize(&self, cache: &SnapshotCache, key: &SnapshotKey) -> CoreResult<bool> {
        match cache.load_graph(key)? {
            Some(graph) => {
                self.replace(graph);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
