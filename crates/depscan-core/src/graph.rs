//! Graph wrapper using petgraph::StableDiGraph keyed by file base name

use crate::model::{DependencyEdge, EdgeKind};
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use std::collections::{BTreeSet, HashMap};

/// Directed dependency graph without parallel edges whose
/// vertices are file base names.
#[derive(Clone)]
pub struct Graph {
    inner: StableDiGraph<String, EdgeKind>,
    index: HashMap<String, NodeIndex>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("vertex_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            inner: StableDiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Add a vertex if it is not present yet. Returns its index either way.
    pub fn add_vertex(&mut self, label: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(label) {
            return idx;
        }
        let idx = self.inner.add_node(label.to_string());
        self.index.insert(label.to_string(), idx);
        idx
    }

    /// Ensure both vertices exist and insert `dependency -> dependent`.
    /// Returns `false` when the edge was already present.
    pub fn add_edge(&mut self, dependency: &str, dependent: &str) -> bool {
        let source = self.add_vertex(dependency);
        let target = self.add_vertex(dependent);
        if self.inner.find_edge(source, target).is_some() {
            return false;
        }
        self.inner.add_edge(source, target, EdgeKind::Import);
        true
    }

    pub fn contains_vertex(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    pub fn contains_edge(&self, dependency: &str, dependent: &str) -> bool {
        match (self.index.get(dependency), self.index.get(dependent)) {
            (Some(&s), Some(&t)) => self.inner.find_edge(s, t).is_some(),
            _ => false,
        }
    }

    /// Total number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    /// Iterate over all vertex labels in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = &str> {
        self.inner
            .node_indices()
            .filter_map(move |idx| self.inner.node_weight(idx))
            .map(String::as_str)
    }

    /// Iterate over all edges.
    pub fn edges(&self) -> impl Iterator<Item = DependencyEdge> + '_ {
        IntoEdgeReferences::edge_references(&self.inner).map(move |e| DependencyEdge {
            source: self.inner[e.source()].clone(),
            target: self.inner[e.target()].clone(),
            kind: *e.weight(),
        })
    }

    /// All edges whose source is `vertex`. Empty if the vertex is unknown.
    pub fn outgoing_edges(&self, vertex: &str) -> Vec<DependencyEdge> {
        let Some(&idx) = self.index.get(vertex) else {
            return Vec::new();
        };
        self.inner
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| DependencyEdge {
                source: vertex.to_string(),
                target: self.inner[e.target()].clone(),
                kind: *e.weight(),
            })
            .collect()
    }

    /// Vertex labels as an ordered set, for order-independent comparison.
    pub fn vertex_set(&self) -> BTreeSet<String> {
        self.vertices().map(str::to_string).collect()
    }

    /// Edges as an ordered set of `(source, target)` pairs.
    pub fn edge_set(&self) -> BTreeSet<(String, String)> {
        self.edges().map(|e| (e.source, e.target)).collect()
    }

    /// Remove every vertex and edge.
    pub fn clear(&mut self) {
        self.inner.clear();
        self.index.clear();
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
