//! depscan core: dependency graph model, concurrent graph store and snapshot cache

pub mod cache;
pub mod config;
pub mod dot;
pub mod error;
pub mod graph;
pub mod model;
pub mod store;


pub use cache::{SNAPSHOT_EXTENSION, SnapshotCache};
pub use config::{MatchStrategy, Settings};
pub use dot::{from_dot, to_dot};
pub use error::{CoreError, CoreResult};
pub use graph::Graph;
pub use model::{DependencyEdge, EdgeKind, SnapshotKey, base_name, repository_name, stem};
pub use store::GraphStore;
