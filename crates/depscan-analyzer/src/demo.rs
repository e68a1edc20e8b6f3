//! Synthetic ring graphs for trying out visualisation without a repository

use std::fmt;
use std::str::FromStr;

use depscan_core::Graph;
use serde::{Deserialize, Serialize};

use crate::error::AnalyzerError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemoSize {
    /// `A -> B -> C -> D -> A`
    Small,
    /// `v1 -> ... -> v100 -> v1`
    #[default]
    Medium,
    /// `v1 -> ... -> v1000 -> v1`
    Large,
}

impl DemoSize {
    pub fn name(self) -> &'static str {
        match self {
            DemoSize::Small => "small",
            DemoSize::Medium => "medium",
            DemoSize::Large => "large",
        }
    }
}

impl fmt::Display for DemoSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DemoSize {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(DemoSize::Small),
            "medium" => Ok(DemoSize::Medium),
            "large" => Ok(DemoSize::Large),
            _ => Err(AnalyzerError::UnknownDemoSize(s.to_string())),
        }
    }
}

pub fn demo_graph(size: DemoSize) -> Graph {
    match size {
        DemoSize::Small => ring(["A", "B", "C", "D"].map(String::from)),
        DemoSize::Medium => ring((1..=100).map(|i| format!("v{i}"))),
        DemoSize::Large => ring((1..=1000).map(|i| format!("v{i}"))),
    }
}

fn ring(labels: impl IntoIterator<Item = String>) -> Graph {
    let labels: Vec<String> = labels.into_iter().collect();
    let mut graph = Graph::new();
    for label in &labels {
        graph.add_vertex(label);
    }
    for (i, label) in labels.iter().enumerate() {
        graph.add_edge(label, &labels[(i + 1) % labels.len()]);
    }
    graph
}
