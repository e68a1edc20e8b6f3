//! DOT (Graphviz) encoding of dependency graphs
//!
//! Snapshots are written as a `strict digraph` with one numbered vertex per
//! file name carrying a `label` attribute, followed by the edge list:
//!
//! ```text
//! strict digraph G {
//!   1 [ label="main.py" ];
//!   2 [ label="util.py" ];
//!   2 -> 1;
//! }
//! ```
//!
//! Vertices are numbered in label order and edges are sorted, so the same
//! graph always produces the same text regardless of insertion order.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{CoreError, CoreResult};
use crate::graph::Graph;

static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(strict\s+)?digraph(\s+[\w]+)?\s*\{$").expect("valid regex"));
static VERTEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\d+)\s*\[\s*label\s*=\s*"((?:[^"\\]|\\.)*)"\s*\]\s*;?$"#).expect("valid regex")
});
static EDGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*->\s*(\d+)\s*;?$").expect("valid regex"));

/// Render `graph` as DOT text.
pub fn to_dot(graph: &Graph) -> String {
    let vertices = graph.vertex_set();
    let ids: HashMap<&str, usize> = vertices
        .iter()
        .enumerate()
        .map(|(i, label)| (label.as_str(), i + 1))
        .collect();

    let mut out = String::from("strict digraph G {\n");
    for label in &vertices {
        let _ = writeln!(out, "  {} [ label=\"{}\" ];", ids[label.as_str()], escape(label));
    }
    for (source, target) in graph.edge_set() {
        let _ = writeln!(out, "  {} -> {};", ids[source.as_str()], ids[target.as_str()]);
    }
    out.push_str("}\n");
    out
}

/// Parse DOT text produced by [`to_dot`] back into a graph.
pub fn from_dot(text: &str) -> CoreResult<Graph> {
    let mut graph = Graph::new();
    let mut labels: HashMap<String, String> = HashMap::new();
    let mut opened = false;
    let mut closed = false;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        if closed {
            return Err(CoreError::malformed(line_no, "content after closing brace"));
        }
        if !opened {
            if !HEADER.is_match(line) {
                return Err(CoreError::malformed(line_no, "expected digraph header"));
            }
            opened = true;
            continue;
        }
        if line == "}" {
            closed = true;
        } else if let Some(caps) = VERTEX.captures(line) {
            let label = unescape(&caps[2]);
            graph.add_vertex(&label);
            labels.insert(caps[1].to_string(), label);
        } else if let Some(caps) = EDGE.captures(line) {
            let source = labels
                .get(&caps[1])
                .ok_or_else(|| CoreError::malformed(line_no, format!("unknown vertex {}", &caps[1])))?;
            let target = labels
                .get(&caps[2])
                .ok_or_else(|| CoreError::malformed(line_no, format!("unknown vertex {}", &caps[2])))?;
            graph.add_edge(source, target);
        } else {
            return Err(CoreError::malformed(line_no, format!("unrecognized statement `{line}`")));
        }
    }

    if !closed {
        return Err(CoreError::malformed(text.lines().count(), "missing closing brace"));
    }
    Ok(graph)
}

/// Labels stay on one line: `\`, `"`, `\n` and `\r` are backslash-escaped.
fn escape(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut chars = label.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some(next) => out.push(next),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}
