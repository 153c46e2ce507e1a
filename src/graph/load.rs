use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::model::GraphData;
use super::parse::parse_graph;

/// Reads and normalizes a graph file. An empty node list is a valid graph.
pub fn load_graph(path: &Path) -> Result<GraphData> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read graph file {}", path.display()))?;

    let graph = parse_graph(&raw)
        .with_context(|| format!("failed to parse graph file {}", path.display()))?;

    if graph.nodes.is_empty() {
        tracing::warn!(path = %path.display(), "graph file contains no nodes");
    }

    tracing::info!(
        nodes = graph.node_count(),
        links = graph.link_count(),
        path = %path.display(),
        "loaded constellation graph"
    );
    Ok(graph)
}
