use std::collections::HashSet;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::model::{GraphData, Link, Node, NodeStatus};

#[derive(Clone, Debug, Deserialize)]
struct RawNode {
    id: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    score: f64,
    status: NodeStatus,
    #[serde(default)]
    group: Option<u32>,
    #[serde(default)]
    size: Option<f32>,
}

#[derive(Clone, Debug, Deserialize)]
struct RawGraph {
    nodes: Vec<RawNode>,
    #[serde(default)]
    links: Vec<Link>,
}

pub(crate) fn parse_graph(raw: &str) -> Result<GraphData> {
    let parsed: RawGraph = serde_json::from_str(raw).context("invalid constellation graph JSON")?;

    let mut seen = HashSet::with_capacity(parsed.nodes.len());
    let mut nodes = Vec::with_capacity(parsed.nodes.len());
    for raw_node in parsed.nodes {
        if raw_node.id.is_empty() {
            tracing::warn!("skipping node with empty id");
            continue;
        }
        if !seen.insert(raw_node.id.clone()) {
            tracing::warn!(id = %raw_node.id, "duplicate node id, keeping first occurrence");
            continue;
        }

        let score = if raw_node.score.is_finite() {
            raw_node.score
        } else {
            tracing::warn!(id = %raw_node.id, "non-finite score replaced with 0");
            0.0
        };
        let clamped = score.clamp(0.0, 100.0);
        if clamped != score {
            tracing::warn!(id = %raw_node.id, score, "score clamped to 0..=100");
        }

        let size = raw_node
            .size
            .filter(|size| size.is_finite() && *size > 0.0);

        nodes.push(Node {
            label: raw_node.label.unwrap_or_else(|| raw_node.id.clone()),
            id: raw_node.id,
            score: clamped as f32,
            status: raw_node.status,
            group: raw_node.group,
            size,
        });
    }

    let links = parsed
        .links
        .into_iter()
        .filter(|link| {
            let keep = link.source != link.target
                && seen.contains(&link.source)
                && seen.contains(&link.target);
            if !keep {
                tracing::debug!(source = %link.source, target = %link.target, "dropping unresolved link");
            }
            keep
        })
        .collect();

    Ok(GraphData { nodes, links })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nodes_and_links() {
        let graph = parse_graph(
            r#"{
                "nodes": [
                    {"id": "a", "label": "Alpha", "score": 80, "status": "healthy"},
                    {"id": "b", "label": "Beta", "score": 40, "status": "alert", "group": 2, "size": 7.5}
                ],
                "links": [{"source": "a", "target": "b", "strength": 0.8}]
            }"#,
        )
        .unwrap();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.nodes[1].status, NodeStatus::Alert);
        assert_eq!(graph.nodes[1].group, Some(2));
        assert_eq!(graph.nodes[1].size, Some(7.5));
        assert_eq!(graph.links[0].strength(), 0.8);
    }

    #[test]
    fn unknown_link_endpoints_are_dropped_not_errors() {
        let graph = parse_graph(
            r#"{
                "nodes": [{"id": "a", "label": "A", "score": 1, "status": "attention"}],
                "links": [{"source": "a", "target": "ghost"}, {"source": "a", "target": "a"}]
            }"#,
        )
        .unwrap();
        assert!(graph.links.is_empty());
    }

    #[test]
    fn normalizes_scores_and_duplicates() {
        let graph = parse_graph(
            r#"{
                "nodes": [
                    {"id": "a", "score": 140, "status": "healthy"},
                    {"id": "a", "score": 10, "status": "alert"},
                    {"id": "b", "score": -3, "status": "healthy"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.nodes[0].score, 100.0);
        assert_eq!(graph.nodes[0].label, "a");
        assert_eq!(graph.nodes[1].score, 0.0);
    }

    #[test]
    fn rejects_unknown_status() {
        let result = parse_graph(r#"{"nodes": [{"id": "a", "score": 1, "status": "fine"}]}"#);
        assert!(result.is_err());
    }
}
