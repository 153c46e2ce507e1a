use crate::graph::{GraphData, Node};

pub(super) fn summary(graph: &GraphData) -> String {
    let counts = graph.status_counts();
    format!(
        "Constellation with {} signals: {} healthy, {} need attention, {} urgent",
        graph.node_count(),
        counts.healthy,
        counts.attention,
        counts.alert
    )
}

pub(super) fn node_label(node: &Node) -> String {
    format!("{}, score {}, {}", node.label, node.score.round(), node.status.describe())
}

/// Live-region text: the selection when one resolves, the summary otherwise.
pub(super) fn announcement(graph: &GraphData, selected: Option<&str>) -> String {
    match selected.and_then(|id| graph.node(id)) {
        Some(node) => format!("Selected: {}", node.label),
        None => summary(graph),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeStatus;

    fn node(id: &str, score: f32, status: NodeStatus) -> Node {
        Node {
            id: id.to_owned(),
            label: format!("Signal {id}"),
            score,
            status,
            group: None,
            size: None,
        }
    }

    fn graph() -> GraphData {
        GraphData {
            nodes: vec![
                node("a", 80.0, NodeStatus::Healthy),
                node("b", 42.4, NodeStatus::Attention),
                node("c", 12.0, NodeStatus::Alert),
                node("d", 64.0, NodeStatus::Healthy),
            ],
            links: Vec::new(),
        }
    }

    #[test]
    fn summary_counts_nodes_by_status() {
        assert_eq!(
            summary(&graph()),
            "Constellation with 4 signals: 2 healthy, 1 need attention, 1 urgent"
        );
    }

    #[test]
    fn empty_graph_summary_reports_zero_signals() {
        assert_eq!(
            summary(&GraphData::default()),
            "Constellation with 0 signals: 0 healthy, 0 need attention, 0 urgent"
        );
    }

    #[test]
    fn announcement_prefers_a_resolvable_selection() {
        let graph = graph();
        assert_eq!(announcement(&graph, Some("c")), "Selected: Signal c");
        assert_eq!(announcement(&graph, Some("zz")), summary(&graph));
        assert_eq!(announcement(&graph, None), summary(&graph));
    }

    #[test]
    fn node_label_reads_score_and_status() {
        assert_eq!(
            node_label(&node("b", 42.4, NodeStatus::Attention)),
            "Signal b, score 42, needs attention"
        );
    }
}
