use eframe::egui::{self, RichText, Ui};

use crate::graph::{GraphData, Node};
use crate::render::palette;

use super::super::a11y;
use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        let Some(selected_id) = self.props.selected_id.clone() else {
            ui.label("Select a node in the constellation.");
            ui.add_space(6.0);
            ui.label(a11y::summary(&self.graph));
            return;
        };

        let Some(node) = self.graph.node(&selected_id) else {
            ui.label("Selected node no longer exists in the graph.");
            return;
        };

        ui.label(RichText::new(node.label.as_str()).strong());
        ui.small(node.id.as_str());
        ui.add_space(6.0);

        ui.label(format!("Score: {:.0}", node.score));
        ui.label(
            RichText::new(format!("Status: {}", node.status.describe()))
                .color(palette::status_color(node.status)),
        );
        if let Some(group) = node.group {
            ui.label(format!("Group: {group}"));
        }

        let neighbors = neighbors(&self.graph, &selected_id);
        ui.separator();
        ui.label(RichText::new(format!("Connected signals ({})", neighbors.len())).strong());
        if neighbors.is_empty() {
            ui.label("No links touch this signal.");
        }

        let mut next_selection = None;
        egui::ScrollArea::vertical()
            .id_salt("neighbor_scroll")
            .max_height(320.0)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for neighbor in &neighbors {
                    let text = format!("{}  ({:.0})", neighbor.label, neighbor.score);
                    if ui.link(text).on_hover_text(a11y::node_label(neighbor)).clicked() {
                        next_selection = Some(neighbor.id.clone());
                    }
                }
            });

        ui.add_space(6.0);
        if ui.button("Clear selection").clicked() {
            self.props.selected_id = None;
        } else if next_selection.is_some() {
            self.props.selected_id = next_selection;
        }
    }
}

/// Nodes sharing a link with `id`, strongest score first.
fn neighbors<'a>(graph: &'a GraphData, id: &str) -> Vec<&'a Node> {
    let mut neighbors = graph
        .links
        .iter()
        .filter(|link| link.touches(id))
        .filter_map(|link| {
            let other = if link.source == id { &link.target } else { &link.source };
            graph.node(other)
        })
        .collect::<Vec<_>>();
    neighbors.sort_by(|a, b| b.score.total_cmp(&a.score));
    neighbors.dedup_by(|a, b| a.id == b.id);
    neighbors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Link, NodeStatus};

    fn node(id: &str, score: f32) -> Node {
        Node {
            id: id.to_owned(),
            label: id.to_uppercase(),
            score,
            status: NodeStatus::Healthy,
            group: None,
            size: None,
        }
    }

    fn link(source: &str, target: &str) -> Link {
        Link {
            source: source.to_owned(),
            target: target.to_owned(),
            strength: None,
        }
    }

    #[test]
    fn neighbors_follow_links_in_both_directions() {
        let graph = GraphData {
            nodes: vec![node("a", 10.0), node("b", 90.0), node("c", 40.0), node("d", 70.0)],
            links: vec![link("a", "b"), link("c", "a"), link("b", "d"), link("b", "a")],
        };
        let ids = neighbors(&graph, "a")
            .into_iter()
            .map(|node| node.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["b", "c"]);
    }
}
