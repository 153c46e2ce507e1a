//! Simulation-free vector rendering through egui's painter.
//!
//! Nodes sit on a fixed circle ordered by their index in the graph, so the
//! picture is correct from the first frame and costs nothing to lay out.

use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_2, TAU};

use eframe::egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Stroke, vec2};

use crate::graph::GraphData;
use crate::util::truncate_label;

use super::instances::SELECTED_SCALE;
use super::palette::{self, LINK_DEFAULT, LINK_HIGHLIGHT};

const RING_FRACTION: f32 = 0.38;
const LABEL_CHARS: usize = 28;

pub struct FallbackRenderer {
    edges: Vec<(usize, usize)>,
}

impl FallbackRenderer {
    pub fn new(graph: &GraphData) -> Self {
        let index_by_id = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.as_str(), index))
            .collect::<HashMap<_, _>>();
        let edges = graph
            .links
            .iter()
            .filter_map(|link| Some((*index_by_id.get(link.source.as_str())?, *index_by_id.get(link.target.as_str())?)))
            .collect();
        Self { edges }
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn paint(
        &self,
        painter: &Painter,
        rect: Rect,
        graph: &GraphData,
        selected: Option<usize>,
        hovered: Option<usize>,
        show_links: bool,
        background: Color32,
    ) {
        painter.rect_filled(rect, 0.0, background);
        let positions = circle_positions(graph.nodes.len(), rect);

        if show_links {
            for &(source, target) in &self.edges {
                let touches_focus = [selected, hovered]
                    .iter()
                    .flatten()
                    .any(|&index| index == source || index == target);
                let color = if touches_focus { LINK_HIGHLIGHT } else { LINK_DEFAULT };
                painter.line_segment(
                    [positions[source], positions[target]],
                    Stroke::new(if touches_focus { 1.5 } else { 1.0 }, palette::from_gl(color)),
                );
            }
        }

        for (index, node) in graph.nodes.iter().enumerate() {
            let is_selected = selected == Some(index);
            let is_hovered = hovered == Some(index);
            let radius = node_radius(node.score, is_selected);
            let fill = palette::emphasized(node.status, is_selected, is_hovered);
            painter.circle_filled(positions[index], radius, fill);
            if is_selected {
                painter.circle_stroke(positions[index], radius + 3.0, Stroke::new(2.0, palette::status_glow(node.status)));
            }
            if is_selected || is_hovered {
                painter.text(
                    positions[index] + vec2(0.0, radius + 4.0),
                    Align2::CENTER_TOP,
                    truncate_label(&node.label, LABEL_CHARS),
                    FontId::proportional(12.0),
                    Color32::from_gray(60),
                );
            }
        }
    }

    /// Index of the node under `pointer`, preferring the closest center.
    pub fn pick(&self, rect: Rect, graph: &GraphData, selected: Option<usize>, pointer: Pos2) -> Option<usize> {
        circle_positions(graph.nodes.len(), rect)
            .into_iter()
            .zip(&graph.nodes)
            .enumerate()
            .filter_map(|(index, (position, node))| {
                let radius = node_radius(node.score, selected == Some(index)).max(6.0);
                let distance = position.distance(pointer);
                (distance <= radius).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }
}

/// Evenly spaced points on a circle, first node at twelve o'clock.
pub fn circle_positions(count: usize, rect: Rect) -> Vec<Pos2> {
    if count == 1 {
        return vec![rect.center()];
    }
    let radius = rect.width().min(rect.height()) * RING_FRACTION;
    (0..count)
        .map(|index| {
            let angle = TAU * index as f32 / count as f32 - FRAC_PI_2;
            rect.center() + vec2(angle.cos(), angle.sin()) * radius
        })
        .collect()
}

pub fn node_radius(score: f32, selected: bool) -> f32 {
    let radius = 6.0 + 6.0 * (score / 100.0);
    if selected { radius * SELECTED_SCALE } else { radius }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Link, Node, NodeStatus};

    fn graph() -> GraphData {
        let nodes = (0..4)
            .map(|index| Node {
                id: format!("n{index}"),
                label: format!("Node {index}"),
                score: 50.0,
                status: NodeStatus::Healthy,
                group: None,
                size: None,
            })
            .collect();
        let links = vec![
            Link {
                source: "n0".to_owned(),
                target: "n2".to_owned(),
                strength: None,
            },
            Link {
                source: "n1".to_owned(),
                target: "missing".to_owned(),
                strength: None,
            },
        ];
        GraphData { nodes, links }
    }

    fn rect() -> Rect {
        Rect::from_min_size(Pos2::ZERO, vec2(400.0, 400.0))
    }

    #[test]
    fn circle_layout_is_deterministic_and_starts_at_the_top() {
        let positions = circle_positions(4, rect());
        assert_eq!(positions, circle_positions(4, rect()));
        assert!((positions[0].x - 200.0).abs() < 1e-3);
        assert!((positions[0].y - 48.0).abs() < 1e-3);
        assert!((positions[1].x - 352.0).abs() < 1e-3);
        assert_eq!(circle_positions(1, rect()), vec![Pos2::new(200.0, 200.0)]);
        assert!(circle_positions(0, rect()).is_empty());
    }

    #[test]
    fn unresolved_links_are_not_drawn() {
        assert_eq!(FallbackRenderer::new(&graph()).edge_count(), 1);
    }

    #[test]
    fn pick_finds_the_node_under_the_pointer() {
        let graph = graph();
        let renderer = FallbackRenderer::new(&graph);
        let positions = circle_positions(graph.nodes.len(), rect());
        assert_eq!(renderer.pick(rect(), &graph, None, positions[2]), Some(2));
        assert_eq!(renderer.pick(rect(), &graph, None, rect().center()), None);
    }

    #[test]
    fn selection_enlarges_nodes() {
        assert!((node_radius(100.0, false) - 12.0).abs() < 1e-5);
        assert!((node_radius(100.0, true) - 15.6).abs() < 1e-4);
    }
}
