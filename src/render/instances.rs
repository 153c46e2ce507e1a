//! CPU staging for the instanced node draw.
//!
//! Displayed positions chase the latest simulated targets with a
//! frame-rate independent lerp, so the worker's tick cadence never shows up
//! as stutter. The packed instance array is only rebuilt (and bumped to a new
//! revision for upload) when something visibly changed.

use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use eframe::egui::{Pos2, Rect};
use glam::Vec3;

use crate::graph::{Node, NodeStatus};
use crate::layout::PositionSnapshot;

use super::camera::OrbitCamera;
use super::palette;

/// World radius of a node with scale 1.
pub const BASE_RADIUS: f32 = 6.0;
pub const SELECTED_SCALE: f32 = 1.3;
/// Movements smaller than this are not worth an upload.
pub const MOVE_EPSILON: f32 = 0.01;
/// Fraction of the gap left after one second of interpolation.
const DAMPING_BASE: f32 = 0.001;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct NodeInstance {
    pub offset: [f32; 3],
    pub radius: f32,
    pub color: [f32; 4],
}

/// Blend factor for a frame lasting `dt` seconds: `1 - 0.001^dt`.
pub fn lerp_factor(dt: f32) -> f32 {
    1.0 - DAMPING_BASE.powf(dt.max(0.0))
}

struct InstanceNode {
    id: String,
    status: NodeStatus,
    scale: f32,
    displayed: Vec3,
    target: Option<Vec3>,
}

pub struct NodeInstances {
    nodes: Vec<InstanceNode>,
    index_by_id: HashMap<String, usize>,
    selected: Option<usize>,
    hovered: Option<usize>,
    packed: Arc<[NodeInstance]>,
    revision: u64,
    dirty: bool,
}

impl NodeInstances {
    pub fn new(nodes: &[Node]) -> Self {
        let index_by_id = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect();
        let nodes = nodes
            .iter()
            .map(|node| InstanceNode {
                id: node.id.clone(),
                status: node.status,
                scale: node.render_scale(),
                displayed: Vec3::ZERO,
                target: None,
            })
            .collect();

        let mut instances = Self {
            nodes,
            index_by_id,
            selected: None,
            hovered: None,
            packed: Arc::from(Vec::new()),
            revision: 0,
            dirty: true,
        };
        instances.repack();
        instances
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn id(&self, index: usize) -> Option<&str> {
        self.nodes.get(index).map(|node| node.id.as_str())
    }

    pub fn displayed(&self, index: usize) -> Option<Vec3> {
        self.nodes.get(index).map(|node| node.displayed)
    }

    pub fn world_radius(&self, index: usize) -> f32 {
        self.nodes.get(index).map_or(0.0, |node| {
            let emphasis = if self.selected == Some(index) { SELECTED_SCALE } else { 1.0 };
            node.scale * emphasis * BASE_RADIUS
        })
    }

    /// Pulls new targets from a snapshot. A node seen for the first time is
    /// placed directly at its target.
    pub fn set_targets(&mut self, snapshot: &PositionSnapshot) {
        for node in &mut self.nodes {
            let Some(position) = snapshot.get(&node.id) else {
                continue;
            };
            let target = position.vec3();
            if node.target.is_none() {
                node.displayed = target;
                self.dirty = true;
            }
            node.target = Some(target);
        }
    }

    /// Overrides one node's displayed and target position, e.g. under a drag.
    pub fn place(&mut self, index: usize, position: Vec3) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.displayed = position;
            node.target = Some(position);
            self.dirty = true;
        }
    }

    pub fn set_highlight(&mut self, selected: Option<&str>, hovered: Option<&str>) {
        let selected = selected.and_then(|id| self.index_of(id));
        let hovered = hovered.and_then(|id| self.index_of(id));
        if selected != self.selected || hovered != self.hovered {
            self.selected = selected;
            self.hovered = hovered;
            self.dirty = true;
        }
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    /// Moves displayed positions toward their targets. Returns true while any
    /// node is still travelling.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.step(lerp_factor(dt))
    }

    /// Jumps every node to its target.
    pub fn snap(&mut self) {
        self.step(1.0);
    }

    fn step(&mut self, factor: f32) -> bool {
        let mut moving = false;
        for node in &mut self.nodes {
            let Some(target) = node.target else {
                continue;
            };
            let gap = target - node.displayed;
            if gap.length() < MOVE_EPSILON {
                continue;
            }
            node.displayed += gap * factor;
            moving = true;
        }
        if moving {
            self.dirty = true;
        }
        self.repack();
        moving
    }

    /// Packed instances plus a revision that changes whenever they do.
    pub fn packed(&self) -> (Arc<[NodeInstance]>, u64) {
        (Arc::clone(&self.packed), self.revision)
    }

    /// Nearest node under `pointer`, in screen space.
    pub fn pick(&self, camera: &OrbitCamera, rect: Rect, pointer: Pos2) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.target.is_some())
            .filter_map(|(index, node)| {
                let (screen, pixels_per_unit) = camera.project(rect, node.displayed)?;
                let radius = (self.world_radius(index) * pixels_per_unit).max(4.0);
                let distance = screen.distance(pointer);
                (distance <= radius).then_some((index, distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    fn repack(&mut self) {
        if !self.dirty {
            return;
        }
        let packed = self
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let selected = self.selected == Some(index);
                let hovered = self.hovered == Some(index);
                NodeInstance {
                    offset: node.displayed.to_array(),
                    radius: self.world_radius(index),
                    color: palette::to_gl(palette::emphasized(node.status, selected, hovered)),
                }
            })
            .collect::<Vec<_>>();
        self.packed = Arc::from(packed);
        self.revision += 1;
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodePosition;

    fn nodes() -> Vec<Node> {
        ["a", "b"]
            .iter()
            .map(|id| Node {
                id: (*id).to_owned(),
                label: id.to_uppercase(),
                score: 100.0,
                status: NodeStatus::Healthy,
                group: None,
                size: None,
            })
            .collect()
    }

    fn snapshot(a: Vec3, b: Vec3) -> PositionSnapshot {
        PositionSnapshot::from_positions(1, vec![NodePosition::new("a", a), NodePosition::new("b", b)])
    }

    #[test]
    fn lerp_factor_is_frame_rate_independent() {
        let one_big = lerp_factor(0.1);
        let two_small = 1.0 - (1.0 - lerp_factor(0.05)).powi(2);
        assert!((one_big - two_small).abs() < 1e-5);
        assert_eq!(lerp_factor(0.0), 0.0);
    }

    #[test]
    fn first_snapshot_places_nodes_directly() {
        let mut instances = NodeInstances::new(&nodes());
        instances.set_targets(&snapshot(Vec3::new(10.0, 0.0, 0.0), Vec3::ZERO));
        assert_eq!(instances.displayed(0), Some(Vec3::new(10.0, 0.0, 0.0)));
    }

    #[test]
    fn displayed_position_converges_without_overshoot() {
        let mut instances = NodeInstances::new(&nodes());
        instances.set_targets(&snapshot(Vec3::ZERO, Vec3::ZERO));
        let target = Vec3::new(100.0, 0.0, 0.0);
        instances.set_targets(&snapshot(target, Vec3::ZERO));

        let dt = 1.0 / 60.0;
        let max_step = lerp_factor(dt) * 100.0;
        let mut previous = instances.displayed(0).unwrap();
        for _ in 0..600 {
            instances.advance(dt);
            let current = instances.displayed(0).unwrap();
            assert!(current.distance(previous) <= max_step + 1e-4);
            assert!(current.x <= target.x + 1e-4);
            previous = current;
        }
        assert!(previous.distance(target) < MOVE_EPSILON);
    }

    #[test]
    fn settled_nodes_do_not_repack() {
        let mut instances = NodeInstances::new(&nodes());
        instances.set_targets(&snapshot(Vec3::ONE, Vec3::ZERO));
        instances.advance(0.016);
        let (_, revision) = instances.packed();

        assert!(!instances.advance(0.016));
        assert_eq!(instances.packed().1, revision);
    }

    #[test]
    fn selection_enlarges_and_recolors() {
        let mut instances = NodeInstances::new(&nodes());
        let (before, revision) = instances.packed();
        instances.set_highlight(Some("b"), None);
        instances.snap();
        let (after, next) = instances.packed();

        assert!(next > revision);
        assert!((after[1].radius - before[1].radius * SELECTED_SCALE).abs() < 1e-5);
        assert_eq!(after[1].color, palette::to_gl(palette::HEALTHY_GLOW));
        assert_eq!(after[0], before[0]);
    }

    #[test]
    fn pick_maps_screen_hits_back_to_ids() {
        let mut instances = NodeInstances::new(&nodes());
        instances.set_targets(&snapshot(Vec3::ZERO, Vec3::new(80.0, 0.0, 0.0)));
        let camera = OrbitCamera::new(false);
        let rect = Rect::from_min_size(Pos2::ZERO, eframe::egui::vec2(800.0, 600.0));

        let (screen, _) = camera.project(rect, Vec3::new(80.0, 0.0, 0.0)).unwrap();
        let index = instances.pick(&camera, rect, screen).unwrap();
        assert_eq!(instances.id(index), Some("b"));
        assert_eq!(instances.pick(&camera, rect, Pos2::new(5.0, 5.0)), None);
    }
}
