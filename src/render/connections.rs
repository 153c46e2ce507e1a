use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::graph::Link;

use super::instances::{MOVE_EPSILON, NodeInstances};
use super::palette::{LINK_DEFAULT, LINK_HIGHLIGHT};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

/// Two vertices per link, drawn as `GL_LINES` in one call.
pub struct Connections {
    endpoints: Vec<(usize, usize)>,
    vertices: Vec<LineVertex>,
    packed: Arc<[LineVertex]>,
    revision: u64,
}

impl Connections {
    /// Links whose endpoints are not among `instances` are skipped.
    pub fn new(links: &[Link], instances: &NodeInstances) -> Self {
        let endpoints = links
            .iter()
            .filter_map(|link| Some((instances.index_of(&link.source)?, instances.index_of(&link.target)?)))
            .collect::<Vec<_>>();
        let vertices = vec![LineVertex::default(); endpoints.len() * 2];
        let mut connections = Self {
            packed: Arc::from(vertices.clone()),
            endpoints,
            vertices,
            revision: 0,
        };
        connections.refresh(instances);
        connections
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Recomputes endpoints and highlight colors. The packed buffer is only
    /// replaced when a vertex moved by more than the epsilon or changed color.
    pub fn refresh(&mut self, instances: &NodeInstances) -> bool {
        let focus = [instances.selected(), instances.hovered()];
        let mut dirty = self.revision == 0;

        for (link_index, &(source, target)) in self.endpoints.iter().enumerate() {
            let highlighted = focus
                .iter()
                .flatten()
                .any(|&index| index == source || index == target);
            let color = if highlighted { LINK_HIGHLIGHT } else { LINK_DEFAULT };

            for (slot, node) in [(link_index * 2, source), (link_index * 2 + 1, target)] {
                let Some(position) = instances.displayed(node) else {
                    continue;
                };
                let vertex = &mut self.vertices[slot];
                let moved = glam::Vec3::from_array(vertex.position).distance(position) > MOVE_EPSILON;
                if moved || vertex.color != color {
                    vertex.position = position.to_array();
                    vertex.color = color;
                    dirty = true;
                }
            }
        }

        if dirty {
            self.packed = Arc::from(self.vertices.clone());
            self.revision += 1;
        }
        dirty
    }

    pub fn packed(&self) -> (Arc<[LineVertex]>, u64) {
        (Arc::clone(&self.packed), self.revision)
    }
}
