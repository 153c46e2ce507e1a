use std::collections::HashMap;
use std::time::{Duration, Instant};

use glam::Vec3;

use crate::graph::NodePosition;
use crate::util::stable_jitter;

use super::forces::{ForceParams, apply_centering, apply_charge, apply_collisions, apply_links};

pub const ALPHA_MIN: f32 = 0.001;
pub const ALPHA_DECAY: f32 = 0.02;
pub const VELOCITY_DECAY: f32 = 0.4;
pub const DEFAULT_REHEAT_ALPHA: f32 = 0.5;
pub const FRAME_BUDGET: Duration = Duration::from_millis(8);

const INITIAL_SPREAD: f32 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dimensions {
    Two,
    Three,
}

impl Dimensions {
    pub fn from_is_3d(is_3d: bool) -> Self {
        if is_3d { Self::Three } else { Self::Two }
    }

    fn is_planar(self) -> bool {
        self == Self::Two
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutNode {
    pub id: String,
    pub radius: f32,
    pub group: Option<u32>,
    pub position: Option<Vec3>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutLink {
    pub source: String,
    pub target: String,
    pub strength: f32,
}

/// Field-wise patch applied by `update`; `None` leaves the field untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodePatch {
    pub id: String,
    pub radius: Option<f32>,
    pub group: Option<u32>,
    pub position: Option<Vec3>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationState {
    pub alpha: f32,
    pub is_running: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatchReport {
    pub ticks: usize,
    pub elapsed: Duration,
}

pub(super) struct Body {
    pub(super) id: String,
    pub(super) position: Vec3,
    pub(super) velocity: Vec3,
    pub(super) radius: f32,
    pub(super) group: Option<u32>,
    pub(super) fixed: Option<Vec3>,
}

pub(super) struct Spring {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) strength: f32,
    pub(super) bias: f32,
}

/// Force-directed simulation. Owned by exactly one execution context.
pub struct ForceLayoutEngine {
    bodies: Vec<Body>,
    index_by_id: HashMap<String, usize>,
    springs: Vec<Spring>,
    dimensions: Dimensions,
    params: ForceParams,
    state: SimulationState,
}

impl ForceLayoutEngine {
    pub fn new(nodes: Vec<LayoutNode>, links: &[LayoutLink], dimensions: Dimensions, alpha: f32) -> Self {
        let mut bodies = Vec::with_capacity(nodes.len());
        let mut index_by_id = HashMap::with_capacity(nodes.len());

        for node in nodes {
            if index_by_id.contains_key(&node.id) {
                continue;
            }

            let mut position = node
                .position
                .unwrap_or_else(|| stable_jitter(&node.id) * INITIAL_SPREAD);
            if dimensions.is_planar() {
                position.z = 0.0;
            }

            index_by_id.insert(node.id.clone(), bodies.len());
            bodies.push(Body {
                id: node.id,
                position,
                velocity: Vec3::ZERO,
                radius: node.radius.max(0.0),
                group: node.group,
                fixed: None,
            });
        }

        let mut engine = Self {
            bodies,
            index_by_id,
            springs: Vec::new(),
            dimensions,
            params: ForceParams::default(),
            state: SimulationState {
                alpha: alpha.clamp(0.0, 1.0),
                is_running: false,
            },
        };
        engine.set_links(links);
        engine
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    #[cfg(test)]
    pub fn node_count(&self) -> usize {
        self.bodies.len()
    }

    #[cfg(test)]
    pub fn link_count(&self) -> usize {
        self.springs.len()
    }

    #[cfg(test)]
    pub fn group(&self, id: &str) -> Option<u32> {
        self.index_by_id
            .get(id)
            .and_then(|&index| self.bodies[index].group)
    }

    pub fn start(&mut self) {
        self.state.is_running = true;
    }

    pub fn stop(&mut self) {
        self.state.is_running = false;
    }

    /// Raises alpha and resumes ticking; positions are kept.
    pub fn reheat(&mut self, alpha: f32) {
        self.state.alpha = alpha.clamp(0.0, 1.0);
        self.state.is_running = true;
    }

    /// Fixes `id` at `position`, or releases it when `position` is `None`.
    /// Returns false for unknown ids. Last call wins.
    pub fn pin(&mut self, id: &str, position: Option<Vec3>) -> bool {
        let Some(&index) = self.index_by_id.get(id) else {
            return false;
        };

        let planar = self.dimensions.is_planar();
        self.bodies[index].fixed = position.map(|mut fixed| {
            if planar {
                fixed.z = 0.0;
            }
            fixed
        });
        true
    }

    #[cfg(test)]
    pub fn is_pinned(&self, id: &str) -> bool {
        self.index_by_id
            .get(id)
            .is_some_and(|&index| self.bodies[index].fixed.is_some())
    }

    pub fn update(&mut self, patches: Option<&[NodePatch]>, links: Option<&[LayoutLink]>) {
        let planar = self.dimensions.is_planar();
        for patch in patches.unwrap_or_default() {
            let Some(&index) = self.index_by_id.get(&patch.id) else {
                continue;
            };
            let body = &mut self.bodies[index];
            if let Some(radius) = patch.radius {
                body.radius = radius.max(0.0);
            }
            if let Some(group) = patch.group {
                body.group = Some(group);
            }
            if let Some(mut position) = patch.position {
                if planar {
                    position.z = 0.0;
                }
                body.position = position;
                body.velocity = Vec3::ZERO;
            }
        }

        if let Some(links) = links {
            self.set_links(links);
        }
    }

    fn set_links(&mut self, links: &[LayoutLink]) {
        let mut degree = vec![0usize; self.bodies.len()];
        let mut resolved = Vec::with_capacity(links.len());
        for link in links {
            let (Some(&source), Some(&target)) = (
                self.index_by_id.get(&link.source),
                self.index_by_id.get(&link.target),
            ) else {
                continue;
            };
            if source == target {
                continue;
            }
            degree[source] += 1;
            degree[target] += 1;
            resolved.push((source, target, link.strength));
        }

        self.springs = resolved
            .into_iter()
            .map(|(source, target, strength)| Spring {
                source,
                target,
                strength,
                bias: degree[source] as f32 / (degree[source] + degree[target]) as f32,
            })
            .collect();
    }

    /// Advances the simulation by exactly one step.
    pub fn tick(&mut self) {
        let alpha = self.state.alpha + (0.0 - self.state.alpha) * ALPHA_DECAY;
        self.state.alpha = alpha;
        let planar = self.dimensions.is_planar();

        apply_links(&mut self.bodies, &self.springs, &self.params, alpha, planar);
        apply_charge(&mut self.bodies, &self.params, alpha, planar);
        apply_centering(&mut self.bodies);
        apply_collisions(&mut self.bodies, &self.params, planar);

        let retained = 1.0 - VELOCITY_DECAY;
        for body in &mut self.bodies {
            if let Some(fixed) = body.fixed {
                body.position = fixed;
                body.velocity = Vec3::ZERO;
                continue;
            }

            body.velocity *= retained;
            if planar {
                body.velocity.z = 0.0;
            }
            body.position += body.velocity;
        }
    }

    /// Ticks until `budget` is spent or the layout cools below `ALPHA_MIN`.
    /// Always performs at least one tick while running.
    pub fn run_batch(&mut self, budget: Duration) -> Option<BatchReport> {
        if !self.state.is_running {
            return None;
        }

        let started = Instant::now();
        let mut ticks = 0usize;
        loop {
            self.tick();
            ticks += 1;

            if self.state.alpha < ALPHA_MIN {
                self.state.is_running = false;
                break;
            }
            if started.elapsed() >= budget {
                break;
            }
        }

        Some(BatchReport {
            ticks,
            elapsed: started.elapsed(),
        })
    }

    pub fn positions(&self) -> Vec<NodePosition> {
        self.bodies
            .iter()
            .map(|body| NodePosition::new(body.id.clone(), body.position))
            .collect()
    }

    #[cfg(test)]
    pub fn position(&self, id: &str) -> Option<Vec3> {
        self.index_by_id
            .get(id)
            .map(|&index| self.bodies[index].position)
    }
}
