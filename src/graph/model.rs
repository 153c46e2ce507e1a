use std::collections::HashSet;

use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Healthy,
    Attention,
    Alert,
}

impl NodeStatus {
    pub fn describe(self) -> &'static str {
        match self {
            Self::Healthy => "healthy signal",
            Self::Attention => "needs attention",
            Self::Alert => "urgent alert",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub score: f32,
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
}

impl Node {
    /// Collision radius handed to the layout engine.
    pub fn layout_radius(&self) -> f32 {
        self.size.unwrap_or(5.0 + self.score / 20.0)
    }

    /// Instance scale of the unit sphere, before selection emphasis.
    pub fn render_scale(&self) -> f32 {
        0.5 + 0.5 * (self.score / 100.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f32>,
}

impl Link {
    pub const DEFAULT_STRENGTH: f32 = 0.5;

    pub fn strength(&self) -> f32 {
        self.strength.unwrap_or(Self::DEFAULT_STRENGTH)
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }
}

/// Immutable per-node coordinate emitted by the layout engine.
#[derive(Clone, Debug, PartialEq)]
pub struct NodePosition {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl NodePosition {
    pub fn new(id: impl Into<String>, position: Vec3) -> Self {
        Self {
            id: id.into(),
            x: position.x,
            y: position.y,
            z: position.z,
        }
    }

    pub fn vec3(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub healthy: usize,
    pub attention: usize,
    pub alert: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphData {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl GraphData {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for node in &self.nodes {
            match node.status {
                NodeStatus::Healthy => counts.healthy += 1,
                NodeStatus::Attention => counts.attention += 1,
                NodeStatus::Alert => counts.alert += 1,
            }
        }
        counts
    }

    /// Keeps the `max_nodes` highest-scoring nodes (ties keep input order)
    /// and every link whose endpoints both survive.
    pub fn truncate_by_score(&self, max_nodes: usize) -> GraphData {
        let mut ranked = self.nodes.iter().collect::<Vec<_>>();
        if ranked.len() > max_nodes {
            ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
            ranked.truncate(max_nodes);
        }

        let kept = ranked
            .iter()
            .map(|node| node.id.as_str())
            .collect::<HashSet<_>>();
        let links = self
            .links
            .iter()
            .filter(|link| kept.contains(link.source.as_str()) && kept.contains(link.target.as_str()))
            .cloned()
            .collect();

        GraphData {
            nodes: ranked.into_iter().cloned().collect(),
            links,
        }
    }
}
