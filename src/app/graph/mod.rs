//! The constellation canvas.
//!
//! One [`Constellation`] owns the layout bridge and whichever renderer the
//! session's [`RenderMode`] allows. Everything that must survive a graph
//! reload (the mode, the GPU scene, the demoted tier, the crash guard) lives
//! in [`RenderSession`].

use std::sync::Arc;
use std::time::Instant;

use eframe::egui::Color32;
use glam::Vec3;

use crate::graph::GraphData;
use crate::layout::{DEFAULT_REHEAT_ALPHA, Dimensions, LayoutBridge, Waker};
use crate::quality::{CrashGuard, DeviceProfile, QualityController};
use crate::render::{Connections, FallbackRenderer, NodeInstances, OrbitCamera, RenderMode, SharedGpu};

mod build;
mod interaction;
mod view;

pub const DEFAULT_BACKGROUND: Color32 = Color32::from_rgb(0xfa, 0xfa, 0xf9);

#[derive(Clone, Debug, PartialEq)]
pub struct ConstellationProps {
    pub selected_id: Option<String>,
    pub is_3d: bool,
    pub background: Color32,
    pub show_links: bool,
    pub animated: bool,
    pub aria_label: String,
    /// Reloads with the same drawn node ids keep the running layout instead
    /// of restarting it.
    pub keep_layout: bool,
}

impl Default for ConstellationProps {
    fn default() -> Self {
        Self {
            selected_id: None,
            is_3d: true,
            background: DEFAULT_BACKGROUND,
            show_links: true,
            animated: true,
            aria_label: "Signal constellation".to_owned(),
            keep_layout: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConstellationOutput {
    pub clicked: Option<String>,
    /// `Some` only on frames where the hovered node changed.
    pub hovered: Option<Option<String>>,
    pub announcement: String,
}

pub struct RenderSession {
    mode: RenderMode,
    gpu: Option<SharedGpu>,
    profile: DeviceProfile,
    quality: QualityController,
    crash_guard: CrashGuard,
    context_lost: bool,
    painted_frames: u64,
}

impl RenderSession {
    pub fn new(mode: RenderMode, gpu: Option<SharedGpu>, profile: DeviceProfile) -> Self {
        Self {
            quality: QualityController::new(profile.tier),
            mode,
            gpu,
            profile,
            crash_guard: CrashGuard::new(),
            context_lost: false,
            painted_frames: 0,
        }
    }

    pub fn mode(&self) -> &RenderMode {
        &self.mode
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn quality(&self) -> &QualityController {
        &self.quality
    }

    pub fn crash_guard(&self) -> &CrashGuard {
        &self.crash_guard
    }
}

struct DragState {
    index: usize,
    id: String,
    anchor: Vec3,
}

pub struct Constellation {
    graph: Arc<GraphData>,
    /// What is actually drawn: the graph truncated to the tier's node cap on
    /// the accelerated path, the whole graph on the fallback.
    visible: Arc<GraphData>,
    session: RenderSession,
    waker: Option<Waker>,
    bridge: Option<LayoutBridge>,
    instances: Option<NodeInstances>,
    connections: Option<Connections>,
    fallback: Option<FallbackRenderer>,
    camera: OrbitCamera,
    dimensions: Dimensions,
    selected_id: Option<String>,
    hovered: Option<String>,
    drag: Option<DragState>,
    last_frame: Option<Instant>,
    paused: bool,
}

impl Constellation {
    pub fn session(&self) -> &RenderSession {
        &self.session
    }

    pub fn visible_node_count(&self) -> usize {
        self.visible.node_count()
    }

    pub fn visible_link_count(&self) -> usize {
        match (&self.connections, &self.fallback) {
            (Some(connections), _) => connections.len(),
            (None, Some(fallback)) => fallback.edge_count(),
            (None, None) => 0,
        }
    }

    /// Layout alpha, or `None` when no simulation runs (vector fallback).
    pub fn alpha(&self) -> Option<f32> {
        self.bridge.as_ref().map(LayoutBridge::alpha)
    }

    pub fn is_simulating(&self) -> bool {
        self.bridge.as_ref().is_some_and(LayoutBridge::is_simulating)
    }

    pub fn is_layout_loaded(&self) -> bool {
        self.bridge.as_ref().is_some_and(LayoutBridge::is_loaded)
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn reheat(&mut self) {
        if let Some(bridge) = self.bridge.as_mut() {
            bridge.reheat(DEFAULT_REHEAT_ALPHA);
            self.paused = false;
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        let Some(bridge) = self.bridge.as_mut() else {
            return;
        };
        if paused {
            bridge.stop();
        } else {
            bridge.start();
        }
        self.paused = paused;
    }

    /// Advances a paused layout by one tick.
    pub fn step(&mut self) {
        if let Some(bridge) = self.bridge.as_mut() {
            bridge.step();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Link, Node, NodeStatus};
    use crate::quality::{PlatformClass, QualityTier};
    use crate::render::FallbackReason;

    fn graph(count: usize) -> Arc<GraphData> {
        let nodes = (0..count)
            .map(|index| Node {
                id: format!("sig-{index}"),
                label: format!("Signal {index}"),
                score: (index % 100) as f32,
                status: NodeStatus::Healthy,
                group: None,
                size: None,
            })
            .collect();
        let links = (1..count)
            .map(|index| Link {
                source: format!("sig-{}", index - 1),
                target: format!("sig-{index}"),
                strength: None,
            })
            .collect();
        Arc::new(GraphData { nodes, links })
    }

    fn session(mode: RenderMode, tier: QualityTier) -> RenderSession {
        let profile = DeviceProfile {
            tier,
            config: tier.config(),
            platform: PlatformClass::Desktop,
            reasons: Vec::new(),
            vector_fallback: mode.is_fallback(),
        };
        RenderSession::new(mode, None, profile)
    }

    #[test]
    fn fallback_draws_the_whole_graph_without_a_layout() {
        let mode = RenderMode::VectorFallback(FallbackReason::ReducedGraphics);
        let constellation = Constellation::new(graph(60), session(mode, QualityTier::Low), None, true);
        assert_eq!(constellation.visible_node_count(), 60);
        assert_eq!(constellation.visible_link_count(), 59);
        assert_eq!(constellation.alpha(), None);
        assert!(!constellation.is_simulating());
    }

    #[test]
    fn accelerated_path_truncates_to_the_tier_cap() {
        let constellation =
            Constellation::new(graph(80), session(RenderMode::Accelerated, QualityTier::Low), None, true);
        assert_eq!(constellation.visible_node_count(), 50);
        assert!(constellation.alpha().is_some());
    }

    #[test]
    fn degrading_restores_the_full_graph_and_clamps_the_tier() {
        let mut constellation =
            Constellation::new(graph(120), session(RenderMode::Accelerated, QualityTier::Medium), None, false);
        assert_eq!(constellation.visible_node_count(), 100);

        constellation.degrade(FallbackReason::ContextInstability);
        assert_eq!(constellation.visible_node_count(), 120);
        assert_eq!(constellation.alpha(), None);
        assert_eq!(constellation.session().quality().tier(), QualityTier::Low);
        assert_eq!(
            constellation.session().mode(),
            &RenderMode::VectorFallback(FallbackReason::ContextInstability)
        );
    }

    fn generation(constellation: &Constellation) -> u64 {
        constellation
            .bridge
            .as_ref()
            .map(|bridge| bridge.positions().generation())
            .unwrap_or_default()
    }

    #[test]
    fn every_new_graph_restarts_the_layout() {
        let mut constellation =
            Constellation::new(graph(5), session(RenderMode::Accelerated, QualityTier::High), None, true);
        assert_eq!(generation(&constellation), 1);

        constellation.set_graph(graph(5), false);
        assert_eq!(generation(&constellation), 2);
        assert_eq!(constellation.visible_node_count(), 5);
    }

    #[test]
    fn keep_layout_patches_a_reload_with_the_same_nodes() {
        let mut constellation =
            Constellation::new(graph(10), session(RenderMode::Accelerated, QualityTier::High), None, true);
        constellation.set_paused(true);

        constellation.set_graph(graph(10), true);
        assert_eq!(generation(&constellation), 1);
        assert!(!constellation.is_paused());
        assert_eq!(constellation.visible_node_count(), 10);

        constellation.set_graph(graph(12), true);
        assert_eq!(generation(&constellation), 2);
        assert_eq!(constellation.visible_node_count(), 12);
        assert_eq!(constellation.visible_link_count(), 11);
    }

    #[test]
    fn an_empty_graph_is_drawn_on_either_path() {
        let accelerated =
            Constellation::new(graph(0), session(RenderMode::Accelerated, QualityTier::High), None, true);
        assert_eq!(accelerated.visible_node_count(), 0);
        assert_eq!(accelerated.visible_link_count(), 0);
        assert!(accelerated.alpha().is_some());

        let mode = RenderMode::VectorFallback(FallbackReason::ReducedMotion);
        let fallback = Constellation::new(graph(0), session(mode, QualityTier::Low), None, false);
        assert_eq!(fallback.visible_node_count(), 0);
        assert_eq!(fallback.visible_link_count(), 0);
    }

    #[test]
    fn default_props_match_the_component_contract() {
        let props = ConstellationProps::default();
        assert!(props.is_3d);
        assert!(props.show_links);
        assert!(props.animated);
        assert_eq!(props.background, DEFAULT_BACKGROUND);
        assert!(props.selected_id.is_none());
        assert!(!props.keep_layout);
    }
}
