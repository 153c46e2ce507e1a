use std::sync::Arc;

use crate::graph::GraphData;
use crate::layout::{DEFAULT_REHEAT_ALPHA, Dimensions, LayoutBridge, NodePatch, Waker};
use crate::quality::QualityTier;
use crate::render::{Connections, FallbackReason, FallbackRenderer, NodeInstances, OrbitCamera};

use super::{Constellation, RenderSession};

impl Constellation {
    pub fn new(graph: Arc<GraphData>, session: RenderSession, waker: Option<Waker>, is_3d: bool) -> Self {
        let mut constellation = Self {
            visible: Arc::clone(&graph),
            graph,
            session,
            waker,
            bridge: None,
            instances: None,
            connections: None,
            fallback: None,
            camera: OrbitCamera::new(is_3d),
            dimensions: Dimensions::from_is_3d(is_3d),
            selected_id: None,
            hovered: None,
            drag: None,
            last_frame: None,
            paused: false,
        };
        constellation.rebuild();
        constellation
    }

    /// Takes the session back, e.g. to hand it to a replacement component.
    pub fn into_session(self) -> RenderSession {
        self.session
    }

    /// Installs a new graph. Every new graph restarts the simulation from
    /// fresh positions under a new generation. With `keep_layout`, a graph
    /// whose drawn node ids are unchanged instead patches and reheats the
    /// running simulation, keeping its positions.
    pub fn set_graph(&mut self, graph: Arc<GraphData>, keep_layout: bool) {
        self.graph = graph;
        self.drag = None;

        if keep_layout && self.session.mode.is_accelerated() {
            let visible = self.truncated();
            if same_node_ids(&visible, &self.visible) && self.patch_simulation(&visible) {
                return;
            }
        }
        self.hovered = None;
        self.rebuild();
    }

    pub(super) fn set_dimensions(&mut self, is_3d: bool) {
        let dimensions = Dimensions::from_is_3d(is_3d);
        if dimensions == self.dimensions {
            return;
        }
        self.dimensions = dimensions;
        self.camera = OrbitCamera::new(is_3d);
        self.drag = None;
        self.rebuild();
    }

    pub(super) fn rebuild(&mut self) {
        if self.session.mode.is_accelerated() && self.rebuild_accelerated() {
            return;
        }
        self.rebuild_fallback();
    }

    /// Drops to the vector fallback for the rest of the session.
    pub(super) fn degrade(&mut self, reason: FallbackReason) {
        if self.session.mode.degrade(reason) {
            self.session.quality.clamp_to(QualityTier::Low);
            self.rebuild_fallback();
        }
    }

    pub(super) fn apply_demotion(&mut self, tier: QualityTier) {
        tracing::info!(
            %tier,
            max_nodes = tier.config().max_nodes,
            "reinitializing layout for demoted tier"
        );
        self.rebuild();
    }

    fn truncated(&self) -> GraphData {
        let tier = self.session.quality.tier();
        let visible = self.graph.truncate_by_score(tier.config().max_nodes);
        if visible.node_count() < self.graph.node_count() {
            tracing::info!(
                kept = visible.node_count(),
                total = self.graph.node_count(),
                %tier,
                "graph truncated to the tier node cap"
            );
        }
        visible
    }

    fn rebuild_accelerated(&mut self) -> bool {
        if self.bridge.is_none() {
            match LayoutBridge::spawn(self.waker.clone()) {
                Ok(bridge) => self.bridge = Some(bridge),
                Err(error) => {
                    tracing::error!(%error, "layout worker unavailable");
                    self.session.mode.degrade(FallbackReason::LayoutUnavailable);
                    return false;
                }
            }
        }

        let visible = self.truncated();
        let instances = NodeInstances::new(&visible.nodes);
        self.connections = Some(Connections::new(&visible.links, &instances));
        self.instances = Some(instances);
        if let Some(bridge) = self.bridge.as_mut() {
            bridge.init(&visible, self.dimensions);
        }
        self.visible = Arc::new(visible);
        self.fallback = None;
        self.paused = false;
        true
    }

    fn rebuild_fallback(&mut self) {
        // Dropping the bridge shuts the worker down.
        self.bridge = None;
        self.instances = None;
        self.connections = None;
        self.drag = None;
        self.visible = Arc::clone(&self.graph);
        self.fallback = Some(FallbackRenderer::new(&self.graph));
    }

    fn patch_simulation(&mut self, visible: &GraphData) -> bool {
        let Some(bridge) = self.bridge.as_mut() else {
            return false;
        };

        let patches = visible
            .nodes
            .iter()
            .map(|node| NodePatch {
                id: node.id.clone(),
                radius: Some(node.layout_radius()),
                group: node.group,
                position: None,
            })
            .collect();
        bridge.update(Some(patches), Some(visible));
        bridge.reheat(DEFAULT_REHEAT_ALPHA);
        self.paused = false;

        let mut instances = NodeInstances::new(&visible.nodes);
        instances.set_targets(&bridge.positions());
        instances.snap();
        self.connections = Some(Connections::new(&visible.links, &instances));
        self.instances = Some(instances);
        self.visible = Arc::new(visible.clone());
        tracing::debug!(nodes = visible.node_count(), "patched running simulation");
        true
    }
}

fn same_node_ids(a: &GraphData, b: &GraphData) -> bool {
    a.nodes.len() == b.nodes.len() && a.nodes.iter().zip(&b.nodes).all(|(x, y)| x.id == y.id)
}
