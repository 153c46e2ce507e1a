use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use glam::Vec3;

use crate::error::{ConstellationError, Result};
use crate::graph::{GraphData, NodePosition};

use super::engine::{ALPHA_MIN, Dimensions, LayoutLink, LayoutNode, NodePatch};
use super::protocol::{Generation, LayoutCommand, LayoutEvent};
use super::worker::{LayoutWorker, Waker};

/// Immutable id -> position lookup built from one `Positions` batch.
#[derive(Debug, Default)]
pub struct PositionSnapshot {
    generation: Generation,
    positions: HashMap<String, NodePosition>,
}

impl PositionSnapshot {
    pub fn from_positions(generation: Generation, nodes: Vec<NodePosition>) -> Self {
        let positions = nodes
            .into_iter()
            .map(|position| (position.id.clone(), position))
            .collect();
        Self {
            generation,
            positions,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn get(&self, id: &str) -> Option<&NodePosition> {
        self.positions.get(id)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Sole owner of the layout worker thread. Controls are fire-and-forget.
pub struct LayoutBridge {
    command_tx: Sender<LayoutCommand>,
    event_rx: Receiver<LayoutEvent>,
    handle: Option<JoinHandle<()>>,
    generation: Generation,
    loaded: bool,
    positions: Arc<PositionSnapshot>,
    alpha: f32,
    is_simulating: bool,
    /// Set by `stop`; batches already in flight must not resume simulating.
    stopped: bool,
    last_tick_time: Duration,
}

impl LayoutBridge {
    pub fn spawn(waker: Option<Waker>) -> Result<Self> {
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();

        let worker = LayoutWorker::new(command_rx, event_tx, waker);
        let handle = thread::Builder::new()
            .name("constellation-layout".to_owned())
            .spawn(move || worker.run())
            .map_err(|error| ConstellationError::Worker(format!("failed to spawn layout thread: {error}")))?;

        Ok(Self {
            command_tx,
            event_rx,
            handle: Some(handle),
            generation: 0,
            loaded: false,
            positions: Arc::new(PositionSnapshot::default()),
            alpha: 1.0,
            is_simulating: false,
            stopped: false,
            last_tick_time: Duration::ZERO,
        })
    }

    /// Replaces the simulated graph. Prior positions are discarded and the
    /// simulation auto-starts once the worker reports ready.
    pub fn init(&mut self, graph: &GraphData, dimensions: Dimensions) {
        self.generation += 1;
        self.positions = Arc::new(PositionSnapshot {
            generation: self.generation,
            positions: HashMap::new(),
        });
        self.alpha = 1.0;
        self.is_simulating = false;
        self.stopped = false;

        let nodes = graph
            .nodes
            .iter()
            .map(|node| LayoutNode {
                id: node.id.clone(),
                radius: node.layout_radius(),
                group: node.group,
                position: None,
            })
            .collect();
        self.send(LayoutCommand::Init {
            generation: self.generation,
            nodes,
            links: layout_links(graph),
            dimensions,
            alpha: 1.0,
        });
    }

    pub fn start(&mut self) {
        self.send(LayoutCommand::Start);
        self.stopped = false;
        self.is_simulating = true;
    }

    pub fn stop(&mut self) {
        self.send(LayoutCommand::Stop);
        self.stopped = true;
        self.is_simulating = false;
    }

    pub fn reheat(&mut self, alpha: f32) {
        self.send(LayoutCommand::Reheat { alpha });
        self.stopped = false;
        self.is_simulating = true;
    }

    /// Callers must serialize pins per node; concurrent pins overwrite.
    pub fn pin_node(&mut self, node_id: &str, position: Option<Vec3>) {
        self.send(LayoutCommand::Pin {
            node_id: node_id.to_owned(),
            position,
        });
    }

    pub fn update(&mut self, nodes: Option<Vec<NodePatch>>, links: Option<&GraphData>) {
        self.send(LayoutCommand::Update {
            nodes,
            links: links.map(layout_links),
        });
    }

    pub fn step(&mut self) {
        self.send(LayoutCommand::Tick);
    }

    /// Drains worker events. Returns true when a newer snapshot replaced the
    /// stored one; intermediate batches are superseded, last write wins.
    pub fn poll(&mut self) -> bool {
        let mut latest = None;

        for event in self.event_rx.try_iter().collect::<Vec<_>>() {
            match event {
                LayoutEvent::Loaded => {
                    tracing::debug!("layout worker loaded");
                    self.loaded = true;
                }
                LayoutEvent::Ready { generation } if generation == self.generation => {
                    self.start();
                }
                LayoutEvent::Ready { .. } => {}
                LayoutEvent::Positions {
                    generation,
                    nodes,
                    alpha,
                    tick_time,
                } if generation == self.generation => {
                    latest = Some((nodes, alpha, tick_time));
                }
                LayoutEvent::Positions { .. } => {}
            }
        }

        let Some((nodes, alpha, tick_time)) = latest else {
            return false;
        };
        let snapshot = PositionSnapshot::from_positions(self.generation, nodes);
        tracing::trace!(
            generation = snapshot.generation(),
            nodes = snapshot.len(),
            alpha,
            "positions received"
        );
        self.positions = Arc::new(snapshot);
        self.alpha = alpha;
        self.is_simulating = !self.stopped && alpha > ALPHA_MIN;
        self.last_tick_time = tick_time;
        true
    }

    pub fn positions(&self) -> Arc<PositionSnapshot> {
        Arc::clone(&self.positions)
    }

    pub fn is_simulating(&self) -> bool {
        self.is_simulating
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn last_tick_time(&self) -> Duration {
        self.last_tick_time
    }

    fn send(&self, command: LayoutCommand) {
        if self.command_tx.send(command).is_err() {
            tracing::warn!("layout worker is gone; command dropped");
        }
    }
}

impl Drop for LayoutBridge {
    fn drop(&mut self) {
        let _ = self.command_tx.send(LayoutCommand::Shutdown);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::error!("layout worker panicked");
        }
    }
}

fn layout_links(graph: &GraphData) -> Vec<LayoutLink> {
    graph
        .links
        .iter()
        .map(|link| LayoutLink {
            source: link.source.clone(),
            target: link.target.clone(),
            strength: link.strength(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::graph::{Link, Node, NodeStatus};

    fn graph(ids: &[&str]) -> GraphData {
        let nodes = ids
            .iter()
            .enumerate()
            .map(|(index, id)| Node {
                id: (*id).to_owned(),
                label: id.to_uppercase(),
                score: 10.0 * index as f32,
                status: NodeStatus::Healthy,
                group: None,
                size: None,
            })
            .collect::<Vec<_>>();
        let links = ids
            .windows(2)
            .map(|pair| Link {
                source: pair[0].to_owned(),
                target: pair[1].to_owned(),
                strength: None,
            })
            .collect();
        GraphData { nodes, links }
    }

    fn settle(bridge: &mut LayoutBridge, expected: usize) {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            bridge.poll();
            if !bridge.is_simulating() && bridge.positions().len() == expected {
                return;
            }
            assert!(Instant::now() < deadline, "layout did not settle in time");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn auto_starts_and_settles_with_one_position_per_node() {
        let mut bridge = LayoutBridge::spawn(None).unwrap();
        let data = graph(&["a", "b", "c", "d"]);
        bridge.init(&data, Dimensions::Three);

        settle(&mut bridge, 4);

        let snapshot = bridge.positions();
        for node in &data.nodes {
            let position = snapshot.get(&node.id).unwrap();
            assert!(position.vec3().is_finite());
        }
        assert!(bridge.alpha() < ALPHA_MIN);
        assert!(bridge.is_loaded());
    }

    #[test]
    fn reinit_discards_positions_from_previous_graph() {
        let mut bridge = LayoutBridge::spawn(None).unwrap();
        bridge.init(&graph(&["old-1", "old-2", "old-3"]), Dimensions::Two);
        bridge.init(&graph(&["new-1", "new-2"]), Dimensions::Two);

        settle(&mut bridge, 2);

        let snapshot = bridge.positions();
        assert!(snapshot.get("old-1").is_none());
        assert!(snapshot.get("new-1").is_some());
        assert_eq!(snapshot.generation(), 2);
    }

    #[test]
    fn reheat_resumes_a_settled_layout() {
        let mut bridge = LayoutBridge::spawn(None).unwrap();
        bridge.init(&graph(&["a", "b"]), Dimensions::Three);
        settle(&mut bridge, 2);

        bridge.reheat(0.5);
        assert!(bridge.is_simulating());
        settle(&mut bridge, 2);
        assert!(bridge.alpha() < ALPHA_MIN);
    }

    /// A bridge wired to channels the test drives directly, with no worker.
    fn detached() -> (LayoutBridge, Sender<LayoutEvent>, Receiver<LayoutCommand>) {
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let bridge = LayoutBridge {
            command_tx,
            event_rx,
            handle: None,
            generation: 1,
            loaded: true,
            positions: Arc::new(PositionSnapshot::default()),
            alpha: 1.0,
            is_simulating: true,
            stopped: false,
            last_tick_time: Duration::ZERO,
        };
        (bridge, event_tx, command_rx)
    }

    fn batch(alpha: f32) -> LayoutEvent {
        LayoutEvent::Positions {
            generation: 1,
            nodes: vec![NodePosition::new("a".to_owned(), Vec3::ZERO)],
            alpha,
            tick_time: Duration::from_millis(1),
        }
    }

    #[test]
    fn batches_in_flight_after_stop_do_not_resume_simulating() {
        let (mut bridge, events, _commands) = detached();
        bridge.stop();

        events.send(batch(0.4)).unwrap();
        assert!(bridge.poll());
        assert!(!bridge.is_simulating());
        assert_eq!(bridge.alpha(), 0.4);

        bridge.start();
        events.send(batch(0.35)).unwrap();
        assert!(bridge.poll());
        assert!(bridge.is_simulating());
    }
}
