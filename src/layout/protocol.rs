//! Messages exchanged between the layout bridge and the worker thread.
//!
//! Commands flow in, events flow out. Nothing is acknowledged except through
//! the next `Positions` batch; there is no backpressure.

use std::time::Duration;

use glam::Vec3;

use crate::graph::NodePosition;

use super::engine::{Dimensions, LayoutLink, LayoutNode, NodePatch};

/// Monotonic id of an `Init`; events from older generations are stale.
pub type Generation = u64;

#[derive(Clone, Debug)]
pub enum LayoutCommand {
    Init {
        generation: Generation,
        nodes: Vec<LayoutNode>,
        links: Vec<LayoutLink>,
        dimensions: Dimensions,
        alpha: f32,
    },
    Start,
    Stop,
    Reheat {
        alpha: f32,
    },
    Pin {
        node_id: String,
        position: Option<Vec3>,
    },
    Update {
        nodes: Option<Vec<NodePatch>>,
        links: Option<Vec<LayoutLink>>,
    },
    /// Single step, for debugging.
    Tick,
    Shutdown,
}

#[derive(Clone, Debug)]
pub enum LayoutEvent {
    Loaded,
    Ready {
        generation: Generation,
    },
    Positions {
        generation: Generation,
        nodes: Vec<NodePosition>,
        alpha: f32,
        tick_time: Duration,
    },
}
