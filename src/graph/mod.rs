mod load;
mod model;
mod parse;

pub use load::load_graph;
pub use model::{GraphData, Link, Node, NodePosition, NodeStatus};
