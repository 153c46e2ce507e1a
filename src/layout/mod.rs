mod bridge;
mod engine;
mod forces;
mod protocol;
mod worker;

pub use bridge::{LayoutBridge, PositionSnapshot};
pub use engine::{DEFAULT_REHEAT_ALPHA, Dimensions, NodePatch};
pub use worker::Waker;
