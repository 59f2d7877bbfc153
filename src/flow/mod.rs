//! Flow graph: the derived visual DAG consumed by the rendering collaborator.
//!
//! Everything in here is plain data and pure functions. The graph is
//! recomputed from the entity bundle on every change and discarded after
//! render; nothing in this module persists or renders anything itself.

mod projector;
mod types;

pub use projector::{project, ApiEntity, ProjectionInput, ToolRef};
pub use types::{
    preferred_edge, EdgeCondition, EdgeStyle, FlowEdge, FlowGraph, FlowNode, NodeKind, NodeStyle,
    Position, UpstreamOutcome,
};
