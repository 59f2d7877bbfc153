//! Pure projection of an entity bundle into a renderable flow graph.
//!
//! Layout is a function of array order alone. Projecting the same input
//! twice yields byte-identical graphs, and reordering entities that do not
//! feed a node never moves that node.

use super::types::{FlowEdge, FlowGraph, FlowNode, NodeKind, NodeStyle, Position};
use crate::model::EntityId;

/// An API connected to the MCP, owning zero or more tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEntity {
    pub id: EntityId,
    pub name: String,
    pub tools: Vec<ToolRef>,
}

/// A tool as the projector needs it: identity and label only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRef {
    pub id: EntityId,
    pub name: String,
}

/// Everything the projection reads. Assembled by the caller from the
/// repository; the projector itself touches no shared state.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionInput {
    pub mcp_name: String,
    pub model: String,
    pub apis: Vec<ApiEntity>,
}

// Anchor and row geometry. Fixed so the projection is idempotent.
const CENTER_X: f64 = 400.0;
const INPUT_Y: f64 = 40.0;
const LLM_Y: f64 = 160.0;
const API_Y: f64 = 300.0;
const TOOL_Y: f64 = 440.0;
const OUTPUT_Y: f64 = 580.0;
const API_SPACING: f64 = 260.0;
const TOOL_SPACING: f64 = 170.0;

/// X coordinate for item `index` of `count` items centered on `center`.
fn spread(center: f64, index: usize, count: usize, spacing: f64) -> f64 {
    center + (index as f64 - (count as f64 - 1.0) / 2.0) * spacing
}

fn node(id: impl Into<String>, kind: NodeKind, x: f64, y: f64, label: impl Into<String>) -> FlowNode {
    FlowNode {
        id: id.into(),
        kind,
        position: Position::new(x, y),
        label: label.into(),
        style: NodeStyle::for_kind(kind),
    }
}

/// Project an MCP's entity bundle into a flow graph.
pub fn project(input: &ProjectionInput) -> FlowGraph {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    nodes.push(node("input", NodeKind::Input, CENTER_X, INPUT_Y, "User Input"));
    nodes.push(node(
        "llm",
        NodeKind::Llm,
        CENTER_X,
        LLM_Y,
        format!("{} ({})", input.mcp_name, input.model),
    ));
    edges.push(FlowEdge::always("e-input-llm", "input", "llm"));

    let api_count = input.apis.len();
    let mut has_tools = false;

    for (api_index, api) in input.apis.iter().enumerate() {
        let api_node_id = format!("api-{}", api.id);
        let api_x = spread(CENTER_X, api_index, api_count, API_SPACING);
        nodes.push(node(&api_node_id, NodeKind::Api, api_x, API_Y, &api.name));
        edges.push(FlowEdge::always(
            format!("e-llm-{}", api_node_id),
            "llm",
            &api_node_id,
        ));

        let tool_count = api.tools.len();
        for (tool_index, tool) in api.tools.iter().enumerate() {
            has_tools = true;
            let tool_node_id = format!("tool-{}", tool.id);
            let tool_x = spread(api_x, tool_index, tool_count, TOOL_SPACING);
            nodes.push(node(&tool_node_id, NodeKind::Tool, tool_x, TOOL_Y, &tool.name));

            // Ownership edge: dashed, labeled.
            let mut calls = FlowEdge::always(
                format!("e-{}-{}", api_node_id, tool_node_id),
                &api_node_id,
                &tool_node_id,
            )
            .with_label("calls");
            calls.style.dashed = true;
            edges.push(calls);

            // Direct invocation edge from the LLM.
            edges.push(FlowEdge::always(
                format!("e-llm-{}", tool_node_id),
                "llm",
                &tool_node_id,
            ));
        }
    }

    nodes.push(node("output", NodeKind::Output, CENTER_X, OUTPUT_Y, "Response"));

    if has_tools {
        for api in &input.apis {
            for tool in &api.tools {
                let tool_node_id = format!("tool-{}", tool.id);
                edges.push(FlowEdge::always(
                    format!("e-{}-output", tool_node_id),
                    &tool_node_id,
                    "output",
                ));
            }
        }
    } else {
        edges.push(FlowEdge::always("e-llm-output", "llm", "output"));
    }

    FlowGraph { nodes, edges }
}
