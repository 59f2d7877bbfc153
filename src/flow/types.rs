//! Flow graph data model.
//!
//! Nodes and edges are render-ready: positions, labels, and styles are all
//! computed here so the rendering collaborator only has to draw.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a node represents in the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Input,
    Llm,
    Api,
    Tool,
    Prompt,
    Output,
}

/// Canvas position in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Visual styling for a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStyle {
    pub background: String,
    pub border: String,
}

impl NodeStyle {
    /// The fixed palette: one style per node kind.
    pub fn for_kind(kind: NodeKind) -> Self {
        let (background, border) = match kind {
            NodeKind::Input => ("#eff6ff", "#3b82f6"),
            NodeKind::Llm => ("#faf5ff", "#a855f7"),
            NodeKind::Api => ("#fefce8", "#eab308"),
            NodeKind::Tool => ("#f0fdf4", "#22c55e"),
            NodeKind::Prompt => ("#fdf2f8", "#ec4899"),
            NodeKind::Output => ("#f8fafc", "#64748b"),
        };
        Self {
            background: background.to_string(),
            border: border.to_string(),
        }
    }
}

/// A positioned, styled node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: String,
    pub kind: NodeKind,
    pub position: Position,
    pub label: String,
    pub style: NodeStyle,
}

/// When an edge is taken at traversal time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeCondition {
    /// Unconditional.
    Always,
    /// Taken only when the upstream HTTP status is in [200, 299].
    OnSuccess,
    /// Taken only when the upstream HTTP status is >= 400.
    OnError,
    /// Taken iff the stored JSONPath-like expression evaluates truthy
    /// against the upstream node's output.
    Custom,
}

/// Visual styling for an edge, fully determined by its condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeStyle {
    pub color: String,
    pub dashed: bool,
    pub animated: bool,
}

impl EdgeStyle {
    /// Map a condition to exactly one style.
    pub fn for_condition(condition: EdgeCondition) -> Self {
        let (color, dashed, animated) = match condition {
            EdgeCondition::Always => ("#3b82f6", false, false),
            EdgeCondition::OnSuccess => ("#22c55e", false, true),
            EdgeCondition::OnError => ("#ef4444", true, false),
            EdgeCondition::Custom => ("#f97316", false, false),
        };
        Self {
            color: color.to_string(),
            dashed,
            animated,
        }
    }
}

/// Result of the upstream node an edge hangs off, as seen at traversal time.
#[derive(Debug, Clone)]
pub struct UpstreamOutcome {
    /// HTTP status of the upstream call, if it was an HTTP call.
    pub status: Option<u16>,
    /// The upstream node's output.
    pub output: Value,
}

/// A directed, styled, conditioned edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub condition: EdgeCondition,
    /// JSONPath-like expression, present for `Custom` conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Traversal priority: 0 is highest; smallest wins among edges leaving
    /// the same node, ties broken by insertion order.
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub style: EdgeStyle,
}

impl FlowEdge {
    /// An unconditional edge with default priority.
    pub fn always(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(id, source, target, EdgeCondition::Always)
    }

    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        condition: EdgeCondition,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            condition,
            expression: None,
            priority: 0,
            label: None,
            style: EdgeStyle::for_condition(condition),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    /// Whether this edge would be taken given the upstream outcome.
    pub fn is_satisfied(&self, outcome: &UpstreamOutcome) -> bool {
        match self.condition {
            EdgeCondition::Always => true,
            EdgeCondition::OnSuccess => outcome
                .status
                .map(|s| (200..=299).contains(&s))
                .unwrap_or(false),
            EdgeCondition::OnError => outcome.status.map(|s| s >= 400).unwrap_or(false),
            EdgeCondition::Custom => self
                .expression
                .as_deref()
                .map(|expr| is_truthy(&lookup_path(&outcome.output, expr)))
                .unwrap_or(false),
        }
    }
}

/// Resolve a JSONPath-like dotted path (`$.a.b[0].c` or `a.b.c`) against a
/// value. Missing segments resolve to null.
fn lookup_path(value: &Value, expr: &str) -> Value {
    let path = expr.trim().trim_start_matches('$').trim_start_matches('.');
    if path.is_empty() {
        return value.clone();
    }

    let mut current = value;
    for segment in path.split('.') {
        // A segment may carry `[index]` suffixes: `items[0][2]`.
        let key_end = segment.find('[').unwrap_or(segment.len());
        let (key, mut indices) = segment.split_at(key_end);
        if !key.is_empty() {
            match current.get(key) {
                Some(next) => current = next,
                None => return Value::Null,
            }
        }
        while let Some(close) = indices.find(']') {
            let idx: usize = match indices[1..close].parse() {
                Ok(i) => i,
                Err(_) => return Value::Null,
            };
            match current.get(idx) {
                Some(next) => current = next,
                None => return Value::Null,
            }
            indices = &indices[close + 1..];
        }
    }
    current.clone()
}

/// JavaScript-flavored truthiness, matching what the flow editor promises
/// for custom conditions.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Pick the preferred outgoing edge of `source`: numerically smallest
/// priority wins, ties broken by insertion order.
pub fn preferred_edge<'a>(edges: &'a [FlowEdge], source: &str) -> Option<&'a FlowEdge> {
    let mut best: Option<&FlowEdge> = None;
    for edge in edges.iter().filter(|e| e.source == source) {
        match best {
            Some(current) if edge.priority >= current.priority => {}
            _ => best = Some(edge),
        }
    }
    best
}

/// The complete derived graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowGraph {
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

impl FlowGraph {
    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edges_from(&self, source: &str) -> Vec<&FlowEdge> {
        self.edges.iter().filter(|e| e.source == source).collect()
    }
}
