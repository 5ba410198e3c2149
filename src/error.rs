//! Error taxonomy. Graph mutation and compilation fail with typed errors
//! carrying the offending node identity; compilation is all-or-nothing and
//! never returns a partial program.

use thiserror::Error;

use crate::context::LightKind;
use crate::graph::{NodeId, PortIndex};

/// Errors from the pure graph mutation API.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("node {0} does not exist")]
    MissingNode(NodeId),
    #[error("port {port} on node {node} is out of range for its kind")]
    NoSuchPort { node: NodeId, port: PortIndex },
    #[error("port {port} on node {node} already has an incoming edge")]
    PortOccupied { node: NodeId, port: PortIndex },
    #[error("no edge at port {port} on node {node}")]
    NoSuchEdge { node: NodeId, port: PortIndex },
    #[error("connecting {from} -> {to} would create a data cycle")]
    WouldCycle { from: NodeId, to: NodeId },
}

/// Errors surfaced synchronously from `compile` / `signature`.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("graph has no terminal output node")]
    NoTerminal,
    #[error("graph has {0} terminal nodes; exactly one is supported per program")]
    MultipleTerminals(usize),
    #[error("node {node} ({kind}): required input port {port} is not connected")]
    MissingInput {
        node: NodeId,
        kind: &'static str,
        port: PortIndex,
    },
    #[error("node {node}: unknown kind `{tag}` cannot participate in code generation")]
    UnknownKind { node: NodeId, tag: String },
    #[error("dependency cycle detected through node {node}")]
    Cycle { node: NodeId },
    #[error("node {node}: operand widths {left} and {right} are incompatible")]
    WidthMismatch {
        node: NodeId,
        left: usize,
        right: usize,
    },
    #[error(
        "node {node}: swizzle selects component `{component}` but the source is only {width} wide"
    )]
    SwizzleOutOfRange {
        node: NodeId,
        component: char,
        width: usize,
    },
    #[error("node {node}: derived quantity `{quantity}` cannot be satisfied (light kind {light:?})")]
    UnsatisfiedDerived {
        node: NodeId,
        quantity: &'static str,
        light: LightKind,
    },
    #[error("template for node {node} references placeholder `{placeholder}` with no backing value")]
    BadPlaceholder { node: NodeId, placeholder: String },
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Errors from decoding a serialized graph.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to parse graph JSON")]
    Json(#[from] serde_json::Error),
    #[error("unsupported graph format version {0}")]
    Version(u32),
    #[error("edge {from} -> {to} is invalid: {reason}")]
    Edge { from: u32, to: u32, reason: String },
    #[error("edge swizzle `{0}` is invalid")]
    Swizzle(String),
}
