//! Arithmetic operation kinds. Width agreement follows the scalar-splat
//! rule: equal widths pass through, a scalar operand broadcasts against a
//! vector, anything else is a mismatch.

use crate::context::Dialect;
use crate::error::CompileError;
use crate::graph::{Graph, NodeId};

use super::{decl, input_width, require_input, type_name, NodeData, NodeKind};

/// Scalar-splat width agreement for a two-operand kind.
pub(super) fn merge_widths(
    node: NodeId,
    left: usize,
    right: usize,
) -> Result<usize, CompileError> {
    if left == right {
        Ok(left)
    } else if left == 1 {
        Ok(right)
    } else if right == 1 {
        Ok(left)
    } else {
        Err(CompileError::WidthMismatch { node, left, right })
    }
}

/// Width of a strict two-input kind (both ports required).
pub(super) fn binary_op_width(
    graph: &Graph,
    id: NodeId,
    kind: &NodeKind,
) -> Result<usize, CompileError> {
    let left = require_input(graph, id, kind, 0)?;
    let right = require_input(graph, id, kind, 1)?;
    merge_widths(id, left, right)
}

/// Width of an `Add`, whose ports are individually optional: one connected
/// input forwards unchanged, two combine under the splat rule.
pub(super) fn add_width(graph: &Graph, id: NodeId, kind: &NodeKind) -> Result<usize, CompileError> {
    match (input_width(graph, id, 0)?, input_width(graph, id, 1)?) {
        (Some(left), Some(right)) => merge_widths(id, left, right),
        (Some(w), None) | (None, Some(w)) => Ok(w),
        (None, None) => Err(CompileError::MissingInput {
            node: id,
            kind: super::kind_name_static(kind),
            port: 0,
        }),
    }
}

pub(super) fn add_data(graph: &Graph, id: NodeId, kind: &NodeKind) -> Result<NodeData, CompileError> {
    match (input_width(graph, id, 0)?, input_width(graph, id, 1)?) {
        (Some(left), Some(right)) => {
            merge_widths(id, left, right)?;
            Ok(NodeData::register())
        }
        (Some(_), None) | (None, Some(_)) => Ok(NodeData {
            passthrough: true,
            ..NodeData::default()
        }),
        (None, None) => Err(CompileError::MissingInput {
            node: id,
            kind: super::kind_name_static(kind),
            port: 0,
        }),
    }
}

/// Multiply, Dot and Mix: all ports required, always a fresh register.
pub(super) fn strict_op_data(
    graph: &Graph,
    id: NodeId,
    kind: &NodeKind,
) -> Result<NodeData, CompileError> {
    let left = require_input(graph, id, kind, 0)?;
    let right = require_input(graph, id, kind, 1)?;
    match kind {
        NodeKind::Dot => {
            if left != right {
                return Err(CompileError::WidthMismatch {
                    node: id,
                    left,
                    right,
                });
            }
        }
        NodeKind::Mix => {
            let blend = merge_widths(id, left, right)?;
            let t = require_input(graph, id, kind, 2)?;
            // The factor is a scalar or matches the blended width.
            if t != 1 && t != blend {
                return Err(CompileError::WidthMismatch {
                    node: id,
                    left: blend,
                    right: t,
                });
            }
        }
        _ => {
            merge_widths(id, left, right)?;
        }
    }
    Ok(NodeData::register())
}

/// Splat-constructs `expr` up to `target` width when it arrives scalar.
/// Infix arithmetic broadcasts scalars on its own; builtin calls do not.
fn splat(dialect: Dialect, expr: &str, from: usize, target: usize) -> String {
    if from == 1 && target > 1 {
        format!("{}({})", type_name(dialect, target), expr)
    } else {
        expr.to_string()
    }
}

pub(super) fn op_templates(
    graph: &Graph,
    id: NodeId,
    kind: &NodeKind,
    dialect: Dialect,
) -> Result<Vec<String>, CompileError> {
    match kind {
        NodeKind::Add => {
            let (left, right) = (input_width(graph, id, 0)?, input_width(graph, id, 1)?);
            match (left, right) {
                (Some(l), Some(r)) => {
                    let out = merge_widths(id, l, r)?;
                    Ok(vec![format!("{}%0 + %1;", decl(dialect, out))])
                }
                // Single-input adds pass through without a statement.
                _ => Ok(Vec::new()),
            }
        }
        NodeKind::Multiply => {
            let out = binary_op_width(graph, id, kind)?;
            Ok(vec![format!("{}%0 * %1;", decl(dialect, out))])
        }
        NodeKind::Dot => {
            let width = require_input(graph, id, kind, 0)?;
            let body = if width == 1 {
                "%0 * %1".to_string()
            } else {
                "dot(%0, %1)".to_string()
            };
            Ok(vec![format!("{}{};", decl(dialect, 1), body)])
        }
        NodeKind::Mix => {
            let left = require_input(graph, id, kind, 0)?;
            let right = require_input(graph, id, kind, 1)?;
            let out = merge_widths(id, left, right)?;
            let a = splat(dialect, "%0", left, out);
            let b = splat(dialect, "%1", right, out);
            Ok(vec![format!("{}mix({a}, {b}, %2);", decl(dialect, out))])
        }
        _ => Ok(Vec::new()),
    }
}
