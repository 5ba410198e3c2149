//! Dependency expansion: completes a wired graph into a compilable one.
//!
//! Authors wire explicit data edges; kinds that consume derived quantities
//! (normals, light vectors, half vectors) get those wired in here, on the
//! reserved derived-port range, reusing one provider node per quantity. The
//! pass runs to a fixed point because providers can request further
//! quantities themselves.

use std::collections::{BTreeSet, VecDeque};

use tracing::debug;

use crate::algebra::Swizzle;
use crate::context::CompileContext;
use crate::error::{CompileError, GraphError};
use crate::graph::{Graph, NodeId, PortIndex, DERIVED_PORT_BASE, ORDER_ONLY_PORT};
use crate::kinds::{self, BaseKind, Derived, NodeKind};

/// Expands `graph` in place and returns the terminal node.
///
/// Validates along the way: exactly one terminal, no reachable unknown
/// kinds, every required port connected. Nodes with no path to the terminal
/// are ignored entirely, unknown or not.
pub fn expand(graph: &mut Graph, ctx: &CompileContext) -> Result<NodeId, CompileError> {
    let terminals: Vec<NodeId> = graph
        .nodes()
        .filter(|(_, n)| n.kind.base() == BaseKind::Terminal)
        .map(|(id, _)| id)
        .collect();
    let terminal = match terminals.as_slice() {
        [] => return Err(CompileError::NoTerminal),
        [one] => *one,
        many => return Err(CompileError::MultipleTerminals(many.len())),
    };

    let mut seen: BTreeSet<NodeId> = graph.upstream_reachable(terminal);
    let mut queue: VecDeque<NodeId> = seen.iter().copied().collect();

    while let Some(id) = queue.pop_front() {
        let kind = match graph.node(id) {
            Some(node) => node.kind.clone(),
            None => continue,
        };
        if let NodeKind::Unknown { tag, .. } = &kind {
            return Err(CompileError::UnknownKind {
                node: id,
                tag: tag.clone(),
            });
        }
        for (i, spec) in kind.ports().iter().enumerate() {
            if !spec.optional && graph.edge_at(id, i as PortIndex).is_none() {
                return Err(CompileError::MissingInput {
                    node: id,
                    kind: kinds::kind_name_static(&kind),
                    port: i as PortIndex,
                });
            }
        }
        for (i, quantity) in kinds::derived_requests(&kind, ctx).into_iter().enumerate() {
            let port = DERIVED_PORT_BASE + i as PortIndex;
            let source = match graph.edge_at(id, port) {
                Some(edge) => edge.from,
                None => wire_provider(graph, id, port, quantity)?,
            };
            if seen.insert(source) {
                queue.push_back(source);
            }
        }
    }

    schedule_hints(graph, terminal, &seen);
    debug!(terminal = %terminal, nodes = seen.len(), "expanded dependency closure");
    Ok(terminal)
}

/// Connects a provider for `quantity` to `(consumer, port)`, reusing an
/// existing provider node when one exists and is not downstream of the
/// consumer.
fn wire_provider(
    graph: &mut Graph,
    consumer: NodeId,
    port: PortIndex,
    quantity: Derived,
) -> Result<NodeId, CompileError> {
    let existing = graph.nodes().find_map(|(id, n)| {
        matches!(&n.kind, NodeKind::DerivedQuantity { quantity: q } if *q == quantity)
            .then_some(id)
    });
    if let Some(provider) = existing {
        match graph.connect(provider, consumer, port, false, Swizzle::IDENTITY) {
            Ok(()) => return Ok(provider),
            // A hand-placed provider downstream of the consumer cannot be
            // shared; fall through to a fresh one.
            Err(GraphError::WouldCycle { .. }) => {}
            Err(err) => return Err(err.into()),
        }
    }
    let provider = graph.add_node(NodeKind::DerivedQuantity { quantity });
    graph
        .connect(provider, consumer, port, false, Swizzle::IDENTITY)
        .map_err(CompileError::from)?;
    Ok(provider)
}

/// Ordering-only constraints that keep related statements adjacent without
/// introducing data flow. Fog reads the raw view vector; scheduling it after
/// the normalized provider keeps the two lookups in one place.
fn schedule_hints(graph: &mut Graph, _terminal: NodeId, reachable: &BTreeSet<NodeId>) {
    let view_dir = graph.nodes().find_map(|(id, n)| {
        (reachable.contains(&id)
            && matches!(
                &n.kind,
                NodeKind::DerivedQuantity {
                    quantity: Derived::ViewDir
                }
            ))
        .then_some(id)
    });
    let Some(view_dir) = view_dir else { return };
    let fogs: Vec<NodeId> = graph
        .nodes()
        .filter(|(id, n)| reachable.contains(id) && matches!(n.kind, NodeKind::Fog { .. }))
        .map(|(id, _)| id)
        .collect();
    for fog in fogs {
        // Order-only connects never fail for live endpoints.
        let _ = graph.connect(view_dir, fog, ORDER_ONLY_PORT, false, Swizzle::IDENTITY);
    }
}
