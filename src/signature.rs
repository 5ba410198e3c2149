//! Structural program signatures.
//!
//! A signature is the cache key for a compiled program: a word stream
//! covering the context, every reachable node's kind and parameters, and
//! every data edge with its routing. Two graphs with equal signatures
//! lower to identical text, so a false cache hit is impossible; a false
//! miss only costs a recompile.

use std::collections::{BTreeMap, BTreeSet};

use crate::context::CompileContext;
use crate::error::CompileError;
use crate::graph::{Graph, NodeId};
use crate::kinds;

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Signature {
    words: Vec<u32>,
}

impl Signature {
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Little-endian byte form, used as the cache map key.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.words.len() * 4);
        for w in &self.words {
            out.extend_from_slice(&w.to_le_bytes());
        }
        out
    }
}

/// Length-prefixed string packing, four bytes per word.
pub(crate) fn push_str_words(out: &mut Vec<u32>, s: &str) {
    out.push(s.len() as u32);
    for chunk in s.as_bytes().chunks(4) {
        let mut word = 0u32;
        for (i, &b) in chunk.iter().enumerate() {
            word |= (b as u32) << (8 * i);
        }
        out.push(word);
    }
}

/// Deterministic topological order of the nodes reachable from `terminal`,
/// over data edges only. Ready nodes break ties by smallest id.
pub(crate) fn topo_order(graph: &Graph, terminal: NodeId) -> Result<Vec<NodeId>, CompileError> {
    let reachable = graph.upstream_reachable(terminal);
    let mut indegree: BTreeMap<NodeId, usize> = reachable.iter().map(|&id| (id, 0)).collect();
    for edge in graph.edges() {
        if !edge.is_order_only() && reachable.contains(&edge.to) && reachable.contains(&edge.from)
        {
            if let Some(d) = indegree.get_mut(&edge.to) {
                *d += 1;
            }
        }
    }
    let mut ready: BTreeSet<NodeId> = indegree
        .iter()
        .filter(|&(_, &d)| d == 0)
        .map(|(&id, _)| id)
        .collect();
    let mut order = Vec::with_capacity(reachable.len());
    while let Some(&next) = ready.iter().next() {
        ready.remove(&next);
        order.push(next);
        for edge in graph.outgoing(next) {
            if edge.is_order_only() || !reachable.contains(&edge.to) {
                continue;
            }
            if let Some(d) = indegree.get_mut(&edge.to) {
                *d -= 1;
                if *d == 0 {
                    ready.insert(edge.to);
                }
            }
        }
    }
    if order.len() != reachable.len() {
        let stuck = reachable
            .iter()
            .find(|id| !order.contains(id))
            .copied()
            .unwrap_or(terminal);
        return Err(CompileError::Cycle { node: stuck });
    }
    Ok(order)
}

/// Computes the signature of an already-expanded graph.
pub fn expanded_signature(
    graph: &Graph,
    ctx: &CompileContext,
    terminal: NodeId,
) -> Result<Signature, CompileError> {
    let order = topo_order(graph, terminal)?;
    let index: BTreeMap<NodeId, u32> = order
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i as u32))
        .collect();

    let mut words = Vec::with_capacity(order.len() * 4 + 16);
    ctx.signature_words(&mut words);
    for &id in &order {
        let Some(node) = graph.node(id) else { continue };
        words.push(node.kind.tag());
        let mut edges: Vec<_> = graph
            .incoming(id)
            .filter(|e| !e.is_order_only())
            .collect();
        edges.sort_by_key(|e| e.port);
        for edge in edges {
            let Some(&from) = index.get(&edge.from) else {
                continue;
            };
            words.push(((edge.port as u32) << 24) | from);
            let routing = edge.routing();
            // Identity routings contribute nothing: a plain wire and an
            // explicit `xyzw` swizzle are the same program.
            if !routing.is_identity() {
                words.push(routing.signature_word(edge.port));
            }
        }
        kinds::signature_extras(&node.kind, ctx, &mut words);
    }
    Ok(Signature { words })
}
