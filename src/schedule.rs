//! Statement scheduling and resource allocation.
//!
//! Walks the expanded graph in dependency order, decides which nodes bind a
//! register, and interns every interpolant, literal, texture and material
//! parameter exactly once. The emitter consumes the resulting [`Allocation`]
//! verbatim; nothing after this pass makes layout decisions.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::context::{CompileContext, TextureRef};
use crate::error::CompileError;
use crate::graph::{Graph, NodeId};
use crate::kinds::{self, Interpolant, Literal};

/// How a node's value is referenced downstream.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RegisterAssign {
    /// Bound to a fresh `r{n}` register by its own statements.
    Register(u16),
    /// Forwards its single input; consumers look through it.
    PassThrough,
    /// Folded into consumer expressions (constants, uniforms, varyings).
    Inline,
}

#[derive(Clone, Copy, Debug)]
pub struct NodeAlloc {
    pub assign: RegisterAssign,
    pub temporaries: u16,
}

/// The complete scheduling result for one (graph, context) pair.
#[derive(Clone, Debug, Default)]
pub struct Allocation {
    /// Emission order over every reachable node, register-bound or not.
    pub order: Vec<NodeId>,
    pub register_count: u16,
    /// Interpolants in table order; the position is the varying location.
    pub interpolants: Vec<Interpolant>,
    /// Deduplicated constants; the position is the `k{i}` index.
    pub literals: Vec<Literal>,
    /// Deduplicated texture bindings; the position is the `t{i}` index.
    pub textures: Vec<TextureRef>,
    /// Material parameter names in first-use order.
    pub params: Vec<String>,
    per_node: BTreeMap<NodeId, NodeAlloc>,
    literal_slots: BTreeMap<NodeId, Vec<(&'static str, usize)>>,
    texture_slots: BTreeMap<NodeId, usize>,
}

impl Allocation {
    pub fn assign(&self, id: NodeId) -> Option<NodeAlloc> {
        self.per_node.get(&id).copied()
    }

    /// Index of the named literal interned by `node`.
    pub fn literal_index(&self, node: NodeId, name: &str) -> Option<usize> {
        self.literal_slots
            .get(&node)?
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, i)| i)
    }

    /// Texture binding slot registered by `node`.
    pub fn texture_index(&self, node: NodeId) -> Option<usize> {
        self.texture_slots.get(&node).copied()
    }

    pub fn interpolant_location(&self, q: Interpolant) -> Option<usize> {
        self.interpolants.iter().position(|&i| i == q)
    }
}

fn intern<T: PartialEq + Clone>(list: &mut Vec<T>, value: &T) -> usize {
    match list.iter().position(|v| v == value) {
        Some(i) => i,
        None => {
            list.push(value.clone());
            list.len() - 1
        }
    }
}

/// Schedules the reachable subgraph under `terminal`.
///
/// Ready nodes (all predecessors scheduled, ordering-only edges included)
/// are picked deepest-first, ties to the smallest id, which keeps long
/// dependency chains contiguous and the order deterministic.
pub fn schedule(
    graph: &Graph,
    ctx: &CompileContext,
    terminal: NodeId,
) -> Result<Allocation, CompileError> {
    let reachable = graph.upstream_reachable(terminal);

    let mut pending: BTreeMap<NodeId, usize> = reachable.iter().map(|&id| (id, 0)).collect();
    let mut depth: BTreeMap<NodeId, usize> = reachable.iter().map(|&id| (id, 0)).collect();
    for edge in graph.edges() {
        if reachable.contains(&edge.from) && reachable.contains(&edge.to) {
            if let Some(n) = pending.get_mut(&edge.to) {
                *n += 1;
            }
        }
    }

    let mut ready: BTreeSet<(usize, NodeId)> = BTreeSet::new();
    for (&id, &n) in &pending {
        if n == 0 {
            ready.insert((0, id));
        }
    }

    let mut alloc = Allocation::default();
    let mut interpolants: BTreeSet<Interpolant> = BTreeSet::new();
    let mut next_register: u16 = 0;

    while let Some(&(d, id)) = ready.iter().max_by_key(|&&(d, id)| (d, std::cmp::Reverse(id))) {
        ready.remove(&(d, id));

        let data = kinds::generate_data(graph, id, ctx)?;
        let assign = if data.needs_register {
            let r = next_register;
            next_register += 1;
            RegisterAssign::Register(r)
        } else if data.passthrough {
            RegisterAssign::PassThrough
        } else {
            RegisterAssign::Inline
        };
        trace!(node = %id, ?assign, "scheduled");

        interpolants.extend(data.interpolants.iter().copied());
        let slots: Vec<(&'static str, usize)> = data
            .literals
            .iter()
            .map(|&(name, lit)| (name, intern(&mut alloc.literals, &lit)))
            .collect();
        if !slots.is_empty() {
            alloc.literal_slots.insert(id, slots);
        }
        if let Some(texture) = data.textures.first() {
            let slot = intern(&mut alloc.textures, texture);
            alloc.texture_slots.insert(id, slot);
        }
        for name in &data.params {
            intern(&mut alloc.params, name);
        }

        alloc.order.push(id);
        alloc.per_node.insert(
            id,
            NodeAlloc {
                assign,
                temporaries: data.temporaries,
            },
        );

        for edge in graph.outgoing(id) {
            if !reachable.contains(&edge.to) {
                continue;
            }
            let Some(n) = pending.get_mut(&edge.to) else { continue };
            if *n == 0 {
                continue;
            }
            *n -= 1;
            let nd = depth.get(&id).copied().unwrap_or(0) + 1;
            let entry = depth.entry(edge.to).or_insert(0);
            if nd > *entry {
                *entry = nd;
            }
            if *n == 0 {
                ready.insert((*depth.get(&edge.to).unwrap_or(&0), edge.to));
            }
        }
    }

    if alloc.order.len() != reachable.len() {
        let stuck = reachable
            .iter()
            .find(|id| !alloc.per_node.contains_key(id))
            .copied()
            .unwrap_or(terminal);
        return Err(CompileError::Cycle { node: stuck });
    }

    alloc.register_count = next_register;
    alloc.interpolants = interpolants.into_iter().collect();
    Ok(alloc)
}
