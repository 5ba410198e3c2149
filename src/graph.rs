//! Graph model: nodes, routed edges, ownership and the mutation API used by
//! authoring tooling. Pure data structure; no template or context involved.

use std::collections::BTreeSet;
use std::fmt;

use crate::algebra::{Routing, Swizzle};
use crate::error::GraphError;
use crate::kinds::{self, NodeKind};

/// Stable arena index of a node. Ids survive removals and serialization.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub type PortIndex = u16;

/// First port index of the reserved internal range used for derived-quantity
/// inputs wired in by dependency expansion. Explicit ports stay below this.
pub const DERIVED_PORT_BASE: PortIndex = 0x80;

/// Reserved port index for ordering-only edges: honored by the scheduler,
/// ignored by the signature generator and the emitter.
pub const ORDER_ONLY_PORT: PortIndex = PortIndex::MAX;

pub fn is_derived_port(port: PortIndex) -> bool {
    (DERIVED_PORT_BASE..ORDER_ONLY_PORT).contains(&port)
}

/// A typed vertex in the graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Author-facing metadata, irrelevant to compilation.
    pub comment: String,
    pub position: [f32; 2],
}

impl Node {
    pub fn new(kind: NodeKind) -> Node {
        Node {
            kind,
            comment: String::new(),
            position: [0.0, 0.0],
        }
    }
}

/// A directed, single-destination-port data route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub port: PortIndex,
    pub negate: bool,
    pub swizzle: Swizzle,
}

impl Edge {
    pub fn routing(&self) -> Routing {
        Routing::new(self.negate, self.swizzle)
    }

    pub fn is_order_only(&self) -> bool {
        self.port == ORDER_ONLY_PORT
    }
}

/// The node set plus the edges connecting them.
///
/// Nodes live in a stable-id arena (a `BTreeMap` keyed by id, so iteration
/// and serialization are deterministic); edges are a flat list scanned on
/// port lookup, which stays cheap at the sizes material graphs reach.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: std::collections::BTreeMap<u32, Node>,
    edges: Vec<Edge>,
    next_id: u32,
}

impl Graph {
    pub fn new() -> Graph {
        Graph::default()
    }

    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        self.insert(Node::new(kind))
    }

    pub fn insert(&mut self, node: Node) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(id, node);
        NodeId(id)
    }

    /// Re-inserts a node under an explicit id (deserialization path).
    pub(crate) fn insert_with_id(&mut self, id: NodeId, node: Node) {
        self.nodes.insert(id.0, node);
        self.next_id = self.next_id.max(id.0 + 1);
    }

    pub(crate) fn set_next_id(&mut self, next_id: u32) {
        self.next_id = self.next_id.max(next_id);
    }

    pub(crate) fn next_id(&self) -> u32 {
        self.next_id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().map(|(&id, n)| (NodeId(id), n))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Removes a node and every edge touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(&id.0)?;
        self.edges.retain(|e| e.from != id && e.to != id);
        Some(node)
    }

    /// Deep value copy of a node, excluding its edges.
    pub fn duplicate_node(&mut self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id)?.clone();
        Some(self.insert(node))
    }

    /// Incoming edge at a specific port, if any. Linear scan; ports marked
    /// optional may legitimately have no edge.
    pub fn edge_at(&self, node: NodeId, port: PortIndex) -> Option<&Edge> {
        self.edges.iter().find(|e| e.to == node && e.port == port)
    }

    pub fn incoming(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.to == node)
    }

    pub fn outgoing(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.from == node)
    }

    /// Connects `from`'s output to `(to, port)` with the given routing.
    ///
    /// Rejects duplicate data edges on a port, edges to ports a kind does
    /// not declare, and data edges that would close a cycle. Ordering-only
    /// edges skip the occupancy and cycle rules but deduplicate themselves.
    pub fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        port: PortIndex,
        negate: bool,
        swizzle: Swizzle,
    ) -> Result<(), GraphError> {
        if self.node(from).is_none() {
            return Err(GraphError::MissingNode(from));
        }
        let dest = self.node(to).ok_or(GraphError::MissingNode(to))?;

        if port == ORDER_ONLY_PORT {
            let exists = self
                .edges
                .iter()
                .any(|e| e.from == from && e.to == to && e.is_order_only());
            if !exists {
                self.edges.push(Edge {
                    from,
                    to,
                    port,
                    negate: false,
                    swizzle: Swizzle::IDENTITY,
                });
            }
            return Ok(());
        }

        // Unknown kinds keep their payload edges; every other kind declares
        // its port surface.
        if !matches!(dest.kind, NodeKind::Unknown { .. })
            && !is_derived_port(port)
            && (port as usize) >= dest.kind.ports().len()
        {
            return Err(GraphError::NoSuchPort { node: to, port });
        }
        if self.edge_at(to, port).is_some() {
            return Err(GraphError::PortOccupied { node: to, port });
        }
        if from == to || self.upstream_reachable(from).contains(&to) {
            return Err(GraphError::WouldCycle { from, to });
        }

        self.edges.push(Edge {
            from,
            to,
            port,
            negate,
            swizzle,
        });
        Ok(())
    }

    pub fn disconnect(&mut self, to: NodeId, port: PortIndex) -> Result<Edge, GraphError> {
        let idx = self
            .edges
            .iter()
            .position(|e| e.to == to && e.port == port)
            .ok_or(GraphError::NoSuchEdge { node: to, port })?;
        Ok(self.edges.remove(idx))
    }

    /// Rewrites the negate/swizzle attributes of an existing edge.
    pub fn set_edge_routing(
        &mut self,
        to: NodeId,
        port: PortIndex,
        negate: bool,
        swizzle: Swizzle,
    ) -> Result<(), GraphError> {
        let edge = self
            .edges
            .iter_mut()
            .find(|e| e.to == to && e.port == port)
            .ok_or(GraphError::NoSuchEdge { node: to, port })?;
        edge.negate = negate;
        edge.swizzle = swizzle;
        Ok(())
    }

    /// Every node with a data path into `start`, including `start` itself.
    /// Ordering-only edges do not count as data paths.
    pub fn upstream_reachable(&self, start: NodeId) -> BTreeSet<NodeId> {
        let mut visited: BTreeSet<NodeId> = BTreeSet::new();
        let mut stack = vec![start];
        while let Some(n) = stack.pop() {
            if !visited.insert(n) {
                continue;
            }
            for e in self.incoming(n) {
                if !e.is_order_only() {
                    stack.push(e.from);
                }
            }
        }
        visited
    }

    /// Structural equality: same kind and scalar parameters (bit-exact), and
    /// the same data-edge shape per port (same upstream identity, same
    /// routing). Ordering-only edges are excluded, mirroring the signature.
    pub fn nodes_equal(&self, a: NodeId, b: NodeId) -> bool {
        let (Some(na), Some(nb)) = (self.node(a), self.node(b)) else {
            return false;
        };
        if !kinds::structurally_equal(&na.kind, &nb.kind) {
            return false;
        }
        let shape = |id: NodeId| {
            let mut edges: Vec<(PortIndex, NodeId, bool, Swizzle)> = self
                .incoming(id)
                .filter(|e| !e.is_order_only())
                .map(|e| (e.port, e.from, e.negate, e.swizzle))
                .collect();
            edges.sort_by_key(|&(port, from, ..)| (port, from));
            edges
        };
        shape(a) == shape(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::NodeKind;

    fn color(rgba: [f32; 4]) -> NodeKind {
        NodeKind::ConstantColor { rgba }
    }

    #[test]
    fn one_incoming_edge_per_port() {
        let mut g = Graph::new();
        let a = g.add_node(color([1.0, 0.0, 0.0, 1.0]));
        let b = g.add_node(color([0.0, 1.0, 0.0, 1.0]));
        let mul = g.add_node(NodeKind::Multiply);
        g.connect(a, mul, 0, false, Swizzle::IDENTITY).unwrap();
        assert_eq!(
            g.connect(b, mul, 0, false, Swizzle::IDENTITY),
            Err(GraphError::PortOccupied { node: mul, port: 0 })
        );
        // Fan-out from one source is fine.
        g.connect(a, mul, 1, false, Swizzle::IDENTITY).unwrap();
    }

    #[test]
    fn data_cycles_are_rejected() {
        let mut g = Graph::new();
        let add1 = g.add_node(NodeKind::Add);
        let add2 = g.add_node(NodeKind::Add);
        g.connect(add1, add2, 0, false, Swizzle::IDENTITY).unwrap();
        assert_eq!(
            g.connect(add2, add1, 0, false, Swizzle::IDENTITY),
            Err(GraphError::WouldCycle {
                from: add2,
                to: add1
            })
        );
        assert_eq!(
            g.connect(add1, add1, 1, false, Swizzle::IDENTITY),
            Err(GraphError::WouldCycle {
                from: add1,
                to: add1
            })
        );
    }

    #[test]
    fn order_only_edges_may_coexist_with_data() {
        let mut g = Graph::new();
        let a = g.add_node(color([0.0; 4]));
        let b = g.add_node(NodeKind::Add);
        g.connect(a, b, 0, false, Swizzle::IDENTITY).unwrap();
        g.connect(a, b, ORDER_ONLY_PORT, false, Swizzle::IDENTITY)
            .unwrap();
        // Duplicate ordering constraints collapse.
        g.connect(a, b, ORDER_ONLY_PORT, false, Swizzle::IDENTITY)
            .unwrap();
        assert_eq!(g.edges().iter().filter(|e| e.is_order_only()).count(), 1);
    }

    #[test]
    fn ports_outside_the_kind_surface_are_rejected() {
        let mut g = Graph::new();
        let a = g.add_node(color([0.0; 4]));
        let out = g.add_node(NodeKind::OutputColor);
        assert_eq!(
            g.connect(a, out, 3, false, Swizzle::IDENTITY),
            Err(GraphError::NoSuchPort { node: out, port: 3 })
        );
    }

    #[test]
    fn removal_drops_touching_edges() {
        let mut g = Graph::new();
        let a = g.add_node(color([0.0; 4]));
        let mul = g.add_node(NodeKind::Multiply);
        g.connect(a, mul, 0, false, Swizzle::IDENTITY).unwrap();
        let removed = g.remove_node(a).unwrap();
        assert!(matches!(removed.kind, NodeKind::ConstantColor { .. }));
        assert!(g.edges().is_empty());
        // Ids are not reused.
        let c = g.add_node(color([0.0; 4]));
        assert!(c.0 > mul.0);
    }

    #[test]
    fn duplicate_excludes_edges() {
        let mut g = Graph::new();
        let a = g.add_node(color([0.5, 0.5, 0.5, 1.0]));
        let mul = g.add_node(NodeKind::Multiply);
        g.connect(a, mul, 0, false, Swizzle::IDENTITY).unwrap();
        let copy = g.duplicate_node(mul).unwrap();
        assert!(g.incoming(copy).next().is_none());
    }

    #[test]
    fn structural_equality_sees_routing() {
        let mut g = Graph::new();
        let src = g.add_node(color([1.0, 1.0, 1.0, 1.0]));
        let m1 = g.add_node(NodeKind::Multiply);
        let m2 = g.add_node(NodeKind::Multiply);
        for m in [m1, m2] {
            g.connect(src, m, 0, false, Swizzle::IDENTITY).unwrap();
            g.connect(src, m, 1, true, Swizzle::broadcast(0)).unwrap();
        }
        assert!(g.nodes_equal(m1, m2));
        g.set_edge_routing(m2, 1, false, Swizzle::broadcast(0))
            .unwrap();
        assert!(!g.nodes_equal(m1, m2));
    }

    #[test]
    fn equality_requires_bit_exact_parameters() {
        let mut g = Graph::new();
        let a = g.add_node(color([0.0, 0.0, 0.0, 1.0]));
        let b = g.add_node(color([-0.0, 0.0, 0.0, 1.0]));
        assert!(!g.nodes_equal(a, b));
    }
}
