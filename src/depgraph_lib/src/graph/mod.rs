//! The abstract pointer graph that all analyses operate on.
//!
//! A [`PointerGraph`] is a typed node graph produced by a front-end.
//! Nodes model memory events (allocations, loads, stores, address
//! arithmetic), data flow joins and control events (calls, entries,
//! returns). Nodes carry operand edges (data dependencies) and
//! intraprocedural successor/predecessor edges that give the fixpoint a
//! control-like processing order; the successor relation may be sparser
//! than the source control flow graph.
//!
//! Nodes are owned by the graph arena and referenced by stable [`NodeId`]s.
//! Every graph starts out with three sentinel nodes representing the null
//! region, the unknown memory region and the invalidated region.

use crate::pointer::{Offset, Pointer, PointsToSet};
use crate::prelude::*;

mod validator;
pub use validator::*;

/// The stable identifier of a node inside a [`PointerGraph`].
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The sentinel node representing the null memory region.
    pub const NULL_NODE: NodeId = NodeId(0);
    /// The sentinel node representing unknown memory.
    pub const UNKNOWN_NODE: NodeId = NodeId(1);
    /// The sentinel node representing invalidated (freed) memory.
    pub const INVALIDATED_NODE: NodeId = NodeId(2);

    /// Create a node ID from a raw index.
    pub fn new(index: usize) -> NodeId {
        NodeId(index)
    }

    /// The raw index of the node in its graph arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// The stable identifier of a procedure subgraph inside a [`PointerGraph`].
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct SubgraphId(usize);

impl SubgraphId {
    /// The subgraph holding the sentinel nodes and global allocations.
    pub const GLOBAL: SubgraphId = SubgraphId(0);

    /// The raw index of the subgraph in its graph arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for SubgraphId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// The kind of a pointer graph node.
///
/// All nodes share a common header (ID, operands, successor/predecessor
/// edges, parent subgraph, points-to set). Kinds carry a payload only where
/// the operation needs one, e.g. the address computation carries its offset
/// and memory transfers carry their byte length.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum NodeKind {
    /// A static allocation (stack slot or global).
    Alloc {
        /// Whether the allocated region lives on the heap.
        is_heap: bool,
        /// Whether the allocated region is a global.
        is_global: bool,
    },
    /// A dynamic (heap) allocation.
    DynAlloc,
    /// A load through the pointer operand.
    /// `length` is the byte length of the accessed cell, for the
    /// reaching-definitions analysis.
    Load {
        /// Byte length of the loaded cell.
        length: Offset,
    },
    /// A store of operand 0 through the pointer operand 1.
    Store {
        /// Byte length of the stored cell.
        length: Offset,
    },
    /// Address computation: add `offset` to every pointer of the operand.
    Gep {
        /// The byte offset added to the operand pointers.
        offset: Offset,
    },
    /// A pointer cast; forwards the operand's points-to set unchanged.
    Cast,
    /// A data-flow join of its operands (arbitrary arity >= 1).
    Phi,
    /// A direct call; its successors include the callee entry nodes.
    Call,
    /// The join point fed by the callee return nodes of a call.
    CallReturn,
    /// A call through a function pointer; operand 0 is the call target.
    CallFuncPtr,
    /// The entry node of a procedure subgraph.
    Entry,
    /// The return node of a procedure subgraph; operands are the returned
    /// values.
    Return,
    /// A node without any effect on the analysis state.
    Noop,
    /// Copy `length` bytes from the region of operand 0 to the region of
    /// operand 1.
    Memcpy {
        /// The number of copied bytes.
        length: Offset,
    },
    /// Deallocate the memory pointed to by the operand.
    Free,
    /// Invalidate all local (non-heap, non-global) memory of the enclosing
    /// procedure; placed before procedure returns.
    InvalidateLocals,
    /// Invalidate the object(s) pointed to by the operand.
    InvalidateObject,
    /// A function; pointers with a `Function` target are resolved as call
    /// targets of function-pointer calls.
    Function {
        /// The procedure subgraph implementing the function.
        subgraph: SubgraphId,
    },
    /// A non-pointer constant.
    Constant,
    /// The null memory region.
    NullAddr,
    /// The unknown memory region.
    UnknownMem,
    /// A control-flow join without data-flow semantics.
    Join,
}

impl NodeKind {
    /// The upper-case name of the node kind, used in diagnostics.
    pub fn name(&self) -> &'static str {
        use NodeKind::*;
        match self {
            Alloc { .. } => "ALLOC",
            DynAlloc => "DYN_ALLOC",
            Load { .. } => "LOAD",
            Store { .. } => "STORE",
            Gep { .. } => "GEP",
            Cast => "CAST",
            Phi => "PHI",
            Call => "CALL",
            CallReturn => "CALL_RETURN",
            CallFuncPtr => "CALL_FUNCPTR",
            Entry => "ENTRY",
            Return => "RETURN",
            Noop => "NOOP",
            Memcpy { .. } => "MEMCPY",
            Free => "FREE",
            InvalidateLocals => "INVALIDATE_LOCALS",
            InvalidateObject => "INVALIDATE_OBJECT",
            Function { .. } => "FUNCTION",
            Constant => "CONSTANT",
            NullAddr => "NULL_ADDR",
            UnknownMem => "UNKNOWN_MEM",
            Join => "JOIN",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "{}", self.name())
    }
}

/// A node of the pointer graph.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct PointerGraphNode {
    id: NodeId,
    kind: NodeKind,
    operands: Vec<NodeId>,
    successors: Vec<NodeId>,
    predecessors: Vec<NodeId>,
    parent: SubgraphId,
    points_to: PointsToSet,
    /// Opaque per-node data of the front-end; never interpreted by the core.
    user_data: Option<serde_json::Value>,
}

impl PointerGraphNode {
    /// The stable ID of the node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The kind of the node.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The operand list of the node.
    pub fn operands(&self) -> &[NodeId] {
        &self.operands
    }

    /// The `idx`-th operand. Panics when the operand does not exist;
    /// the validator rejects graphs with wrong operand arities upfront.
    pub fn operand(&self, idx: usize) -> NodeId {
        self.operands[idx]
    }

    /// The intraprocedural successor nodes.
    pub fn successors(&self) -> &[NodeId] {
        &self.successors
    }

    /// The intraprocedural predecessor nodes.
    pub fn predecessors(&self) -> &[NodeId] {
        &self.predecessors
    }

    /// If the node has exactly one predecessor, return it.
    pub fn single_predecessor(&self) -> Option<NodeId> {
        if self.predecessors.len() == 1 {
            Some(self.predecessors[0])
        } else {
            None
        }
    }

    /// The procedure subgraph the node belongs to.
    pub fn parent(&self) -> SubgraphId {
        self.parent
    }

    /// The points-to set computed for this node.
    pub fn points_to(&self) -> &PointsToSet {
        &self.points_to
    }

    /// Mutable access to the node's points-to set.
    pub fn points_to_mut(&mut self) -> &mut PointsToSet {
        &mut self.points_to
    }

    /// Whether the memory region named by this node lives on the heap.
    pub fn is_heap(&self) -> bool {
        match self.kind {
            NodeKind::DynAlloc => true,
            NodeKind::Alloc { is_heap, .. } => is_heap,
            _ => false,
        }
    }

    /// Whether the memory region named by this node is a global.
    pub fn is_global(&self) -> bool {
        match self.kind {
            NodeKind::Alloc { is_global, .. } => is_global,
            _ => self.parent == SubgraphId::GLOBAL,
        }
    }

    /// Whether this node kind produces a points-to set of its own.
    pub fn is_pointer_kind(&self) -> bool {
        use NodeKind::*;
        matches!(
            self.kind,
            Alloc { .. }
                | DynAlloc
                | Load { .. }
                | Gep { .. }
                | Cast
                | Phi
                | CallReturn
                | Return
                | Function { .. }
                | Constant
                | NullAddr
                | UnknownMem
        )
    }

    /// The opaque front-end data attached to this node.
    pub fn user_data(&self) -> Option<&serde_json::Value> {
        self.user_data.as_ref()
    }

    /// Attach opaque front-end data to this node.
    pub fn set_user_data(&mut self, data: serde_json::Value) {
        self.user_data = Some(data);
    }
}

/// A procedure subgraph of the pointer graph.
///
/// Interprocedural edges are entry/return pairs associated with call nodes:
/// a call node gains successor edges to the entries of its candidate
/// callees, and the callee returns become predecessors of the call's
/// `CallReturn` join node.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Subgraph {
    id: SubgraphId,
    entry: Option<NodeId>,
    ret: Option<NodeId>,
}

impl Subgraph {
    /// The stable ID of the subgraph.
    pub fn id(&self) -> SubgraphId {
        self.id
    }

    /// The entry node of the procedure, if set.
    pub fn entry(&self) -> Option<NodeId> {
        self.entry
    }

    /// The return node of the procedure, if set.
    pub fn ret(&self) -> Option<NodeId> {
        self.ret
    }
}

/// The pointer graph arena: nodes, procedure subgraphs and the sentinel
/// nodes for null, unknown and invalidated memory.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct PointerGraph {
    nodes: Vec<PointerGraphNode>,
    subgraphs: Vec<Subgraph>,
}

impl Default for PointerGraph {
    fn default() -> PointerGraph {
        PointerGraph::new()
    }
}

impl PointerGraph {
    /// Create a new pointer graph containing the global subgraph and the
    /// three sentinel nodes.
    pub fn new() -> PointerGraph {
        let mut graph = PointerGraph {
            nodes: Vec::new(),
            subgraphs: vec![Subgraph {
                id: SubgraphId::GLOBAL,
                entry: None,
                ret: None,
            }],
        };
        let null_node = graph.add_node(SubgraphId::GLOBAL, NodeKind::NullAddr, &[]);
        let unknown_node = graph.add_node(SubgraphId::GLOBAL, NodeKind::UnknownMem, &[]);
        let invalidated_node = graph.add_node(SubgraphId::GLOBAL, NodeKind::Noop, &[]);
        debug_assert_eq!(null_node, NodeId::NULL_NODE);
        debug_assert_eq!(unknown_node, NodeId::UNKNOWN_NODE);
        debug_assert_eq!(invalidated_node, NodeId::INVALIDATED_NODE);
        graph
    }

    /// Add a new procedure subgraph.
    pub fn add_subgraph(&mut self) -> SubgraphId {
        let id = SubgraphId(self.subgraphs.len());
        self.subgraphs.push(Subgraph {
            id,
            entry: None,
            ret: None,
        });
        id
    }

    /// Add a new node to the given subgraph and return its ID.
    ///
    /// Address-producing constants get their points-to set right away:
    /// the null sentinel points to the null region, the unknown-memory
    /// sentinel to unknown memory and a function node to itself.
    pub fn add_node(
        &mut self,
        subgraph: SubgraphId,
        kind: NodeKind,
        operands: &[NodeId],
    ) -> NodeId {
        assert!(
            subgraph.index() < self.subgraphs.len(),
            "Unknown subgraph {}",
            subgraph
        );
        let id = NodeId(self.nodes.len());
        let mut points_to = PointsToSet::new();
        match kind {
            NodeKind::NullAddr => {
                points_to.add(Pointer::null());
            }
            NodeKind::UnknownMem => {
                points_to.add(Pointer::unknown());
            }
            NodeKind::Function { .. } => {
                points_to.add(Pointer::new(id, Offset::new(0)));
            }
            _ => (),
        }
        self.nodes.push(PointerGraphNode {
            id,
            kind,
            operands: operands.to_vec(),
            successors: Vec::new(),
            predecessors: Vec::new(),
            parent: subgraph,
            points_to,
            user_data: None,
        });
        id
    }

    /// Add an intraprocedural successor edge (and the predecessor
    /// back-edge). A duplicate edge is a no-op; returns whether the edge
    /// was inserted.
    pub fn add_successor(&mut self, from: NodeId, to: NodeId) -> bool {
        assert!(self.contains(from) && self.contains(to), "Unknown node");
        if self.nodes[from.index()].successors.contains(&to) {
            return false;
        }
        self.nodes[from.index()].successors.push(to);
        self.nodes[to.index()].predecessors.push(from);
        true
    }

    /// Append an operand to a node. Used when function-pointer resolution
    /// discovers a new callee and feeds its return node into the call's
    /// join point.
    pub fn add_operand(&mut self, node: NodeId, operand: NodeId) {
        assert!(self.contains(node) && self.contains(operand), "Unknown node");
        self.nodes[node.index()].operands.push(operand);
    }

    /// Returns whether the given ID refers to a node of this graph.
    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Immutable access to a node. Panics on an unknown ID.
    pub fn node(&self, id: NodeId) -> &PointerGraphNode {
        &self.nodes[id.index()]
    }

    /// Mutable access to a node. Panics on an unknown ID.
    pub fn node_mut(&mut self, id: NodeId) -> &mut PointerGraphNode {
        &mut self.nodes[id.index()]
    }

    /// Iterate over all nodes in ID order.
    pub fn nodes(&self) -> impl Iterator<Item = &PointerGraphNode> {
        self.nodes.iter()
    }

    /// Iterate over all node IDs.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// The number of nodes in the graph (including the sentinels).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Immutable access to a subgraph. Panics on an unknown ID.
    pub fn subgraph(&self, id: SubgraphId) -> &Subgraph {
        &self.subgraphs[id.index()]
    }

    /// Iterate over all subgraphs.
    pub fn subgraphs(&self) -> impl Iterator<Item = &Subgraph> {
        self.subgraphs.iter()
    }

    /// Mark `entry` as the entry node of `subgraph`.
    pub fn set_entry(&mut self, subgraph: SubgraphId, entry: NodeId) {
        assert!(self.contains(entry), "Unknown node");
        self.subgraphs[subgraph.index()].entry = Some(entry);
    }

    /// Mark `ret` as the return node of `subgraph`.
    pub fn set_return(&mut self, subgraph: SubgraphId, ret: NodeId) {
        assert!(self.contains(ret), "Unknown node");
        self.subgraphs[subgraph.index()].ret = Some(ret);
    }

    /// The points-to set computed for the given node.
    pub fn points_to(&self, id: NodeId) -> &PointsToSet {
        self.node(id).points_to()
    }
}
