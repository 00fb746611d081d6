//! Basic blocks, the per-procedure block graph and the analyses computed on
//! top of it: dominator and post-dominator trees, dominance frontiers and
//! control-dependence edges.
//!
//! Blocks form cyclic structures (predecessor/successor duality,
//! control-dependence pairs), so they are owned by a [`DependenceGraph`]
//! arena and reference each other through stable [`BlockId`]s.

use crate::graph::NodeId;
use crate::prelude::*;
use std::collections::BTreeSet;

mod control_dependence;
mod dominance;
pub use control_dependence::*;
pub use dominance::*;

/// The stable identifier of a block inside a [`DependenceGraph`].
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct BlockId(usize);

impl BlockId {
    pub(crate) fn from_index(index: usize) -> BlockId {
        BlockId(index)
    }

    /// The raw index of the block in its graph arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A labelled successor edge between basic blocks.
///
/// The label is stored on the forward edge only; predecessor sets are
/// unlabelled.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct BlockEdge {
    /// The target block of the edge.
    pub target: BlockId,
    /// The edge label, e.g. the branch index the edge corresponds to.
    pub label: u32,
}

impl BlockEdge {
    /// Create a new edge.
    pub fn new(target: BlockId, label: u32) -> BlockEdge {
        BlockEdge { target, label }
    }
}

/// A basic block: an ordered sequence of pointer graph nodes together with
/// the edge sets maintained by the block graph and the result slots of the
/// dominance and control-dependence analyses.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct BasicBlock {
    nodes: Vec<NodeId>,
    successors: BTreeSet<BlockEdge>,
    predecessors: BTreeSet<BlockId>,
    control_deps: BTreeSet<BlockId>,
    rev_control_deps: BTreeSet<BlockId>,
    dom_frontiers: BTreeSet<BlockId>,
    post_dom_frontiers: BTreeSet<BlockId>,
    idom: Option<BlockId>,
    ipostdom: Option<BlockId>,
    dom_children: BTreeSet<BlockId>,
    post_dom_children: BTreeSet<BlockId>,
    call_sites: BTreeSet<NodeId>,
    slice_id: u64,
}

impl BasicBlock {
    /// The nodes of the block in program order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// The first node of the block, or `None` when the block is empty.
    pub fn first_node(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    /// The last node of the block, or `None` when the block is empty.
    pub fn last_node(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    /// The labelled successor edges of the block.
    pub fn successors(&self) -> &BTreeSet<BlockEdge> {
        &self.successors
    }

    /// The predecessor blocks.
    pub fn predecessors(&self) -> &BTreeSet<BlockId> {
        &self.predecessors
    }

    /// The number of successor edges.
    pub fn successors_num(&self) -> usize {
        self.successors.len()
    }

    /// The number of predecessor blocks.
    pub fn predecessors_num(&self) -> usize {
        self.predecessors.len()
    }

    /// Returns true iff all successor edges point to the same target,
    /// ignoring the edge labels. Blocks with fewer than two successors
    /// trivially qualify.
    pub fn successors_are_same(&self) -> bool {
        let mut targets = self.successors.iter().map(|edge| edge.target);
        match targets.next() {
            None => true,
            Some(first) => targets.all(|target| target == first),
        }
    }

    /// The blocks whose execution depends on this block.
    pub fn control_deps(&self) -> &BTreeSet<BlockId> {
        &self.control_deps
    }

    /// The reverse control-dependence set: the blocks this block's
    /// execution depends on.
    pub fn rev_control_deps(&self) -> &BTreeSet<BlockId> {
        &self.rev_control_deps
    }

    /// Returns whether this block controls any other block.
    pub fn has_control_dependence(&self) -> bool {
        !self.control_deps.is_empty()
    }

    /// The dominance frontier of the block.
    pub fn dom_frontiers(&self) -> &BTreeSet<BlockId> {
        &self.dom_frontiers
    }

    /// The post-dominance frontier of the block.
    pub fn post_dom_frontiers(&self) -> &BTreeSet<BlockId> {
        &self.post_dom_frontiers
    }

    /// The immediate dominator, if computed.
    pub fn idom(&self) -> Option<BlockId> {
        self.idom
    }

    /// The immediate post-dominator, if computed.
    pub fn ipostdom(&self) -> Option<BlockId> {
        self.ipostdom
    }

    /// The children of the block in the dominator tree.
    pub fn dom_children(&self) -> &BTreeSet<BlockId> {
        &self.dom_children
    }

    /// The children of the block in the post-dominator tree.
    pub fn post_dom_children(&self) -> &BTreeSet<BlockId> {
        &self.post_dom_children
    }

    /// The call sites registered in this block.
    pub fn call_sites(&self) -> &BTreeSet<NodeId> {
        &self.call_sites
    }

    /// The slice this block belongs to; 0 when unsliced.
    pub fn slice_id(&self) -> u64 {
        self.slice_id
    }

    /// Assign the block to a slice.
    pub fn set_slice(&mut self, slice_id: u64) {
        self.slice_id = slice_id;
    }

    /// Register a call-site node contained in this block.
    pub fn add_call_site(&mut self, node: NodeId) -> bool {
        self.call_sites.insert(node)
    }

    /// Remove a registered call site. Returns whether it was present.
    pub fn remove_call_site(&mut self, node: NodeId) -> bool {
        self.call_sites.remove(&node)
    }
}

/// The arena owning the basic blocks of one procedure together with their
/// edges.
///
/// All operations that touch more than one block (edge insertion,
/// isolation, control dependence) live here, so that the symmetric
/// invariant `B in A.successors <=> A in B.predecessors` can be maintained
/// in one place.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct DependenceGraph {
    blocks: Vec<BasicBlock>,
    entry: Option<BlockId>,
}

impl DependenceGraph {
    /// Create an empty block graph.
    pub fn new() -> DependenceGraph {
        DependenceGraph::default()
    }

    /// Add a new, empty block.
    pub fn add_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock::default());
        id
    }

    /// Mark a block as the entry block of the procedure.
    pub fn set_entry(&mut self, entry: BlockId) {
        assert!(entry.index() < self.blocks.len(), "Unknown block");
        self.entry = Some(entry);
    }

    /// The entry block of the procedure, if set.
    pub fn entry(&self) -> Option<BlockId> {
        self.entry
    }

    /// Immutable access to a block. Panics on an unknown ID.
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    /// Mutable access to a block. Panics on an unknown ID.
    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.index()]
    }

    /// The number of blocks in the graph.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Iterate over all block IDs.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.blocks.len()).map(BlockId)
    }

    /// Iterate over all blocks in ID order.
    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.blocks.iter()
    }

    /// Append a node to the end of a block.
    pub fn append(&mut self, block: BlockId, node: NodeId) {
        self.block_mut(block).nodes.push(node);
    }

    /// Prepend a node to the beginning of a block.
    pub fn prepend(&mut self, block: BlockId, node: NodeId) {
        self.block_mut(block).nodes.insert(0, node);
    }

    /// Add a labelled successor edge `from -> to` and the predecessor
    /// back-edge. A duplicate `(target, label)` pair is a no-op; returns
    /// whether the edge was inserted.
    pub fn add_successor(&mut self, from: BlockId, to: BlockId, label: u32) -> bool {
        let inserted = self
            .block_mut(from)
            .successors
            .insert(BlockEdge::new(to, label));
        self.block_mut(to).predecessors.insert(from);
        inserted
    }

    /// Remove one labelled successor edge (and the predecessor back-edge,
    /// unless a parallel edge with another label remains).
    pub fn remove_successor(&mut self, from: BlockId, edge: BlockEdge) {
        self.block_mut(from).successors.remove(&edge);
        if !self
            .block(from)
            .successors
            .iter()
            .any(|e| e.target == edge.target)
        {
            self.block_mut(edge.target).predecessors.remove(&from);
        }
    }

    /// Remove all successor edges from `from` to `target`, regardless of
    /// label. Returns the number of removed edges.
    pub fn remove_successors_target(&mut self, from: BlockId, target: BlockId) -> usize {
        let block = self.block_mut(from);
        let before = block.successors.len();
        block.successors.retain(|edge| edge.target != target);
        let removed = before - block.successors.len();
        if removed > 0 {
            self.block_mut(target).predecessors.remove(&from);
        }
        removed
    }

    /// Remove all successor edges of a block.
    pub fn remove_successors(&mut self, block: BlockId) {
        let successors = std::mem::take(&mut self.block_mut(block).successors);
        for edge in successors {
            self.block_mut(edge.target).predecessors.remove(&block);
        }
    }

    /// Remove all predecessor edges of a block.
    pub fn remove_predecessors(&mut self, block: BlockId) {
        let predecessors = std::mem::take(&mut self.block_mut(block).predecessors);
        for pred in predecessors {
            self.block_mut(pred)
                .successors
                .retain(|edge| edge.target != block);
        }
    }

    /// Returns whether the block has an edge to itself.
    pub fn has_self_loop(&self, block: BlockId) -> bool {
        self.block(block)
            .successors
            .iter()
            .any(|edge| edge.target == block)
    }

    /// Add a control-dependence edge `from -> to` (with the symmetric
    /// reverse edge). Returns whether the edge was inserted.
    pub fn add_control_dependence(&mut self, from: BlockId, to: BlockId) -> bool {
        let inserted = self.block_mut(from).control_deps.insert(to);
        let inserted_rev = self.block_mut(to).rev_control_deps.insert(from);
        // we either have both edges or none
        debug_assert_eq!(inserted, inserted_rev);
        inserted
    }

    /// Set the immediate dominator of `block` and register `block` as a
    /// dominator-tree child of `idom`.
    pub fn set_idom(&mut self, block: BlockId, idom: BlockId) {
        assert!(
            self.block(block).idom.is_none(),
            "Block already has an immediate dominator"
        );
        self.block_mut(block).idom = Some(idom);
        self.block_mut(idom).dom_children.insert(block);
    }

    /// Set the immediate post-dominator of `block` and register `block` as
    /// a post-dominator-tree child of `ipostdom`.
    pub fn set_ipostdom(&mut self, block: BlockId, ipostdom: BlockId) {
        assert!(
            self.block(block).ipostdom.is_none(),
            "Block already has an immediate post-dominator"
        );
        self.block_mut(block).ipostdom = Some(ipostdom);
        self.block_mut(ipostdom).post_dom_children.insert(block);
    }

    /// Add a block to the dominance frontier of `block`.
    pub fn add_dom_frontier(&mut self, block: BlockId, frontier: BlockId) -> bool {
        self.block_mut(block).dom_frontiers.insert(frontier)
    }

    /// Add a block to the post-dominance frontier of `block`.
    pub fn add_post_dom_frontier(&mut self, block: BlockId, frontier: BlockId) -> bool {
        self.block_mut(block).post_dom_frontiers.insert(frontier)
    }

    /// Detach a block from the graph, reconnecting every predecessor to
    /// every successor while preserving the predecessors' edge labels.
    ///
    /// Edges to the isolated block itself are dropped, so isolating a block
    /// with a self-loop does not resurrect the loop on its neighbours. All
    /// control-dependence edges incident to the block are removed
    /// symmetrically, and no dominance or post-dominance frontier keeps a
    /// reference to the block. The block itself stays in the arena,
    /// detached but not destroyed.
    pub fn isolate(&mut self, block: BlockId) {
        let successors: Vec<BlockEdge> = self.block(block).successors.iter().copied().collect();
        let predecessors: Vec<BlockId> = self.block(block).predecessors.iter().copied().collect();

        for pred in predecessors {
            if pred == block {
                continue;
            }
            // labels of the edges that went to the isolated block
            let labels: Vec<u32> = self
                .block(pred)
                .successors
                .iter()
                .filter(|edge| edge.target == block)
                .map(|edge| edge.label)
                .collect();
            self.block_mut(pred)
                .successors
                .retain(|edge| edge.target != block);
            for label in labels {
                for succ in successors.iter() {
                    // never re-create an edge to the block being isolated,
                    // which would happen for self-loops
                    if succ.target != block {
                        self.add_successor(pred, succ.target, label);
                    }
                }
            }
        }

        self.remove_successors(block);
        self.block_mut(block).predecessors.clear();

        // symmetric removal of control-dependence edges
        let control_deps = std::mem::take(&mut self.block_mut(block).control_deps);
        for dep in control_deps {
            if dep != block {
                self.block_mut(dep).rev_control_deps.remove(&block);
            }
        }
        let rev_control_deps = std::mem::take(&mut self.block_mut(block).rev_control_deps);
        for dep in rev_control_deps {
            if dep != block {
                self.block_mut(dep).control_deps.remove(&block);
            }
        }

        // drop all remaining references from dominance results
        for other in 0..self.blocks.len() {
            let other_block = &mut self.blocks[other];
            other_block.dom_frontiers.remove(&block);
            other_block.post_dom_frontiers.remove(&block);
            other_block.dom_children.remove(&block);
            other_block.post_dom_children.remove(&block);
            if other_block.idom == Some(block) {
                other_block.idom = None;
            }
            if other_block.ipostdom == Some(block) {
                other_block.ipostdom = None;
            }
        }
        let isolated = self.block_mut(block);
        isolated.dom_frontiers.clear();
        isolated.post_dom_frontiers.clear();
        isolated.dom_children.clear();
        isolated.post_dom_children.clear();
        isolated.idom = None;
        isolated.ipostdom = None;
    }
}

#[cfg(test)]
mod tests;
