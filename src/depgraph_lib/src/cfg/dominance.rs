//! Dominator and post-dominator trees and the corresponding frontiers.
//!
//! The trees are computed with the iterative algorithm from petgraph
//! ([`petgraph::algo::dominators`]); the frontiers with the classical
//! runner-based algorithm walking the tree upwards from each join point.

use super::{BlockId, DependenceGraph};
use crate::prelude::*;
use petgraph::algo::dominators::{self, Dominators};
use petgraph::graph::{DiGraph, NodeIndex};

/// Compute the dominator tree of the graph and store the immediate
/// dominators (and dominator-tree children) in the blocks.
///
/// Requires the entry block to be set; unreachable blocks keep an unset
/// immediate dominator.
pub fn compute_dominator_tree(graph: &mut DependenceGraph) -> Result<(), Error> {
    let entry = graph
        .entry()
        .ok_or_else(|| anyhow!("Cannot compute dominators without an entry block"))?;
    let block_count = graph.block_count();
    let cfg = block_cfg(graph, false);
    let doms = dominators::simple_fast(&cfg, NodeIndex::new(entry.index()));
    apply_idoms(graph, &doms, block_count, |graph, block, idom| {
        graph.set_idom(block, idom)
    });
    Ok(())
}

/// Compute the post-dominator tree of the graph and store the immediate
/// post-dominators (and post-dominator-tree children) in the blocks.
///
/// The computation runs on the reversed graph from a virtual exit that is
/// connected to every block without successors. Blocks post-dominated only
/// by the virtual exit keep an unset immediate post-dominator.
pub fn compute_post_dominator_tree(graph: &mut DependenceGraph) {
    let block_count = graph.block_count();
    let reversed = block_cfg(graph, true);
    let virtual_exit = NodeIndex::new(block_count);
    let doms = dominators::simple_fast(&reversed, virtual_exit);
    apply_idoms(graph, &doms, block_count, |graph, block, ipostdom| {
        graph.set_ipostdom(block, ipostdom)
    });
}

/// Compute the dominance frontiers of all blocks.
/// The dominator tree must have been computed before.
pub fn compute_dominance_frontiers(graph: &mut DependenceGraph) {
    for block in graph.block_ids() {
        if graph.block(block).predecessors_num() < 2 {
            continue;
        }
        let idom = graph.block(block).idom();
        let predecessors: Vec<BlockId> = graph.block(block).predecessors().iter().copied().collect();
        for pred in predecessors {
            let mut runner = Some(pred);
            while runner != idom {
                let current = match runner {
                    Some(current) => current,
                    None => break,
                };
                graph.add_dom_frontier(current, block);
                runner = graph.block(current).idom();
            }
        }
    }
}

/// Compute the post-dominance frontiers of all blocks:
/// `PDF(B) = { Y | B post-dominates a predecessor of Y and B does not
/// strictly post-dominate Y }`.
/// The post-dominator tree must have been computed before.
pub fn compute_post_dominance_frontiers(graph: &mut DependenceGraph) {
    for block in graph.block_ids() {
        if graph.block(block).successors_num() < 2 {
            continue;
        }
        let ipostdom = graph.block(block).ipostdom();
        let successors: Vec<BlockId> = graph
            .block(block)
            .successors()
            .iter()
            .map(|edge| edge.target)
            .collect();
        for succ in successors {
            let mut runner = Some(succ);
            while runner != ipostdom {
                let current = match runner {
                    Some(current) => current,
                    None => break,
                };
                graph.add_post_dom_frontier(current, block);
                runner = graph.block(current).ipostdom();
            }
        }
    }
}

/// Build the petgraph representation of the block graph. Block `i` becomes
/// node index `i`. With `reversed` set, all edges are flipped and a virtual
/// exit node (index `block_count`) with edges to all exit blocks is added.
fn block_cfg(graph: &DependenceGraph, reversed: bool) -> DiGraph<(), ()> {
    let mut cfg: DiGraph<(), ()> = DiGraph::new();
    for _ in 0..graph.block_count() {
        cfg.add_node(());
    }
    for block in graph.block_ids() {
        for edge in graph.block(block).successors() {
            let (from, to) = if reversed {
                (edge.target.index(), block.index())
            } else {
                (block.index(), edge.target.index())
            };
            cfg.update_edge(NodeIndex::new(from), NodeIndex::new(to), ());
        }
    }
    if reversed {
        let virtual_exit = cfg.add_node(());
        for block in graph.block_ids() {
            if graph.block(block).successors_num() == 0 {
                cfg.update_edge(virtual_exit, NodeIndex::new(block.index()), ());
            }
        }
    }
    cfg
}

/// Write the immediate dominators of a computed tree back into the blocks.
/// Nodes without a computed dominator and nodes whose dominator is the
/// virtual exit (index >= `block_count`) are skipped.
fn apply_idoms(
    graph: &mut DependenceGraph,
    doms: &Dominators<NodeIndex>,
    block_count: usize,
    mut set: impl FnMut(&mut DependenceGraph, BlockId, BlockId),
) {
    for index in 0..block_count {
        let block = BlockId::from_index(index);
        if let Some(idom) = doms.immediate_dominator(NodeIndex::new(index)) {
            if idom.index() < block_count {
                set(graph, block, BlockId::from_index(idom.index()));
            }
        }
    }
}
