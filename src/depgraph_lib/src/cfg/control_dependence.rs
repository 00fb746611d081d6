//! Control-dependence edges between basic blocks.
//!
//! A block `B` is control dependent on a block `A` iff `A` is in the
//! post-dominance frontier of `B`: the branch taken in `A` decides whether
//! `B` executes.

use super::DependenceGraph;

/// Compute control dependence from scratch on a graph without dominance
/// results: builds the post-dominator tree, the post-dominance frontiers
/// and then the control-dependence edges.
pub fn compute_control_dependence(graph: &mut DependenceGraph) {
    super::compute_post_dominator_tree(graph);
    super::compute_post_dominance_frontiers(graph);
    add_control_dependence_edges(graph);
}

/// Turn the computed post-dominance frontiers into control-dependence
/// edges: for every block `b` and every `x` in `PDF(b)`, add `x -> b`
/// (with its symmetric reverse edge).
pub fn add_control_dependence_edges(graph: &mut DependenceGraph) {
    for block in graph.block_ids() {
        let frontier: Vec<_> = graph
            .block(block)
            .post_dom_frontiers()
            .iter()
            .copied()
            .collect();
        for controlling in frontier {
            graph.add_control_dependence(controlling, block);
        }
    }
}
