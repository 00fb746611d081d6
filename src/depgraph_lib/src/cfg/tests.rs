use super::*;

fn node(index: usize) -> NodeId {
    NodeId::new(index)
}

#[test]
fn append_and_prepend_keep_program_order() {
    let mut graph = DependenceGraph::new();
    let block = graph.add_block();
    graph.append(block, node(10));
    graph.append(block, node(11));
    graph.prepend(block, node(9));
    assert_eq!(graph.block(block).nodes(), &[node(9), node(10), node(11)]);
    assert_eq!(graph.block(block).first_node(), Some(node(9)));
    assert_eq!(graph.block(block).last_node(), Some(node(11)));
}

#[test]
fn successor_edges_are_symmetric() {
    let mut graph = DependenceGraph::new();
    let a = graph.add_block();
    let b = graph.add_block();
    assert!(graph.add_successor(a, b, 3));
    // duplicate (target, label) is a no-op
    assert!(!graph.add_successor(a, b, 3));
    // a parallel edge with another label is not
    assert!(graph.add_successor(a, b, 4));
    assert!(graph.block(b).predecessors().contains(&a));
    assert_eq!(graph.block(a).successors_num(), 2);
}

#[test]
fn remove_successor_keeps_pred_of_parallel_edge() {
    let mut graph = DependenceGraph::new();
    let a = graph.add_block();
    let b = graph.add_block();
    graph.add_successor(a, b, 0);
    graph.add_successor(a, b, 1);
    graph.remove_successor(a, BlockEdge::new(b, 0));
    // the label-1 edge still exists, so b must keep a as predecessor
    assert!(graph.block(b).predecessors().contains(&a));
    graph.remove_successor(a, BlockEdge::new(b, 1));
    assert!(!graph.block(b).predecessors().contains(&a));
}

#[test]
fn remove_successors_target_counts_removed_edges() {
    let mut graph = DependenceGraph::new();
    let a = graph.add_block();
    let b = graph.add_block();
    let c = graph.add_block();
    graph.add_successor(a, b, 0);
    graph.add_successor(a, b, 1);
    graph.add_successor(a, c, 0);
    assert_eq!(graph.remove_successors_target(a, b), 2);
    assert_eq!(graph.remove_successors_target(a, b), 0);
    assert!(!graph.block(b).predecessors().contains(&a));
    assert!(graph.block(c).predecessors().contains(&a));
}

#[test]
fn successors_are_same_ignores_labels() {
    let mut graph = DependenceGraph::new();
    let a = graph.add_block();
    let b = graph.add_block();
    let c = graph.add_block();
    assert!(graph.block(a).successors_are_same());
    graph.add_successor(a, b, 0);
    graph.add_successor(a, b, 1);
    assert!(graph.block(a).successors_are_same());
    graph.add_successor(a, c, 2);
    assert!(!graph.block(a).successors_are_same());
}

#[test]
fn isolate_reconnects_predecessors_with_their_labels() {
    // a -[7]-> b, b -> b (self-loop), b -> c
    let mut graph = DependenceGraph::new();
    let a = graph.add_block();
    let b = graph.add_block();
    let c = graph.add_block();
    graph.add_successor(a, b, 7);
    graph.add_successor(b, b, 0);
    graph.add_successor(b, c, 1);

    graph.isolate(b);

    // a inherits b's non-self successors, keeping the label of a -> b
    let succs: Vec<BlockEdge> = graph.block(a).successors().iter().copied().collect();
    assert_eq!(succs, vec![BlockEdge::new(c, 7)]);
    assert_eq!(
        graph.block(c).predecessors().iter().copied().collect::<Vec<_>>(),
        vec![a]
    );
    // the isolated block keeps no edges and nobody references it
    assert!(graph.block(b).successors().is_empty());
    assert!(graph.block(b).predecessors().is_empty());
    for id in graph.block_ids() {
        let block = graph.block(id);
        assert!(!block.successors().iter().any(|edge| edge.target == b));
        assert!(!block.predecessors().contains(&b));
    }
}

#[test]
fn isolate_removes_control_dependence_symmetrically() {
    let mut graph = DependenceGraph::new();
    let a = graph.add_block();
    let b = graph.add_block();
    let c = graph.add_block();
    graph.add_control_dependence(a, b);
    graph.add_control_dependence(b, c);
    graph.add_control_dependence(b, b);

    graph.isolate(b);

    assert!(graph.block(a).control_deps().is_empty());
    assert!(graph.block(c).rev_control_deps().is_empty());
    assert!(graph.block(b).control_deps().is_empty());
    assert!(graph.block(b).rev_control_deps().is_empty());
}

#[test]
fn isolate_purges_dominance_references() {
    let mut graph = DependenceGraph::new();
    let a = graph.add_block();
    let b = graph.add_block();
    let c = graph.add_block();
    graph.set_idom(b, a);
    graph.set_idom(c, b);
    graph.set_ipostdom(a, b);
    graph.add_dom_frontier(a, b);
    graph.add_post_dom_frontier(c, b);

    graph.isolate(b);

    for id in graph.block_ids() {
        let block = graph.block(id);
        assert!(!block.dom_frontiers().contains(&b));
        assert!(!block.post_dom_frontiers().contains(&b));
        assert_ne!(block.idom(), Some(b));
        assert_ne!(block.ipostdom(), Some(b));
        assert!(!block.dom_children().contains(&b));
        assert!(!block.post_dom_children().contains(&b));
    }
}

#[test]
fn slice_ids_and_call_sites() {
    let mut graph = DependenceGraph::new();
    let a = graph.add_block();
    assert_eq!(graph.block(a).slice_id(), 0);
    graph.block_mut(a).set_slice(3);
    assert_eq!(graph.block(a).slice_id(), 3);
    assert!(graph.block_mut(a).add_call_site(node(5)));
    assert!(!graph.block_mut(a).add_call_site(node(5)));
    assert!(graph.block_mut(a).remove_call_site(node(5)));
    assert!(!graph.block_mut(a).remove_call_site(node(5)));
}
