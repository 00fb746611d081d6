use super::*;
use crate::analysis::points_to::{FlowPolicy, PointsToAnalysis, PointsToConfig};
use crate::graph::NodeKind;
use crate::utils::log::LogThread;

fn run_points_to(graph: &mut PointerGraph) {
    let mut analysis = PointsToAnalysis::new(
        PointsToConfig {
            max_offset: 64,
            policy: FlowPolicy::FlowSensitive,
        },
        LogThread::create_disconnected_sender(),
    );
    analysis.run(graph).unwrap();
}

fn run_reaching_defs(graph: &PointerGraph) -> ReachingDefinitions {
    let mut analysis = ReachingDefinitions::new(
        ReachingDefsConfig::default(),
        LogThread::create_disconnected_sender(),
    );
    analysis.run(graph).unwrap();
    analysis
}

fn alloc() -> NodeKind {
    NodeKind::Alloc {
        is_heap: false,
        is_global: false,
    }
}

fn load() -> NodeKind {
    NodeKind::Load {
        length: Offset::new(8),
    }
}

fn store() -> NodeKind {
    NodeKind::Store {
        length: Offset::new(8),
    }
}

fn chain(graph: &mut PointerGraph, nodes: &[NodeId]) {
    for window in nodes.windows(2) {
        graph.add_successor(window[0], window[1]);
    }
}

#[test]
fn store_definition_reaches_a_load() {
    let mut graph = PointerGraph::new();
    let subgraph = graph.add_subgraph();
    let value = graph.add_node(subgraph, alloc(), &[]);
    let p = graph.add_node(subgraph, alloc(), &[]);
    let s = graph.add_node(subgraph, store(), &[value, p]);
    let l = graph.add_node(subgraph, load(), &[p]);
    chain(&mut graph, &[value, p, s, l]);
    run_points_to(&mut graph);

    let analysis = run_reaching_defs(&graph);
    let defs = analysis.get_reaching_definitions(&graph, l, Offset::new(0), Offset::new(8));
    assert!(defs.contains(&s));
    assert!(!defs.contains(&value));
}

#[test]
fn strong_store_kills_the_previous_definition() {
    let mut graph = PointerGraph::new();
    let subgraph = graph.add_subgraph();
    let a = graph.add_node(subgraph, alloc(), &[]);
    let b = graph.add_node(subgraph, alloc(), &[]);
    let p = graph.add_node(subgraph, alloc(), &[]);
    let s1 = graph.add_node(subgraph, store(), &[a, p]);
    let s2 = graph.add_node(subgraph, store(), &[b, p]);
    let l = graph.add_node(subgraph, load(), &[p]);
    chain(&mut graph, &[a, b, p, s1, s2, l]);
    run_points_to(&mut graph);

    let analysis = run_reaching_defs(&graph);
    let defs = analysis.get_reaching_definitions(&graph, l, Offset::new(0), Offset::new(8));
    assert!(defs.contains(&s2));
    assert!(!defs.contains(&s1));
    // the allocation itself still counts as a definition of the region
    assert!(defs.contains(&p));
}

#[test]
fn definitions_merge_at_joins() {
    let mut graph = PointerGraph::new();
    let subgraph = graph.add_subgraph();
    let a = graph.add_node(subgraph, alloc(), &[]);
    let b = graph.add_node(subgraph, alloc(), &[]);
    let p = graph.add_node(subgraph, alloc(), &[]);
    let s1 = graph.add_node(subgraph, store(), &[a, p]);
    let s2 = graph.add_node(subgraph, store(), &[b, p]);
    let join = graph.add_node(subgraph, NodeKind::Join, &[]);
    let l = graph.add_node(subgraph, load(), &[p]);
    chain(&mut graph, &[a, b, p]);
    graph.add_successor(p, s1);
    graph.add_successor(p, s2);
    graph.add_successor(s1, join);
    graph.add_successor(s2, join);
    graph.add_successor(join, l);
    run_points_to(&mut graph);

    let analysis = run_reaching_defs(&graph);
    let defs = analysis.get_reaching_definitions(&graph, l, Offset::new(0), Offset::new(8));
    assert!(defs.contains(&s1));
    assert!(defs.contains(&s2));
}

#[test]
fn disjoint_field_stores_do_not_shadow_each_other() {
    let mut graph = PointerGraph::new();
    let subgraph = graph.add_subgraph();
    let a = graph.add_node(subgraph, alloc(), &[]);
    let p = graph.add_node(subgraph, alloc(), &[]);
    let field0 = graph.add_node(
        subgraph,
        NodeKind::Gep {
            offset: Offset::new(0),
        },
        &[p],
    );
    let field8 = graph.add_node(
        subgraph,
        NodeKind::Gep {
            offset: Offset::new(8),
        },
        &[p],
    );
    let s0 = graph.add_node(subgraph, store(), &[a, field0]);
    let s8 = graph.add_node(subgraph, store(), &[a, field8]);
    let l0 = graph.add_node(
        subgraph,
        NodeKind::Load {
            length: Offset::new(8),
        },
        &[field0],
    );
    chain(&mut graph, &[a, p, field0, field8, s0, s8, l0]);
    run_points_to(&mut graph);

    let analysis = run_reaching_defs(&graph);
    // the load of bytes [0,8) sees the store to offset 0 but not the one
    // to offset 8
    let defs = analysis.get_reaching_definitions(&graph, l0, Offset::new(0), Offset::new(8));
    assert!(defs.contains(&s0));
    assert!(!defs.contains(&s8));
    // a query spanning both fields sees both stores
    let defs = analysis.get_reaching_definitions(&graph, l0, Offset::new(0), Offset::new(16));
    assert!(defs.contains(&s0));
    assert!(defs.contains(&s8));
}

#[test]
fn store_through_a_phi_is_a_weak_update() {
    let mut graph = PointerGraph::new();
    let subgraph = graph.add_subgraph();
    let a = graph.add_node(subgraph, alloc(), &[]);
    let p = graph.add_node(subgraph, alloc(), &[]);
    let q = graph.add_node(subgraph, alloc(), &[]);
    let phi = graph.add_node(subgraph, NodeKind::Phi, &[p, q]);
    let s1 = graph.add_node(subgraph, store(), &[a, p]);
    let s2 = graph.add_node(subgraph, store(), &[a, phi]);
    let l = graph.add_node(subgraph, load(), &[p]);
    chain(&mut graph, &[a, p, q, phi, s1, s2, l]);
    run_points_to(&mut graph);

    let analysis = run_reaching_defs(&graph);
    // the store through the two-target phi cannot kill the earlier store
    let defs = analysis.get_reaching_definitions(&graph, l, Offset::new(0), Offset::new(8));
    assert!(defs.contains(&s1));
    assert!(defs.contains(&s2));
}

#[test]
fn stores_to_unknown_memory_reach_every_query() {
    let mut graph = PointerGraph::new();
    let subgraph = graph.add_subgraph();
    let a = graph.add_node(subgraph, alloc(), &[]);
    let p = graph.add_node(subgraph, alloc(), &[]);
    let unknown = graph.add_node(subgraph, NodeKind::Cast, &[NodeId::UNKNOWN_NODE]);
    let s_unknown = graph.add_node(subgraph, store(), &[a, unknown]);
    let s = graph.add_node(subgraph, store(), &[a, p]);
    let l = graph.add_node(subgraph, load(), &[p]);
    chain(&mut graph, &[a, p, unknown, s_unknown, s, l]);
    run_points_to(&mut graph);

    let analysis = run_reaching_defs(&graph);
    let defs = analysis.get_reaching_definitions(&graph, l, Offset::new(0), Offset::new(8));
    assert!(defs.contains(&s));
    assert!(defs.contains(&s_unknown));
}

#[test]
fn oversized_definition_sets_collapse_to_unknown() {
    let mut graph = PointerGraph::new();
    let subgraph = graph.add_subgraph();
    let a = graph.add_node(subgraph, alloc(), &[]);
    let p = graph.add_node(subgraph, alloc(), &[]);
    let q = graph.add_node(subgraph, alloc(), &[]);
    let phi = graph.add_node(subgraph, NodeKind::Phi, &[p, q]);
    // weak stores, all defining (p, 0, 8)
    let s1 = graph.add_node(subgraph, store(), &[a, phi]);
    let s2 = graph.add_node(subgraph, store(), &[a, phi]);
    let s3 = graph.add_node(subgraph, store(), &[a, phi]);
    let join = graph.add_node(subgraph, NodeKind::Join, &[]);
    let l = graph.add_node(subgraph, load(), &[p]);
    chain(&mut graph, &[a, p, q, phi]);
    graph.add_successor(phi, s1);
    graph.add_successor(phi, s2);
    graph.add_successor(phi, s3);
    graph.add_successor(s1, join);
    graph.add_successor(s2, join);
    graph.add_successor(s3, join);
    graph.add_successor(join, l);
    run_points_to(&mut graph);

    let mut analysis = ReachingDefinitions::new(
        ReachingDefsConfig { max_set_size: 2 },
        LogThread::create_disconnected_sender(),
    );
    analysis.run(&graph).unwrap();

    let defs = analysis.get_reaching_definitions(&graph, l, Offset::new(0), Offset::new(8));
    assert!(defs.contains(&NodeId::UNKNOWN_NODE));
}

#[test]
fn every_program_point_gets_a_map() {
    let mut graph = PointerGraph::new();
    let subgraph = graph.add_subgraph();
    let a = graph.add_node(subgraph, alloc(), &[]);
    let noop = graph.add_node(subgraph, NodeKind::Noop, &[]);
    chain(&mut graph, &[a, noop]);
    run_points_to(&mut graph);

    let analysis = run_reaching_defs(&graph);
    // the allocation's definition flows into the successor's map
    let map = analysis.rd_map(noop).unwrap();
    assert!(map.defines_with_any_offset(a));
    assert!(analysis.statistics().processed_nodes > 0);
}
