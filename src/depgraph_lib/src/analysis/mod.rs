//! The fixpoint-based analyses over the pointer graph.

use crate::graph::PointerGraph;
use crate::prelude::*;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::BTreeSet;

pub mod points_to;
pub mod reaching_definitions;

/// Counters gathered during one analysis run, reported through the log
/// sink at convergence.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
pub struct AnalysisStatistics {
    /// The number of node visits the worklist performed.
    pub processed_nodes: u64,
}

/// The worklist shared by the fixpoint drivers.
///
/// Nodes are processed in a weak topological order: the priorities are the
/// positions in the flattened strongly-connected-component decomposition of
/// the successor relation, and the node with the highest pending priority
/// is stabilized first.
pub(crate) struct Worklist {
    node_priority: Vec<usize>,
    priority_to_node: Vec<NodeId>,
    queue: BTreeSet<usize>,
}

impl Worklist {
    pub(crate) fn new(graph: &PointerGraph) -> Worklist {
        let mut cfg: DiGraph<(), ()> = DiGraph::new();
        for _ in 0..graph.node_count() {
            cfg.add_node(());
        }
        for node in graph.nodes() {
            for succ in node.successors() {
                cfg.update_edge(
                    NodeIndex::new(node.id().index()),
                    NodeIndex::new(succ.index()),
                    (),
                );
            }
        }
        // kosaraju_scc returns the components in reverse topological order,
        // so taking from the back of the priority queue visits source nodes
        // first
        let priority_sorted: Vec<NodeIndex> = petgraph::algo::kosaraju_scc(&cfg)
            .into_iter()
            .flatten()
            .collect();
        let mut node_priority = vec![0; priority_sorted.len()];
        let mut priority_to_node = vec![NodeId::new(0); priority_sorted.len()];
        for (priority, index) in priority_sorted.iter().enumerate() {
            node_priority[index.index()] = priority;
            priority_to_node[priority] = NodeId::new(index.index());
        }
        Worklist {
            node_priority,
            priority_to_node,
            queue: BTreeSet::new(),
        }
    }

    /// Enqueue every node of the graph.
    pub(crate) fn seed_all(&mut self) {
        self.queue.extend(0..self.priority_to_node.len());
    }

    pub(crate) fn insert(&mut self, node: NodeId) {
        self.queue.insert(self.node_priority[node.index()]);
    }

    pub(crate) fn pop(&mut self) -> Option<NodeId> {
        let priority = self.queue.iter().next_back().copied()?;
        self.queue.take(&priority);
        Some(self.priority_to_node[priority])
    }
}
