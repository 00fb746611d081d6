//! The reaching-definitions analysis over the pointer graph.
//!
//! The analysis is parametrized by the points-to results: stores and
//! memcpys are resolved through the points-to sets of their pointer
//! operands to byte-interval [`DefSite`]s of abstract memory regions. Each
//! node then gets an [`RdMap`] describing, for every definition site, the
//! definitions that may reach that program point.
//!
//! A store through a single concrete pointer with a concrete offset and
//! length is a *strong update*: it becomes the only visible definition of
//! its site, and the site is excluded when the predecessor states are
//! merged. All other definitions accumulate. Oversized definition sets
//! collapse to the unknown state (a sound over-approximation), bounded by
//! [`ReachingDefsConfig::max_set_size`].

use super::{AnalysisStatistics, Worklist};
use crate::graph::{NodeKind, PointerGraph, PointerGraphValidator};
use crate::pointer::Offset;
use crate::prelude::*;
use crate::utils::log::{LogMessage, LogThreadMsg};
use fnv::FnvHashMap;
use std::collections::BTreeSet;

mod interval_map;
mod rd_map;
pub use interval_map::*;
pub use rd_map::*;

/// The name of this analysis as it appears in log messages.
const LOG_SOURCE: &str = "Reaching definitions";

/// Configurable parameters of the reaching-definitions analysis.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct ReachingDefsConfig {
    /// Definition sets larger than this collapse to the unknown state.
    pub max_set_size: u64,
}

impl Default for ReachingDefsConfig {
    fn default() -> ReachingDefsConfig {
        ReachingDefsConfig {
            max_set_size: u64::MAX,
        }
    }
}

/// The reaching-definitions analysis engine.
///
/// Expects the points-to analysis to have run on the graph already, since
/// it reads the points-to sets stored in the graph nodes.
pub struct ReachingDefinitions {
    config: ReachingDefsConfig,
    rd_maps: FnvHashMap<NodeId, RdMap>,
    statistics: AnalysisStatistics,
    log_sender: crossbeam_channel::Sender<LogThreadMsg>,
}

impl ReachingDefinitions {
    /// Create a new analysis engine.
    pub fn new(
        config: ReachingDefsConfig,
        log_sender: crossbeam_channel::Sender<LogThreadMsg>,
    ) -> ReachingDefinitions {
        ReachingDefinitions {
            config,
            rd_maps: FnvHashMap::default(),
            statistics: AnalysisStatistics::default(),
            log_sender,
        }
    }

    /// The statistics gathered so far.
    pub fn statistics(&self) -> &AnalysisStatistics {
        &self.statistics
    }

    /// Run the analysis to its fixpoint.
    pub fn run(&mut self, graph: &PointerGraph) -> Result<(), Error> {
        PointerGraphValidator::new(graph)
            .validate()
            .map_err(|errors| anyhow!("The pointer graph is structurally invalid:\n{}", errors))?;
        let mut worklist = Worklist::new(graph);
        loop {
            worklist.seed_all();
            let mut changed_in_pass = false;
            while let Some(node) = worklist.pop() {
                self.statistics.processed_nodes += 1;
                if self.process_node(graph, node) {
                    changed_in_pass = true;
                    for succ in graph.node(node).successors() {
                        worklist.insert(*succ);
                    }
                }
            }
            if !changed_in_pass {
                break;
            }
        }
        let _ = self.log_sender.send(
            LogMessage::new_info(format!(
                "Converged after {} node visits ({} program points tracked)",
                self.statistics.processed_nodes,
                self.rd_maps.len()
            ))
            .source(LOG_SOURCE)
            .into(),
        );
        Ok(())
    }

    /// The reaching-definitions map of a program point, if it was reached
    /// by the fixpoint.
    pub fn rd_map(&self, node: NodeId) -> Option<&RdMap> {
        self.rd_maps.get(&node)
    }

    /// The definitions that may reach `node` for the byte range
    /// `[offset, offset + len)` of the memory accessed by `node`.
    ///
    /// The accessed memory is resolved through the points-to set of the
    /// node's pointer operand (the load source or store destination); for
    /// other node kinds the node itself is taken as the memory region.
    /// Definitions into unknown memory may alias anything, so they are
    /// always included. If the accessed pointer itself is unknown, the
    /// unknown-memory node joins the result.
    pub fn get_reaching_definitions(
        &self,
        graph: &PointerGraph,
        node: NodeId,
        offset: Offset,
        len: Offset,
    ) -> BTreeSet<NodeId> {
        let mut result = BTreeSet::new();
        let map = match self.rd_maps.get(&node) {
            Some(map) => map,
            None => return result,
        };
        let n = graph.node(node);
        let pointers = match n.kind() {
            NodeKind::Load { .. } | NodeKind::Free | NodeKind::InvalidateObject => {
                graph.points_to(n.operand(0)).clone()
            }
            NodeKind::Store { .. } | NodeKind::Memcpy { .. } => {
                graph.points_to(n.operand(1)).clone()
            }
            _ => [crate::pointer::Pointer::new(node, Offset::new(0))]
                .into_iter()
                .collect(),
        };
        for pointer in pointers.iter() {
            if pointer.is_unknown() {
                result.insert(NodeId::UNKNOWN_NODE);
                continue;
            }
            if !pointer.is_valid() {
                continue;
            }
            let query_offset = pointer.offset + offset;
            map.get(pointer.target, query_offset, len, &mut result);
        }
        map.get(NodeId::UNKNOWN_NODE, Offset::UNKNOWN, len, &mut result);
        result
    }

    /// The transfer function of one node: merge the predecessor states
    /// (skipping strongly updated sites) and apply the node's own
    /// definitions. Returns whether the node's map changed.
    fn process_node(&mut self, graph: &PointerGraph, node: NodeId) -> bool {
        let n = graph.node(node);
        let mut strong_sites: BTreeSet<DefSite> = BTreeSet::new();
        let mut strong_defs: Vec<DefSite> = Vec::new();
        let mut weak_defs: Vec<DefSite> = Vec::new();

        match n.kind() {
            NodeKind::Alloc { .. } | NodeKind::DynAlloc => {
                // the allocation defines its whole region
                weak_defs.push(DefSite::new(node, Offset::new(0), Offset::UNKNOWN));
            }
            NodeKind::Store { length } => {
                let destinations = graph.points_to(n.operand(1));
                let single_destination = destinations.get_single().is_some();
                for pointer in destinations.iter() {
                    if pointer.is_unknown() {
                        weak_defs.push(DefSite::whole(NodeId::UNKNOWN_NODE));
                        continue;
                    }
                    if !pointer.is_valid() {
                        continue;
                    }
                    let site = DefSite::new(pointer.target, pointer.offset, length);
                    let strong = single_destination
                        && !pointer.offset.is_unknown()
                        && !length.is_unknown();
                    if strong {
                        strong_sites.insert(site);
                        strong_defs.push(site);
                    } else {
                        weak_defs.push(site);
                    }
                }
            }
            NodeKind::Memcpy { length } => {
                let destinations = graph.points_to(n.operand(1));
                for pointer in destinations.iter() {
                    if pointer.is_unknown() {
                        weak_defs.push(DefSite::whole(NodeId::UNKNOWN_NODE));
                        continue;
                    }
                    if !pointer.is_valid() {
                        continue;
                    }
                    weak_defs.push(DefSite::new(pointer.target, pointer.offset, length));
                }
            }
            _ => (),
        }

        let mut map = self.rd_maps.remove(&node).unwrap_or_default();
        let mut changed = false;
        let without = if strong_sites.is_empty() {
            None
        } else {
            Some(&strong_sites)
        };
        for pred in n.predecessors() {
            if let Some(pred_map) = self.rd_maps.get(pred) {
                changed |= map.merge(pred_map, without, self.config.max_set_size);
            }
        }
        for site in strong_defs {
            changed |= map.update(site, node);
        }
        for site in weak_defs {
            changed |= map.add(site, node);
        }
        self.rd_maps.insert(node, map);
        changed
    }
}

#[cfg(test)]
mod tests;
