//! The points-to fixpoint analysis over the pointer graph.
//!
//! Every node of the graph gets a points-to set describing the memory
//! regions its value may point to. Flow-sensitive variants additionally
//! maintain a per-program-point *memory map* describing which
//! [`MemoryObject`]s are reachable through which abstract pointer at that
//! node.
//!
//! # Memory map sharing
//!
//! Memory maps are owned by the analysis arena and referenced by
//! [`MemoryMapId`]. A node that cannot change the memory state aliases its
//! sole predecessor's map by holding the same ID; only nodes that can
//! change it (roots, stores, memcpys, joins and, for the invalidation-aware
//! variant, frees and local invalidations) allocate a map of their own and
//! merge the predecessor maps into it.
//!
//! # Convergence
//!
//! The driver runs a worklist in a weak topological order (computed from
//! the strongly connected components of the successor relation) and repeats
//! full passes until a complete pass changes neither a points-to set nor a
//! memory map. All transfer functions are monotone: points-to sets only
//! grow, with the `UNKNOWN` top element and the `max_offset` ceiling
//! bounding the domain, so the iteration terminates.

use super::{AnalysisStatistics, Worklist};
use crate::graph::{NodeKind, PointerGraph, PointerGraphValidator};
use crate::pointer::{Offset, Pointer, PointsToSet};
use crate::prelude::*;
use crate::utils::log::{LogMessage, LogThreadMsg};

mod memory_map;
mod memory_object;
pub use memory_map::*;
pub use memory_object::*;


/// The name of this analysis as it appears in log messages.
const LOG_SOURCE: &str = "Points-to analysis";

/// The join policy of the analysis.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum FlowPolicy {
    /// One memory map shared by all program points, weak updates only.
    FlowInsensitive,
    /// Per-program-point memory maps, predecessor maps are merged at every
    /// node that can change the memory state.
    FlowSensitive,
    /// Like `FlowSensitive`, but joins do not merge predecessor maps;
    /// missing entries are looked up backwards along the predecessor edges
    /// on demand.
    FlowSensitiveWithoutMerge,
    /// Like `FlowSensitive`, plus invalidation of freed memory and of local
    /// memory at procedure exits.
    WithInvalidate,
}

/// Configurable parameters of the points-to analysis.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct PointsToConfig {
    /// The largest concrete offset the analysis keeps track of. Offsets
    /// beyond the ceiling collapse to `UNKNOWN`.
    pub max_offset: u64,
    /// The join policy to analyze with.
    pub policy: FlowPolicy,
}

impl Default for PointsToConfig {
    fn default() -> PointsToConfig {
        PointsToConfig {
            max_offset: 64,
            policy: FlowPolicy::FlowSensitive,
        }
    }
}

/// The per-node bookkeeping of the analysis.
#[derive(Debug, Clone, Copy, Default)]
struct NodeInfo {
    /// The memory map valid at this node. Shared by ID with the
    /// predecessor when the node cannot change the memory state.
    memory_map: Option<MemoryMapId>,
    /// Marker of the last backward lookup that visited this node.
    dfsid: u32,
}

/// The points-to analysis engine.
///
/// The engine owns the arenas of all [`MemoryObject`]s and [`MemoryMap`]s
/// created during a run; the computed points-to sets live in the nodes of
/// the analyzed graph. The graph is only borrowed during [`run`](Self::run),
/// so the results can be queried with independent borrows afterwards.
pub struct PointsToAnalysis {
    config: PointsToConfig,
    memory_objects: Vec<MemoryObject>,
    memory_maps: Vec<MemoryMap>,
    node_info: Vec<NodeInfo>,
    /// The single map shared by all nodes of a flow-insensitive run.
    global_map: Option<MemoryMapId>,
    /// Rolling marker for the backward definition lookups of the
    /// without-merge variant.
    current_dfs: u32,
    statistics: AnalysisStatistics,
    log_sender: crossbeam_channel::Sender<LogThreadMsg>,
}

impl PointsToAnalysis {
    /// Create a new analysis engine.
    pub fn new(
        config: PointsToConfig,
        log_sender: crossbeam_channel::Sender<LogThreadMsg>,
    ) -> PointsToAnalysis {
        PointsToAnalysis {
            config,
            memory_objects: Vec::new(),
            memory_maps: Vec::new(),
            node_info: Vec::new(),
            global_map: None,
            current_dfs: 0,
            statistics: AnalysisStatistics::default(),
            log_sender,
        }
    }

    /// The configuration the engine was created with.
    pub fn config(&self) -> &PointsToConfig {
        &self.config
    }

    /// The statistics gathered so far.
    pub fn statistics(&self) -> &AnalysisStatistics {
        &self.statistics
    }

    /// Run the analysis to its fixpoint.
    ///
    /// The graph is validated first; a structurally invalid graph is
    /// refused with the validator's report as the error. Function-pointer
    /// calls may add interprocedural edges to the graph while the fixpoint
    /// is running.
    pub fn run(&mut self, graph: &mut PointerGraph) -> Result<(), Error> {
        PointerGraphValidator::new(graph)
            .validate()
            .map_err(|errors| anyhow!("The pointer graph is structurally invalid:\n{}", errors))?;
        self.node_info
            .resize_with(graph.node_count(), NodeInfo::default);

        let mut worklist = Worklist::new(graph);
        loop {
            worklist.seed_all();
            let mut changed_in_pass = false;
            while let Some(node) = worklist.pop() {
                self.statistics.processed_nodes += 1;
                let mut changed = self.before_processed(graph, node);
                if self.node_info[node.index()].memory_map.is_none() {
                    // the predecessor state is not materialized yet; the
                    // node is revisited once the predecessor got its map
                    continue;
                }
                changed |= self.process_node(graph, node, &mut worklist);
                changed |= self.after_processed(graph, node);
                if changed {
                    changed_in_pass = true;
                    let successors = graph.node(node).successors().to_vec();
                    for succ in successors {
                        worklist.insert(succ);
                    }
                }
            }
            if !changed_in_pass {
                break;
            }
        }
        self.log_info(format!(
            "Converged after {} node visits ({} memory objects, {} memory maps)",
            self.statistics.processed_nodes,
            self.memory_objects.len(),
            self.memory_maps.len()
        ));
        Ok(())
    }

    /// The points-to set computed for a node.
    pub fn get_points_to<'g>(&self, graph: &'g PointerGraph, node: NodeId) -> &'g PointsToSet {
        graph.points_to(node)
    }

    /// The memory map valid at a node, if the node was reached by the
    /// fixpoint.
    pub fn memory_map(&self, node: NodeId) -> Option<&MemoryMap> {
        let id = self.node_info.get(node.index())?.memory_map?;
        Some(&self.memory_maps[id.index()])
    }

    /// Access a memory object of the analysis arena.
    pub fn memory_object(&self, id: MemoryObjectId) -> &MemoryObject {
        &self.memory_objects[id.index()]
    }

    /// The memory objects representing the region `pointer` points to at
    /// the program point of `node`.
    pub fn get_memory_objects(
        &mut self,
        graph: &PointerGraph,
        node: NodeId,
        pointer: Pointer,
    ) -> Vec<MemoryObjectId> {
        self.resolve_memory_objects(graph, node, pointer, false)
    }

    /// The memory objects at `node` that contain a pointer with the same
    /// target as `pointer` in any of their slots.
    pub fn get_memory_objects_pointing_to(
        &self,
        node: NodeId,
        pointer: Pointer,
    ) -> Vec<MemoryObjectId> {
        let mut objects = Vec::new();
        if let Some(map) = self.memory_map(node) {
            for (_, entry_objects) in map.iter() {
                for object in entry_objects {
                    let contains_target = self.memory_objects[object.index()]
                        .iter()
                        .any(|(_, slot)| slot.points_to_target(pointer.target));
                    if contains_target {
                        objects.push(*object);
                    }
                }
            }
        }
        objects.sort();
        objects.dedup();
        objects
    }

    /// The memory objects at `node` that contain a pointer to local
    /// (non-heap, non-global) memory of the procedure enclosing `node`.
    /// Meaningful for the invalidation-aware policy.
    pub fn get_local_memory_objects(
        &self,
        graph: &PointerGraph,
        node: NodeId,
    ) -> Vec<MemoryObjectId> {
        let parent = graph.node(node).parent();
        let mut objects = Vec::new();
        if let Some(map) = self.memory_map(node) {
            for (_, entry_objects) in map.iter() {
                for object in entry_objects {
                    let points_to_local =
                        self.memory_objects[object.index()].iter().any(|(_, slot)| {
                            slot.iter().any(|ptr| {
                                ptr.is_valid() && {
                                    let target = graph.node(ptr.target);
                                    !target.is_heap()
                                        && !target.is_global()
                                        && target.parent() == parent
                                }
                            })
                        });
                    if points_to_local {
                        objects.push(*object);
                    }
                }
            }
        }
        objects.sort();
        objects.dedup();
        objects
    }

    /// Whether the node can change the memory map under the configured
    /// policy.
    fn can_change_mm(&self, graph: &PointerGraph, node: NodeId) -> bool {
        let n = graph.node(node);
        let preds = n.predecessors().len();
        let base = preds == 0
            || matches!(n.kind(), NodeKind::Store { .. } | NodeKind::Memcpy { .. });
        match self.config.policy {
            FlowPolicy::FlowInsensitive => false,
            FlowPolicy::FlowSensitive => base || preds > 1,
            FlowPolicy::FlowSensitiveWithoutMerge => base,
            FlowPolicy::WithInvalidate => {
                base || preds > 1
                    || matches!(n.kind(), NodeKind::Free | NodeKind::InvalidateLocals)
            }
        }
    }

    /// Whether the node writes to memory and therefore materializes fresh
    /// memory objects for unresolved pointers.
    fn writes_memory(kind: NodeKind) -> bool {
        matches!(
            kind,
            NodeKind::Store { .. }
                | NodeKind::Memcpy { .. }
                | NodeKind::Free
                | NodeKind::InvalidateObject
        )
    }

    /// Assign the node its memory map: an own one when the node can change
    /// the memory state or joins several predecessors, the aliased map of
    /// the sole predecessor otherwise. Returns whether a map was assigned.
    fn before_processed(&mut self, graph: &PointerGraph, node: NodeId) -> bool {
        if self.node_info[node.index()].memory_map.is_some() {
            return false;
        }
        let map = match self.config.policy {
            FlowPolicy::FlowInsensitive => {
                let map = match self.global_map {
                    Some(map) => map,
                    None => {
                        let map = self.new_memory_map();
                        self.global_map = Some(map);
                        map
                    }
                };
                map
            }
            _ => {
                let n = graph.node(node);
                if self.can_change_mm(graph, node) || n.predecessors().len() != 1 {
                    self.new_memory_map()
                } else {
                    let pred = n.single_predecessor().unwrap();
                    match self.node_info[pred.index()].memory_map {
                        Some(map) => map,
                        // the predecessor was not visited yet; leave the
                        // node unassigned until it was
                        None => return false,
                    }
                }
            }
        };
        self.node_info[node.index()].memory_map = Some(map);
        true
    }

    /// The transfer function of the node. Returns whether a points-to set
    /// or a memory object changed.
    fn process_node(
        &mut self,
        graph: &mut PointerGraph,
        node: NodeId,
        worklist: &mut Worklist,
    ) -> bool {
        match graph.node(node).kind() {
            NodeKind::Alloc { .. } | NodeKind::DynAlloc => graph
                .node_mut(node)
                .points_to_mut()
                .add(Pointer::new(node, Offset::new(0))),
            NodeKind::Cast => {
                let source = graph.points_to(graph.node(node).operand(0)).clone();
                graph.node_mut(node).points_to_mut().add_all(&source)
            }
            NodeKind::Gep { offset } => self.process_gep(graph, node, offset),
            NodeKind::Load { .. } => self.process_load(graph, node),
            NodeKind::Store { .. } => self.process_store(graph, node),
            NodeKind::Memcpy { length } => self.process_memcpy(graph, node, length),
            NodeKind::Free => match self.config.policy {
                FlowPolicy::WithInvalidate => self.process_free(graph, node),
                _ => false,
            },
            NodeKind::InvalidateObject => match self.config.policy {
                FlowPolicy::WithInvalidate => self.process_invalidate_object(graph, node),
                _ => false,
            },
            NodeKind::Phi | NodeKind::CallReturn | NodeKind::Return => {
                self.process_operand_union(graph, node)
            }
            NodeKind::CallFuncPtr => self.process_call_funcptr(graph, node, worklist),
            _ => false,
        }
    }

    fn process_gep(&mut self, graph: &mut PointerGraph, node: NodeId, gep_offset: Offset) -> bool {
        let base = graph.points_to(graph.node(node).operand(0)).clone();
        let max_offset = self.config.max_offset;
        let mut changed = false;
        for pointer in base.iter() {
            let offset = pointer.offset.bounded_add(gep_offset, max_offset);
            changed |= graph
                .node_mut(node)
                .points_to_mut()
                .add(Pointer::new(pointer.target, offset));
        }
        changed
    }

    fn process_load(&mut self, graph: &mut PointerGraph, node: NodeId) -> bool {
        let pointers = graph.points_to(graph.node(node).operand(0)).clone();
        let mut loaded = PointsToSet::new();
        for pointer in pointers.iter() {
            if pointer.is_unknown() {
                loaded.add(Pointer::unknown());
                continue;
            }
            if pointer.is_null() || pointer.is_invalidated() {
                continue;
            }
            for object in self.resolve_memory_objects(graph, node, *pointer, false) {
                let object = &self.memory_objects[object.index()];
                if pointer.offset.is_unknown() {
                    for (_, slot) in object.iter() {
                        loaded.add_all(slot);
                    }
                } else {
                    if let Some(slot) = object.get(pointer.offset) {
                        loaded.add_all(slot);
                    }
                    // a write to an unresolved offset may have hit this cell
                    if let Some(slot) = object.get(Offset::UNKNOWN) {
                        loaded.add_all(slot);
                    }
                }
            }
        }
        graph.node_mut(node).points_to_mut().add_all(&loaded)
    }

    fn process_store(&mut self, graph: &mut PointerGraph, node: NodeId) -> bool {
        let value = graph.points_to(graph.node(node).operand(0)).clone();
        let destinations = graph.points_to(graph.node(node).operand(1)).clone();
        // a store through a single concrete pointer overwrites the cell
        let strong_candidate = !matches!(self.config.policy, FlowPolicy::FlowInsensitive)
            && destinations
                .get_single()
                .map_or(false, |ptr| ptr.is_valid() && !ptr.offset.is_unknown());
        let mut changed = false;
        for pointer in destinations.iter().copied().collect::<Vec<_>>() {
            if !pointer.is_valid() {
                continue;
            }
            let objects = self.resolve_memory_objects(graph, node, pointer, true);
            let strong = strong_candidate && objects.len() == 1;
            for object in objects {
                let object = &mut self.memory_objects[object.index()];
                changed |= if strong {
                    object.update_points_to(pointer.offset, &value)
                } else {
                    object.add_points_to_set(pointer.offset, &value)
                };
            }
        }
        changed
    }

    fn process_memcpy(&mut self, graph: &mut PointerGraph, node: NodeId, length: Offset) -> bool {
        let sources = graph.points_to(graph.node(node).operand(0)).clone();
        let destinations = graph.points_to(graph.node(node).operand(1)).clone();
        // snapshot the copied slots first; source and destination may alias
        let mut copied: Vec<(Offset, PointsToSet)> = Vec::new();
        for pointer in sources.iter() {
            if !pointer.is_valid() {
                continue;
            }
            for object in self.resolve_memory_objects(graph, node, *pointer, false) {
                let object = &self.memory_objects[object.index()];
                for (offset, slot) in object.iter() {
                    let in_range = match (offset.value(), length.value()) {
                        (Some(offset), Some(length)) => offset < length,
                        _ => true,
                    };
                    if in_range {
                        copied.push((*offset, slot.clone()));
                    }
                }
            }
        }
        let mut changed = false;
        for pointer in destinations.iter().copied().collect::<Vec<_>>() {
            if !pointer.is_valid() {
                continue;
            }
            for object in self.resolve_memory_objects(graph, node, pointer, true) {
                let object = &mut self.memory_objects[object.index()];
                for (offset, slot) in copied.iter() {
                    changed |= object.add_points_to_set(*offset, slot);
                }
            }
        }
        changed
    }

    /// The freed pointer set becomes the node's points-to set; the merge in
    /// [`after_processed`](Self::after_processed) uses it as the
    /// strong-update set. The contents of the freed regions are marked as
    /// invalidated.
    fn process_free(&mut self, graph: &mut PointerGraph, node: NodeId) -> bool {
        let freed = graph.points_to(graph.node(node).operand(0)).clone();
        let mut changed = graph.node_mut(node).points_to_mut().add_all(&freed);
        changed |= self.invalidate_object_slots(graph, node, &freed);
        changed
    }

    fn process_invalidate_object(&mut self, graph: &mut PointerGraph, node: NodeId) -> bool {
        let invalidated = graph.points_to(graph.node(node).operand(0)).clone();
        self.invalidate_object_slots(graph, node, &invalidated)
    }

    /// Mark every recorded slot of the objects behind `pointers` as
    /// possibly invalidated.
    fn invalidate_object_slots(
        &mut self,
        graph: &PointerGraph,
        node: NodeId,
        pointers: &PointsToSet,
    ) -> bool {
        let mut changed = false;
        for pointer in pointers.iter().copied().collect::<Vec<_>>() {
            if !pointer.is_valid() {
                continue;
            }
            for object in self.resolve_memory_objects(graph, node, pointer, true) {
                let object = &mut self.memory_objects[object.index()];
                let offsets: Vec<Offset> = object.offsets().collect();
                for offset in offsets {
                    changed |= object.add_points_to(offset, Pointer::invalidated());
                }
                changed |= object.add_points_to(Offset::UNKNOWN, Pointer::invalidated());
            }
        }
        changed
    }

    fn process_operand_union(&mut self, graph: &mut PointerGraph, node: NodeId) -> bool {
        let operands = graph.node(node).operands().to_vec();
        let mut union = PointsToSet::new();
        for operand in operands {
            union.add_all(graph.points_to(operand));
        }
        graph.node_mut(node).points_to_mut().add_all(&union)
    }

    /// Resolve the callee set of a function-pointer call from the call
    /// target's points-to set. A newly discovered callee gets connected to
    /// the call site (call -> callee entry, callee return -> the call's
    /// `CallReturn` join, which also receives the return node as operand),
    /// and the affected nodes are re-enqueued so that their values are
    /// recomputed.
    fn process_call_funcptr(
        &mut self,
        graph: &mut PointerGraph,
        node: NodeId,
        worklist: &mut Worklist,
    ) -> bool {
        let targets = graph.points_to(graph.node(node).operand(0)).clone();
        let mut changed = false;
        for pointer in targets.iter() {
            if !pointer.is_valid() {
                continue;
            }
            let subgraph = match graph.node(pointer.target).kind() {
                NodeKind::Function { subgraph } => subgraph,
                _ => continue,
            };
            let entry = match graph.subgraph(subgraph).entry() {
                Some(entry) => entry,
                None => continue,
            };
            if graph.add_successor(node, entry) {
                changed = true;
                worklist.insert(entry);
                let call_return = graph
                    .node(node)
                    .successors()
                    .iter()
                    .copied()
                    .find(|succ| matches!(graph.node(*succ).kind(), NodeKind::CallReturn));
                if let (Some(ret), Some(call_return)) =
                    (graph.subgraph(subgraph).ret(), call_return)
                {
                    graph.add_successor(ret, call_return);
                    graph.add_operand(call_return, ret);
                    worklist.insert(call_return);
                }
                self.log_debug(
                    format!("Resolved function-pointer callee {}", pointer.target),
                    node,
                );
            }
        }
        changed
    }

    /// Merge the predecessor memory maps into the node's own map.
    ///
    /// Entries whose pointer is in the strong-update set (the stored-to
    /// pointers of a store, the freed pointers of a free, the dropped local
    /// entries of an `INVALIDATE_LOCALS`) are not taken over from the
    /// predecessors, so the node's own contribution replaces them.
    fn after_processed(&mut self, graph: &PointerGraph, node: NodeId) -> bool {
        if matches!(self.config.policy, FlowPolicy::FlowInsensitive) {
            return false;
        }
        let map = match self.node_info[node.index()].memory_map {
            Some(map) => map,
            None => return false,
        };
        let kind = graph.node(node).kind();
        let preds = graph.node(node).predecessors().to_vec();

        let mut strong_update: Option<PointsToSet> = None;
        if matches!(self.config.policy, FlowPolicy::WithInvalidate)
            && matches!(kind, NodeKind::InvalidateLocals)
        {
            // drop the local entries; the dropped keys must not be
            // re-imported by the merge below
            let parent = graph.node(node).parent();
            let mut aux = PointsToSet::new();
            let local_keys: Vec<Pointer> = self.memory_maps[map.index()]
                .pointers()
                .filter(|ptr| {
                    ptr.is_valid() && {
                        let target = graph.node(ptr.target);
                        target.parent() == parent && !target.is_heap() && !target.is_global()
                    }
                })
                .collect();
            for key in local_keys {
                self.memory_maps[map.index()].remove_entry(&key);
                aux.add(key);
            }
            aux.add_all(graph.points_to(node));
            strong_update = Some(aux);
        }
        if matches!(kind, NodeKind::Store { .. }) {
            strong_update = Some(graph.points_to(graph.node(node).operand(1)).clone());
        }
        if matches!(self.config.policy, FlowPolicy::WithInvalidate)
            && matches!(kind, NodeKind::Free)
        {
            strong_update = Some(graph.points_to(node).clone());
        }

        let should_merge = match self.config.policy {
            FlowPolicy::FlowSensitiveWithoutMerge => {
                self.can_change_mm(graph, node) && preds.len() == 1
            }
            _ => {
                preds.len() > 1
                    || strong_update.is_some()
                    || matches!(kind, NodeKind::Memcpy { .. })
            }
        };
        if !should_merge {
            return false;
        }
        debug_assert!(self.can_change_mm(graph, node));
        let mut changed = false;
        for pred in preds {
            if let Some(pred_map) = self.node_info[pred.index()].memory_map {
                changed |= self.merge_maps(map, pred_map, strong_update.as_ref());
            }
        }
        changed
    }

    /// Find the memory objects representing the region `pointer` points to
    /// at `node`, per the configured policy. With `create_on_miss` (used by
    /// the transfer functions of memory-writing nodes), a miss materializes
    /// a fresh object bound to the pointer's target.
    fn resolve_memory_objects(
        &mut self,
        graph: &PointerGraph,
        node: NodeId,
        pointer: Pointer,
        create_on_miss: bool,
    ) -> Vec<MemoryObjectId> {
        let map_id = match self.node_info.get(node.index()).and_then(|info| info.memory_map) {
            Some(map_id) => map_id,
            None => return Vec::new(),
        };
        let mut objects = Vec::new();
        let mut found_concrete = false;
        for (entry, entry_objects) in self.memory_maps[map_id.index()].object_range(pointer.target)
        {
            let entry_unknown = entry.offset.is_unknown();
            if pointer.offset.is_unknown() || entry_unknown || entry.offset == pointer.offset {
                objects.extend(entry_objects.iter().copied());
                if !entry_unknown {
                    found_concrete = true;
                }
            }
        }
        if matches!(self.config.policy, FlowPolicy::FlowSensitiveWithoutMerge) {
            // states are not merged at joins, so definitions that did not
            // reach this node's map are looked up backwards on demand
            let is_store = matches!(graph.node(node).kind(), NodeKind::Store { .. });
            if objects.is_empty() {
                if !is_store {
                    self.lookup_definitions(graph, node, pointer, &mut objects);
                }
            } else if !found_concrete || pointer.offset.is_unknown() {
                self.lookup_definitions(graph, node, pointer, &mut objects);
            }
        }
        if objects.is_empty() && create_on_miss && Self::writes_memory(graph.node(node).kind()) {
            let object = self.new_memory_object(pointer.target);
            self.memory_maps[map_id.index()].insert_object(pointer, object);
            objects.push(object);
        }
        objects.sort();
        objects.dedup();
        objects
    }

    /// Walk the predecessor edges backwards (depth-first, marking visited
    /// nodes with a rolling counter) and collect the memory objects
    /// recorded for `pointer`. A concrete match stops the walk on its path;
    /// entries with an unknown offset are collected but the search
    /// continues, since a concrete definition may still follow.
    fn lookup_definitions(
        &mut self,
        graph: &PointerGraph,
        start: NodeId,
        pointer: Pointer,
        objects: &mut Vec<MemoryObjectId>,
    ) {
        self.current_dfs += 1;
        let current_dfs = self.current_dfs;
        let mut stack = graph.node(start).predecessors().to_vec();
        while let Some(pred) = stack.pop() {
            let info = &mut self.node_info[pred.index()];
            if info.dfsid == current_dfs {
                continue;
            }
            info.dfsid = current_dfs;
            let map_id = match info.memory_map {
                Some(map_id) => map_id,
                None => continue,
            };
            let map = &self.memory_maps[map_id.index()];
            if let Some(entry_objects) = map.get(&Pointer {
                target: pointer.target,
                offset: Offset::UNKNOWN,
            }) {
                // this may not have been the final definition, as the
                // offset is unknown
                objects.extend(entry_objects.iter().copied());
            }
            if let Some(entry_objects) = map.get(&pointer) {
                objects.extend(entry_objects.iter().copied());
                continue;
            }
            stack.extend_from_slice(graph.node(pred).predecessors());
        }
    }

    fn new_memory_map(&mut self) -> MemoryMapId {
        let id = MemoryMapId::from_index(self.memory_maps.len());
        self.memory_maps.push(MemoryMap::new());
        id
    }

    fn new_memory_object(&mut self, node: NodeId) -> MemoryObjectId {
        let id = MemoryObjectId::from_index(self.memory_objects.len());
        self.memory_objects.push(MemoryObject::new(node));
        id
    }

    fn merge_maps(
        &mut self,
        dst: MemoryMapId,
        src: MemoryMapId,
        strong_update: Option<&PointsToSet>,
    ) -> bool {
        if dst == src {
            return false;
        }
        let (dst_map, src_map) = two_maps_mut(&mut self.memory_maps, dst, src);
        dst_map.merge_from(src_map, strong_update)
    }

    fn log_info(&self, text: String) {
        let _ = self
            .log_sender
            .send(LogMessage::new_info(text).source(LOG_SOURCE).into());
    }

    fn log_debug(&self, text: String, location: NodeId) {
        let _ = self.log_sender.send(
            LogMessage::new_debug(text)
                .source(LOG_SOURCE)
                .location(location)
                .into(),
        );
    }
}

/// Split-borrow two distinct maps of the arena, the first one mutably.
fn two_maps_mut(
    maps: &mut [MemoryMap],
    dst: MemoryMapId,
    src: MemoryMapId,
) -> (&mut MemoryMap, &MemoryMap) {
    assert_ne!(dst, src);
    if dst.index() < src.index() {
        let (left, right) = maps.split_at_mut(src.index());
        (&mut left[dst.index()], &right[0])
    } else {
        let (left, right) = maps.split_at_mut(dst.index());
        (&mut right[0], &left[src.index()])
    }
}
