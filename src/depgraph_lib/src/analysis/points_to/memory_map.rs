use super::MemoryObjectId;
use crate::pointer::{Offset, Pointer, PointsToSet};
use crate::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// The stable identifier of a [`MemoryMap`] inside the arena of a
/// points-to analysis run.
///
/// Nodes that cannot change the memory state share their predecessor's map
/// by holding the same ID.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct MemoryMapId(usize);

impl MemoryMapId {
    pub(crate) fn from_index(index: usize) -> MemoryMapId {
        MemoryMapId(index)
    }

    /// The raw index of the map in the analysis arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// The per-program-point memory environment: which memory objects are
/// reachable through which abstract pointer.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct MemoryMap {
    entries: BTreeMap<Pointer, BTreeSet<MemoryObjectId>>,
}

impl MemoryMap {
    /// Create an empty memory map.
    pub fn new() -> MemoryMap {
        MemoryMap::default()
    }

    /// The objects recorded for exactly this pointer (target and offset).
    pub fn get(&self, pointer: &Pointer) -> Option<&BTreeSet<MemoryObjectId>> {
        self.entries.get(pointer)
    }

    /// Record an object for a pointer. Returns whether the map changed.
    pub fn insert_object(&mut self, pointer: Pointer, object: MemoryObjectId) -> bool {
        self.entries.entry(pointer).or_default().insert(object)
    }

    /// Remove the entry for a pointer, returning its objects if present.
    ///
    /// Only the invalidation-aware analysis removes entries, and only while
    /// a matching strong-update set is in force at the following merge.
    pub fn remove_entry(&mut self, pointer: &Pointer) -> Option<BTreeSet<MemoryObjectId>> {
        self.entries.remove(pointer)
    }

    /// Iterate over the entries whose pointer has the given target,
    /// regardless of the pointer offset.
    pub fn object_range(
        &self,
        target: NodeId,
    ) -> impl Iterator<Item = (&Pointer, &BTreeSet<MemoryObjectId>)> {
        let low = Pointer {
            target,
            offset: Offset::new(0),
        };
        let high = Pointer {
            target,
            offset: Offset::UNKNOWN,
        };
        self.entries.range(low..=high)
    }

    /// Iterate over all entries in pointer order.
    pub fn iter(&self) -> impl Iterator<Item = (&Pointer, &BTreeSet<MemoryObjectId>)> {
        self.entries.iter()
    }

    /// The pointers that currently have an entry.
    pub fn pointers(&self) -> impl Iterator<Item = Pointer> + '_ {
        self.entries.keys().copied()
    }

    /// The number of entries in the map.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge the entries of `other` into `self`.
    ///
    /// Entries whose pointer is a member of the `strong_update` set are
    /// skipped, so the merger's own contribution for those pointers
    /// replaces the predecessor state instead of being unioned with it.
    /// Returns whether `self` changed.
    pub fn merge_from(&mut self, other: &MemoryMap, strong_update: Option<&PointsToSet>) -> bool {
        let mut changed = false;
        for (pointer, objects) in other.entries.iter() {
            if let Some(strong_update) = strong_update {
                if strong_update.contains(pointer) {
                    continue;
                }
            }
            let slot = self.entries.entry(*pointer).or_default();
            for object in objects {
                changed |= slot.insert(*object);
            }
        }
        changed
    }
}
