use crate::pointer::{Offset, Pointer, PointsToSet};
use crate::prelude::*;
use std::collections::BTreeMap;

/// The stable identifier of a [`MemoryObject`] inside the arena of a
/// points-to analysis run.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct MemoryObjectId(usize);

impl MemoryObjectId {
    pub(crate) fn from_index(index: usize) -> MemoryObjectId {
        MemoryObjectId(index)
    }

    /// The raw index of the object in the analysis arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for MemoryObjectId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "mo{}", self.0)
    }
}

/// An abstraction of one runtime memory region: a map from byte offsets to
/// the pointers possibly stored at that offset.
///
/// Offsets that were never written are simply absent. The
/// [`Offset::UNKNOWN`] slot approximates a write to an unresolved offset
/// and is unioned into every read.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct MemoryObject {
    /// The allocation node this object abstracts.
    node: NodeId,
    points_to: BTreeMap<Offset, PointsToSet>,
}

impl MemoryObject {
    /// Create an empty memory object bound to its allocation node.
    pub fn new(node: NodeId) -> MemoryObject {
        MemoryObject {
            node,
            points_to: BTreeMap::new(),
        }
    }

    /// The allocation node this object abstracts.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The pointers stored at the given offset, if any were recorded.
    pub fn get(&self, offset: Offset) -> Option<&PointsToSet> {
        self.points_to.get(&offset)
    }

    /// Add a single pointer at the given offset. Returns whether the
    /// object changed.
    pub fn add_points_to(&mut self, offset: Offset, pointer: Pointer) -> bool {
        self.points_to.entry(offset).or_default().add(pointer)
    }

    /// Union a whole points-to set into the given offset slot. Returns
    /// whether the object changed.
    pub fn add_points_to_set(&mut self, offset: Offset, pointers: &PointsToSet) -> bool {
        if pointers.is_empty() {
            return false;
        }
        self.points_to.entry(offset).or_default().add_all(pointers)
    }

    /// Replace the contents of the given offset slot (a strong update).
    /// Returns whether the object changed.
    pub fn update_points_to(&mut self, offset: Offset, pointers: &PointsToSet) -> bool {
        match self.points_to.get(&offset) {
            Some(old) if old == pointers => false,
            _ => {
                self.points_to.insert(offset, pointers.clone());
                true
            }
        }
    }

    /// Iterate over the offset slots of the object in offset order.
    pub fn iter(&self) -> impl Iterator<Item = (&Offset, &PointsToSet)> {
        self.points_to.iter()
    }

    /// The offsets that have been written, in ascending order.
    pub fn offsets(&self) -> impl Iterator<Item = Offset> + '_ {
        self.points_to.keys().copied()
    }

    /// The number of distinct offset slots.
    pub fn len(&self) -> usize {
        self.points_to.len()
    }

    /// Returns whether no offset was written yet.
    pub fn is_empty(&self) -> bool {
        self.points_to.is_empty()
    }
}
