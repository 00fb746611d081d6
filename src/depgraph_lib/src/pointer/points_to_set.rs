use super::Pointer;
use crate::graph::NodeId;
use crate::prelude::*;
use std::collections::BTreeSet;

/// A set of abstract pointers with an absorbing unknown state.
///
/// Once a pointer into unknown memory is added, the set collapses to the
/// canonical singleton `{(UNKNOWN_NODE, UNKNOWN)}` and further insertions are
/// no-ops. Apart from the collapse the set only ever grows; the points-to
/// fixpoint relies on this monotonicity for termination.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct PointsToSet {
    pointers: BTreeSet<Pointer>,
    is_unknown: bool,
}

impl PointsToSet {
    /// Create an empty points-to set.
    pub fn new() -> PointsToSet {
        PointsToSet::default()
    }

    /// Add a pointer to the set. Returns whether the set changed.
    ///
    /// Adding a pointer into unknown memory collapses the set to the
    /// canonical unknown singleton, discarding all other members.
    pub fn add(&mut self, pointer: Pointer) -> bool {
        if self.is_unknown {
            return false;
        }
        if pointer.is_unknown() {
            self.make_unknown();
            return true;
        }
        self.pointers.insert(pointer)
    }

    /// Add all pointers of `other` to the set. Returns whether the set changed.
    pub fn add_all(&mut self, other: &PointsToSet) -> bool {
        if self.is_unknown {
            return false;
        }
        if other.is_unknown {
            self.make_unknown();
            return true;
        }
        let mut changed = false;
        for pointer in other.pointers.iter() {
            changed |= self.pointers.insert(*pointer);
        }
        changed
    }

    /// Collapse the set to the unknown state.
    fn make_unknown(&mut self) {
        self.pointers.clear();
        self.pointers.insert(Pointer::unknown());
        self.is_unknown = true;
    }

    /// Returns whether the set is in the unknown state.
    pub fn is_unknown(&self) -> bool {
        self.is_unknown
    }

    /// Returns whether the set contains exactly the unknown pointer.
    pub fn points_to_unknown_only(&self) -> bool {
        self.is_unknown
    }

    /// Membership test for a concrete pointer.
    pub fn contains(&self, pointer: &Pointer) -> bool {
        self.pointers.contains(pointer)
    }

    /// Returns whether any member of the set has the given target,
    /// regardless of its offset.
    pub fn points_to_target(&self, target: NodeId) -> bool {
        self.pointers
            .iter()
            .any(|pointer| pointer.target == target)
    }

    /// Iterate over the members of the set in target/offset order.
    /// An unknown set yields the canonical unknown pointer.
    pub fn iter(&self) -> impl Iterator<Item = &Pointer> {
        self.pointers.iter()
    }

    /// The number of pointers in the set.
    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    /// Returns whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    /// If the set is a singleton, return its only member.
    pub fn get_single(&self) -> Option<Pointer> {
        if self.pointers.len() == 1 {
            self.pointers.iter().next().copied()
        } else {
            None
        }
    }
}

impl<'a> IntoIterator for &'a PointsToSet {
    type Item = &'a Pointer;
    type IntoIter = std::collections::btree_set::Iter<'a, Pointer>;

    fn into_iter(self) -> Self::IntoIter {
        self.pointers.iter()
    }
}

impl FromIterator<Pointer> for PointsToSet {
    fn from_iter<I: IntoIterator<Item = Pointer>>(iter: I) -> PointsToSet {
        let mut set = PointsToSet::new();
        for pointer in iter {
            set.add(pointer);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::Offset;

    fn ptr(target: u32, offset: u64) -> Pointer {
        Pointer::new(NodeId::new(target as usize), Offset::new(offset))
    }

    #[test]
    fn add_reports_change() {
        let mut set = PointsToSet::new();
        assert!(set.add(ptr(5, 0)));
        assert!(!set.add(ptr(5, 0)));
        assert!(set.add(ptr(5, 4)));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn unknown_absorbs_everything() {
        let mut set = PointsToSet::new();
        assert!(set.add(ptr(5, 0)));
        assert!(set.add(Pointer::unknown()));
        assert!(set.is_unknown());
        assert_eq!(set.len(), 1);
        assert!(set.contains(&Pointer::unknown()));
        // further insertions are no-ops
        assert!(!set.add(ptr(6, 0)));
        assert!(!set.add(Pointer::unknown()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn add_all_merges_unknown_state() {
        let mut unknown = PointsToSet::new();
        unknown.add(Pointer::unknown());

        let mut set = PointsToSet::new();
        set.add(ptr(1, 0));
        assert!(set.add_all(&unknown));
        assert!(set.is_unknown());
        assert!(!set.add_all(&unknown));
    }

    #[test]
    fn points_to_target_ignores_offset() {
        let mut set = PointsToSet::new();
        set.add(ptr(7, 16));
        assert!(set.points_to_target(NodeId::new(7)));
        assert!(!set.points_to_target(NodeId::new(8)));
    }
}
