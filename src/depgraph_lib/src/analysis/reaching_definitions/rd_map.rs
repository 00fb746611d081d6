use crate::pointer::Offset;
use crate::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Take two byte intervals `(a, a_len)` and `(b, b_len)`, where `a`/`b` is
/// the start of the interval and `a_len`/`b_len` its length, and check
/// whether they are disjoint.
///
/// The lengths may be [`Offset::UNKNOWN`], in which case the interval
/// extends arbitrarily far. The starts must be concrete and the lengths
/// strictly positive; violations are precondition errors.
pub fn intervals_disjunctive(a: Offset, a_len: Offset, b: Offset, b_len: Offset) -> bool {
    let a = a.value().expect("Start of an interval is unknown");
    let b = b.value().expect("Start of an interval is unknown");
    match (a_len.value(), b_len.value()) {
        (None, None) => false,
        (None, Some(b_len)) => {
            assert!(b_len > 0, "Interval of length 0 given");
            // the unknown-length interval covers everything from a upwards
            if a <= b {
                false
            } else {
                b_len <= a - b
            }
        }
        (Some(a_len), None) => {
            assert!(a_len > 0, "Interval of length 0 given");
            if a <= b {
                a_len <= b - a
            } else {
                false
            }
        }
        (Some(a_len), Some(b_len)) => {
            assert!(a_len > 0 && b_len > 0, "Interval of length 0 given");
            if a <= b {
                a_len <= b - a
            } else {
                b_len <= a - b
            }
        }
    }
}

/// Check whether two byte intervals overlap (inclusive of touching ends).
pub fn intervals_overlap(a: Offset, a_len: Offset, b: Offset, b_len: Offset) -> bool {
    !intervals_disjunctive(a, a_len, b, b_len)
}

/// A definition site: a byte range `[offset, offset + len)` of the memory
/// region named by `target` that some node defines.
///
/// Offset and length may independently be [`Offset::UNKNOWN`].
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct DefSite {
    /// The node naming the defined memory region.
    pub target: NodeId,
    /// The first defined byte.
    pub offset: Offset,
    /// The number of defined bytes.
    pub len: Offset,
}

impl DefSite {
    /// Create a definition site. An empty concrete byte range is a
    /// precondition error.
    pub fn new(target: NodeId, offset: Offset, len: Offset) -> DefSite {
        assert!(
            offset.is_unknown() || len.is_unknown() || len.value() != Some(0),
            "Invalid offset and length given"
        );
        DefSite {
            target,
            offset,
            len,
        }
    }

    /// A definition site covering the whole region of `target`.
    pub fn whole(target: NodeId) -> DefSite {
        DefSite {
            target,
            offset: Offset::UNKNOWN,
            len: Offset::UNKNOWN,
        }
    }
}

/// A set of defining nodes with an absorbing unknown state.
///
/// Once the unknown memory node is inserted, the set collapses to the
/// singleton containing only it, mirroring the unknown state of points-to
/// sets.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct RdNodesSet {
    nodes: BTreeSet<NodeId>,
    is_unknown: bool,
}

impl RdNodesSet {
    /// Create an empty set.
    pub fn new() -> RdNodesSet {
        RdNodesSet::default()
    }

    /// Collapse the set to the unknown state.
    pub fn make_unknown(&mut self) {
        self.nodes.clear();
        self.nodes.insert(NodeId::UNKNOWN_NODE);
        self.is_unknown = true;
    }

    /// Insert a defining node. Returns whether the set changed.
    /// Inserting the unknown memory node collapses the set.
    pub fn insert(&mut self, node: NodeId) -> bool {
        if self.is_unknown {
            return false;
        }
        if node == NodeId::UNKNOWN_NODE {
            self.make_unknown();
            return true;
        }
        self.nodes.insert(node)
    }

    /// Returns whether the set is in the unknown state.
    pub fn is_unknown(&self) -> bool {
        self.is_unknown
    }

    /// Membership test.
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// The number of nodes in the set.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over the nodes of the set.
    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.iter()
    }
}

impl FromIterator<NodeId> for RdNodesSet {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> RdNodesSet {
        let mut set = RdNodesSet::new();
        for node in iter {
            set.insert(node);
        }
        set
    }
}

/// The reaching-definitions map of one program point: for every known
/// definition site, the set of nodes whose definition of that site may
/// still be visible.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct RdMap {
    defs: BTreeMap<DefSite, RdNodesSet>,
}

impl RdMap {
    /// Create an empty map.
    pub fn new() -> RdMap {
        RdMap::default()
    }

    /// Returns whether the map holds no definitions.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// The number of definition sites in the map.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Record `node` as an additional definition of `site`.
    /// Returns whether the map changed.
    pub fn add(&mut self, site: DefSite, node: NodeId) -> bool {
        self.defs.entry(site).or_default().insert(node)
    }

    /// Record `node` as the only definition of `site` (a strong update).
    /// Returns whether the map changed.
    pub fn update(&mut self, site: DefSite, node: NodeId) -> bool {
        match self.defs.get(&site) {
            Some(nodes) if !nodes.is_unknown() && nodes.len() == 1 && nodes.contains(node) => false,
            _ => {
                self.defs.insert(site, [node].into_iter().collect());
                true
            }
        }
    }

    /// Returns whether the exact definition site is present.
    pub fn defines(&self, site: &DefSite) -> bool {
        self.defs.contains_key(site)
    }

    /// Returns whether any definition site with the given target is
    /// present, regardless of offset and length.
    pub fn defines_with_any_offset(&self, target: NodeId) -> bool {
        self.object_range(target).next().is_some()
    }

    /// Iterate over the definition sites with the given target.
    pub fn object_range(&self, target: NodeId) -> impl Iterator<Item = (&DefSite, &RdNodesSet)> {
        let low = DefSite {
            target,
            offset: Offset::new(0),
            len: Offset::new(0),
        };
        let high = DefSite {
            target,
            offset: Offset::UNKNOWN,
            len: Offset::UNKNOWN,
        };
        self.defs.range(low..=high)
    }

    /// Iterate over all entries in definition-site order.
    pub fn iter(&self) -> impl Iterator<Item = (&DefSite, &RdNodesSet)> {
        self.defs.iter()
    }

    /// Gather the definitions of the byte range `[offset, offset + len)`
    /// of the region named by `target` into `result`. Entries with an
    /// unknown offset always match; others match when their byte range is
    /// not disjoint from the queried one. Returns the number of gathered
    /// nodes.
    pub fn get(
        &self,
        target: NodeId,
        offset: Offset,
        len: Offset,
        result: &mut BTreeSet<NodeId>,
    ) -> usize {
        let before = result.len();
        for (site, nodes) in self.object_range(target) {
            let matches = if offset.is_unknown() || site.offset.is_unknown() {
                true
            } else {
                !intervals_disjunctive(site.offset, site.len, offset, len)
            };
            if matches {
                result.extend(nodes.iter().copied());
            }
        }
        result.len() - before
    }

    /// Merge the entries of `other` into `self`.
    ///
    /// Entries whose definition site is in the `without` set are skipped,
    /// so the merger's own (strong) definition of those sites survives the
    /// merge. A merged set that grows beyond `max_set_size` collapses to
    /// the unknown state. Returns whether `self` changed.
    pub fn merge(
        &mut self,
        other: &RdMap,
        without: Option<&BTreeSet<DefSite>>,
        max_set_size: u64,
    ) -> bool {
        let mut changed = false;
        for (site, nodes) in other.defs.iter() {
            if let Some(without) = without {
                if without.contains(site) {
                    continue;
                }
            }
            let slot = self.defs.entry(*site).or_default();
            if nodes.is_unknown() {
                if !slot.is_unknown() {
                    slot.make_unknown();
                    changed = true;
                }
                continue;
            }
            for node in nodes.iter() {
                changed |= slot.insert(*node);
            }
            if slot.len() as u64 > max_set_size && !slot.is_unknown() {
                slot.make_unknown();
                changed = true;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(target: usize, offset: u64, len: u64) -> DefSite {
        DefSite::new(NodeId::new(target), Offset::new(offset), Offset::new(len))
    }

    fn node(index: usize) -> NodeId {
        NodeId::new(index)
    }

    #[test]
    fn disjunctive_intervals() {
        let off = Offset::new;
        // both concrete
        assert!(intervals_disjunctive(off(0), off(4), off(4), off(4)));
        assert!(!intervals_disjunctive(off(0), off(5), off(4), off(4)));
        assert!(intervals_disjunctive(off(8), off(2), off(0), off(8)));
        assert!(!intervals_disjunctive(off(7), off(2), off(0), off(8)));
        // one length unknown
        assert!(!intervals_disjunctive(off(0), Offset::UNKNOWN, off(100), off(1)));
        assert!(intervals_disjunctive(off(8), Offset::UNKNOWN, off(0), off(8)));
        assert!(!intervals_disjunctive(off(8), Offset::UNKNOWN, off(0), off(9)));
        // both unknown
        assert!(!intervals_disjunctive(
            off(1000),
            Offset::UNKNOWN,
            off(0),
            Offset::UNKNOWN
        ));
    }

    #[test]
    fn disjunctive_intervals_is_symmetric() {
        let off = Offset::new;
        let lengths = [Offset::new(1), Offset::new(4), Offset::UNKNOWN];
        for a in 0..6u64 {
            for b in 0..6u64 {
                for a_len in lengths {
                    for b_len in lengths {
                        assert_eq!(
                            intervals_disjunctive(off(a), a_len, off(b), b_len),
                            intervals_disjunctive(off(b), b_len, off(a), a_len),
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn unknown_node_collapses_the_set() {
        let mut set = RdNodesSet::new();
        assert!(set.insert(node(5)));
        assert!(set.insert(NodeId::UNKNOWN_NODE));
        assert!(set.is_unknown());
        assert_eq!(set.len(), 1);
        assert!(!set.insert(node(6)));
        assert!(set.contains(NodeId::UNKNOWN_NODE));
    }

    #[test]
    fn add_and_update() {
        let mut map = RdMap::new();
        assert!(map.add(site(3, 0, 4), node(10)));
        assert!(map.add(site(3, 0, 4), node(11)));
        assert!(!map.add(site(3, 0, 4), node(10)));
        assert_eq!(map.len(), 1);

        assert!(map.update(site(3, 0, 4), node(12)));
        assert!(!map.update(site(3, 0, 4), node(12)));
        let mut result = std::collections::BTreeSet::new();
        map.get(node(3), Offset::new(0), Offset::new(4), &mut result);
        assert_eq!(result.into_iter().collect::<Vec<_>>(), vec![node(12)]);
    }

    #[test]
    fn get_matches_overlapping_ranges_only() {
        let mut map = RdMap::new();
        map.add(site(3, 0, 4), node(10));
        map.add(site(3, 4, 4), node(11));
        map.add(site(4, 0, 4), node(12));

        let mut result = std::collections::BTreeSet::new();
        map.get(node(3), Offset::new(2), Offset::new(4), &mut result);
        // [2,6) overlaps both defined ranges of target 3, but nothing of
        // target 4
        assert!(result.contains(&node(10)));
        assert!(result.contains(&node(11)));
        assert!(!result.contains(&node(12)));

        let mut result = std::collections::BTreeSet::new();
        map.get(node(3), Offset::new(4), Offset::new(1), &mut result);
        assert!(!result.contains(&node(10)));
        assert!(result.contains(&node(11)));
    }

    #[test]
    fn get_with_unknown_offset_matches_everything_of_the_target() {
        let mut map = RdMap::new();
        map.add(site(3, 0, 4), node(10));
        map.add(site(3, 32, 4), node(11));
        let mut result = std::collections::BTreeSet::new();
        map.get(node(3), Offset::UNKNOWN, Offset::new(1), &mut result);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn defines_queries() {
        let mut map = RdMap::new();
        map.add(site(3, 8, 4), node(10));
        assert!(map.defines(&site(3, 8, 4)));
        assert!(!map.defines(&site(3, 0, 4)));
        assert!(map.defines_with_any_offset(node(3)));
        assert!(!map.defines_with_any_offset(node(4)));
    }

    #[test]
    fn merge_unions_and_respects_without() {
        let mut left = RdMap::new();
        left.update(site(3, 0, 4), node(10));
        let mut right = RdMap::new();
        right.add(site(3, 0, 4), node(11));
        right.add(site(5, 0, 8), node(12));

        let without: std::collections::BTreeSet<DefSite> = [site(3, 0, 4)].into_iter().collect();
        assert!(left.merge(&right, Some(&without), u64::MAX));
        // the strongly updated site kept only the merger's definition
        let mut result = std::collections::BTreeSet::new();
        left.get(node(3), Offset::new(0), Offset::new(4), &mut result);
        assert_eq!(result.into_iter().collect::<Vec<_>>(), vec![node(10)]);
        assert!(left.defines(&site(5, 0, 8)));

        // without the skip set the definitions are unioned
        let mut left = RdMap::new();
        left.update(site(3, 0, 4), node(10));
        assert!(left.merge(&right, None, u64::MAX));
        let mut result = std::collections::BTreeSet::new();
        left.get(node(3), Offset::new(0), Offset::new(4), &mut result);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn merge_collapses_oversized_sets() {
        let mut left = RdMap::new();
        left.add(site(3, 0, 4), node(10));
        let mut right = RdMap::new();
        right.add(site(3, 0, 4), node(11));
        right.add(site(3, 0, 4), node(12));

        assert!(left.merge(&right, None, 2));
        let slot: Vec<_> = left.iter().map(|(_, nodes)| nodes.clone()).collect();
        assert!(slot[0].is_unknown());
    }
}
