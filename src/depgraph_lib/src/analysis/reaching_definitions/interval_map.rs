//! Mapping of disjoint discrete intervals of byte offsets to sets of
//! values.

use crate::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// A closed integer interval `[start, end]` with `start <= end`.
///
/// Intervals are ordered by their start; the map below never stores two
/// intervals with the same start, so the derived order is total on its
/// keys.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct Interval {
    /// The first element of the interval.
    pub start: i64,
    /// The last element of the interval (inclusive).
    pub end: i64,
}

impl Interval {
    /// Create a new interval. Panics when `start > end`.
    pub fn new(start: i64, end: i64) -> Interval {
        assert!(start <= end, "Invalid interval");
        Interval { start, end }
    }
}

impl From<(i64, i64)> for Interval {
    fn from((start, end): (i64, i64)) -> Interval {
        Interval::new(start, end)
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "[{},{}]", self.start, self.end)
    }
}

/// The lowest query key for entries starting at or after `start`.
fn lower_key(start: i64) -> Interval {
    Interval {
        start,
        end: i64::MIN,
    }
}

/// The highest query key for entries starting at or before `start`.
fn upper_key(start: i64) -> Interval {
    Interval {
        start,
        end: i64::MAX,
    }
}

/// A map from pairwise disjoint closed intervals to sets of values.
///
/// The map maintains three invariants after every mutation:
/// * the intervals are sorted by their start,
/// * consecutive intervals neither touch nor overlap,
/// * there is no empty interval and no entry with an empty value set.
///
/// Inserting an interval that overlaps stored entries first splits the
/// stored entries at the borders of the inserted interval, so that every
/// stored interval lies either entirely inside or entirely outside of it,
/// then distributes the value over the covered sub-intervals and the gaps.
/// Adjacent entries that end up carrying equal value sets are coalesced
/// back into one entry.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct DisjunctiveIntervalMap<V: Ord + Clone> {
    mapping: BTreeMap<Interval, BTreeSet<V>>,
}

impl<V: Ord + Clone> Default for DisjunctiveIntervalMap<V> {
    fn default() -> DisjunctiveIntervalMap<V> {
        DisjunctiveIntervalMap {
            mapping: BTreeMap::new(),
        }
    }
}

impl<V: Ord + Clone> DisjunctiveIntervalMap<V> {
    /// Create an empty map.
    pub fn new() -> DisjunctiveIntervalMap<V> {
        DisjunctiveIntervalMap::default()
    }

    /// Union `value` into every sub-interval of `interval`, filling gaps
    /// with new singleton entries.
    /// Returns true if the mapping was updated anyhow (intervals split,
    /// value added).
    pub fn add(&mut self, interval: impl Into<Interval>, value: V) -> bool {
        self.insert_impl(interval.into(), value, false)
    }

    /// Replace the value sets of every sub-interval of `interval` with
    /// `{value}`, filling gaps likewise.
    /// Returns true if the mapping was updated anyhow.
    pub fn update(&mut self, interval: impl Into<Interval>, value: V) -> bool {
        self.insert_impl(interval.into(), value, true)
    }

    /// Returns whether any stored interval intersects `interval`
    /// (inclusive endpoints).
    pub fn overlaps(&self, interval: impl Into<Interval>) -> bool {
        let interval = interval.into();
        // the only candidate is the last entry starting at or before the
        // query's end: everything before it lies left of it, everything
        // after it starts right of the query
        match self
            .mapping
            .range(..=upper_key(interval.end))
            .next_back()
            .map(|(key, _)| *key)
        {
            Some(candidate) => candidate.end >= interval.start,
            None => false,
        }
    }

    /// Returns whether the stored intervals together cover every element
    /// of `interval`, without a gap.
    pub fn overlaps_full(&self, interval: impl Into<Interval>) -> bool {
        let interval = interval.into();
        let first = match self
            .mapping
            .range(..=upper_key(interval.start))
            .next_back()
            .map(|(key, _)| *key)
        {
            Some(first) if first.end >= interval.start => first,
            _ => return false,
        };
        let mut covered_to = first.end;
        while covered_to < interval.end {
            let next_start = match covered_to.checked_add(1) {
                Some(next_start) => next_start,
                None => break,
            };
            match self
                .mapping
                .range(lower_key(next_start)..)
                .next()
                .map(|(key, _)| *key)
            {
                Some(next) if next.start == next_start => covered_to = next.end,
                _ => return false,
            }
        }
        true
    }

    /// Returns whether the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// The number of stored intervals.
    pub fn size(&self) -> usize {
        self.mapping.len()
    }

    /// Iterate over the entries in interval order.
    pub fn iter(&self) -> impl Iterator<Item = (&Interval, &BTreeSet<V>)> {
        self.mapping.iter()
    }

    fn insert_impl(&mut self, interval: Interval, value: V, update: bool) -> bool {
        if self.mapping.is_empty() {
            self.mapping
                .insert(interval, BTreeSet::from_iter([value]));
            return true;
        }

        let mut changed = self.split_external_borders(&interval);
        self.debug_check_disjoint();

        // the borders are split: every stored interval is now entirely
        // inside or entirely outside of the inserted one. Distribute the
        // value over the covered sub-intervals and remember the gaps; the
        // gap entries are emplaced after the scan, so the scan never
        // iterates over entries it inserts itself.
        let covered: Vec<Interval> = self
            .mapping
            .range(lower_key(interval.start)..=upper_key(interval.end))
            .map(|(key, _)| *key)
            .collect();
        let mut gaps: Vec<Interval> = Vec::new();
        let mut cursor = Some(interval.start);
        for key in covered {
            debug_assert!(key.end <= interval.end);
            if let Some(position) = cursor {
                if position < key.start {
                    gaps.push(Interval::new(position, key.start - 1));
                }
            }
            changed |= self.add_value(&key, &value, update);
            cursor = key.end.checked_add(1);
        }
        if let Some(position) = cursor {
            if position <= interval.end {
                gaps.push(Interval::new(position, interval.end));
            }
        }
        for gap in gaps {
            self.mapping.insert(gap, BTreeSet::from_iter([value.clone()]));
            changed = true;
        }

        self.coalesce_around(&interval);
        self.debug_check_disjoint();
        changed
    }

    /// Union or replace the value in the set of an existing entry.
    fn add_value(&mut self, key: &Interval, value: &V, update: bool) -> bool {
        let values = self.mapping.get_mut(key).expect("Entry disappeared");
        if update {
            if values.len() == 1 && values.contains(value) {
                return false;
            }
            values.clear();
            values.insert(value.clone());
            true
        } else {
            values.insert(value.clone())
        }
    }

    /// Split the stored entries straddling the borders of `interval`, so
    /// that afterwards every stored interval lies entirely inside or
    /// entirely outside of it. Returns whether anything was split.
    fn split_external_borders(&mut self, interval: &Interval) -> bool {
        let mut changed = false;
        // an entry beginning left of the interval and reaching into it is
        // split at the left border
        if let Some(previous) = self
            .mapping
            .range(..lower_key(interval.start))
            .next_back()
            .map(|(key, _)| *key)
        {
            if previous.end >= interval.start {
                debug_assert!(previous.start < interval.start);
                self.split_interval(previous, interval.start - 1);
                changed = true;
            }
        }
        // an entry beginning inside the interval and reaching beyond it is
        // split at the right border
        if let Some(last) = self
            .mapping
            .range(..=upper_key(interval.end))
            .next_back()
            .map(|(key, _)| *key)
        {
            if last.start >= interval.start && last.end > interval.end {
                self.split_interval(last, interval.end);
                changed = true;
            }
        }
        changed
    }

    /// Split the entry at `key` into `[key.start, at]` and
    /// `[at + 1, key.end]`, both inheriting the original value set.
    fn split_interval(&mut self, key: Interval, at: i64) {
        debug_assert!(key.start <= at && at < key.end, "Cannot split here");
        let values = self.mapping.remove(&key).expect("Entry disappeared");
        self.mapping.insert(Interval::new(key.start, at), values.clone());
        self.mapping.insert(Interval::new(at + 1, key.end), values);
    }

    /// Merge neighbouring entries around the mutated range whose intervals
    /// are contiguous and whose value sets are equal.
    fn coalesce_around(&mut self, interval: &Interval) {
        let window_start = self
            .mapping
            .range(..lower_key(interval.start))
            .next_back()
            .map(|(key, _)| key.start)
            .unwrap_or(interval.start);
        let window: Vec<Interval> = self
            .mapping
            .range(lower_key(window_start)..)
            .map(|(key, _)| *key)
            .take_while(|key| key.start <= interval.end.saturating_add(1))
            .collect();
        let mut window = window.into_iter();
        let mut current = match window.next() {
            Some(current) => current,
            None => return,
        };
        for next in window {
            let contiguous = current.end.checked_add(1) == Some(next.start);
            if contiguous && self.mapping[&current] == self.mapping[&next] {
                let values = self.mapping.remove(&next).expect("Entry disappeared");
                self.mapping.remove(&current);
                let merged = Interval::new(current.start, next.end);
                self.mapping.insert(merged, values);
                current = merged;
            } else {
                current = next;
            }
        }
    }

    /// Verify the disjointness invariant in debug builds.
    fn debug_check_disjoint(&self) {
        if cfg!(debug_assertions) {
            let mut last: Option<Interval> = None;
            for key in self.mapping.keys() {
                debug_assert!(key.start <= key.end);
                if let Some(last) = last {
                    // this one is nontrivial; the others are implied by the
                    // interval constructor and the map order
                    debug_assert!(last.end < key.start, "Intervals overlap or touch order");
                }
                last = Some(*key);
            }
        }
    }
}

#[cfg(test)]
mod tests;
