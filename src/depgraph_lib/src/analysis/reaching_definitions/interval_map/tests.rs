use super::*;

/// Collect the map structure as `(start, end, contains-value)` triples.
fn structure(map: &DisjunctiveIntervalMap<i32>) -> Vec<(i64, i64, Vec<i32>)> {
    map.iter()
        .map(|(interval, values)| {
            (
                interval.start,
                interval.end,
                values.iter().copied().collect(),
            )
        })
        .collect()
}

#[test]
fn querying_empty_map() {
    let map: DisjunctiveIntervalMap<i32> = DisjunctiveIntervalMap::new();
    assert!(map.is_empty());
    assert!(!map.overlaps((0, 10)));
    assert!(!map.overlaps_full((0, 10)));
    assert!(!map.overlaps_full((10, 10)));
}

#[test]
fn add_same() {
    let mut map = DisjunctiveIntervalMap::new();
    map.add((0, 2), 1);
    assert_eq!(map.size(), 1);
    for (start, end) in [(0, 0), (0, 1), (0, 2), (1, 1), (1, 2), (2, 2)] {
        assert!(map.overlaps((start, end)));
        assert!(map.overlaps_full((start, end)));
    }
    for (start, end) in [(0, 3), (1, 3), (2, 3)] {
        assert!(map.overlaps((start, end)));
        assert!(!map.overlaps_full((start, end)));
    }
    assert!(!map.overlaps((3, 3)));
    assert!(!map.overlaps_full((3, 3)));
    assert!(!map.overlaps_full((0, 10)));

    assert!(!map.add((0, 2), 1));
    assert_eq!(map.size(), 1);
}

#[test]
fn add_non_overlapping() {
    let mut map = DisjunctiveIntervalMap::new();
    map.add((0, 2), 1);
    assert!(!map.overlaps((3, 4)));
    map.add((3, 4), 2);
    assert_eq!(map.size(), 2);

    let mut map = DisjunctiveIntervalMap::new();
    map.add((3, 4), 2);
    assert!(map.overlaps((3, 4)));
    assert!(!map.overlaps((0, 2)));
    map.add((0, 2), 1);
    assert_eq!(map.size(), 2);
}

#[test]
fn add_into_wide_interval() {
    let mut map = DisjunctiveIntervalMap::new();
    map.add((0, 10), 1);
    assert_eq!(map.size(), 1);
    assert!(map.overlaps((3, 4)));
    assert!(map.overlaps((7, 15)));
    assert!(map.overlaps((0, 100)));
    assert!(map.overlaps_full((3, 4)));
    assert!(map.overlaps_full((10, 10)));
    assert!(!map.overlaps_full((0, 100)));
    assert!(!map.overlaps((11, 11)));
    assert!(!map.overlaps((11, 99)));

    map.add((100, 101), 2);
    assert_eq!(map.size(), 2);
}

#[test]
fn add_overlapping_at_the_border() {
    let mut map = DisjunctiveIntervalMap::new();
    map.add((0, 2), 1);
    assert!(map.overlaps((2, 3)));
    map.add((2, 3), 2);
    assert_eq!(map.size(), 3);
    assert_eq!(
        structure(&map),
        vec![(0, 1, vec![1]), (2, 2, vec![1, 2]), (3, 3, vec![2])]
    );

    let mut map = DisjunctiveIntervalMap::new();
    map.add((2, 3), 2);
    map.add((0, 2), 1);
    assert_eq!(map.size(), 3);
}

#[test]
fn add_overlapping_tails() {
    let mut map = DisjunctiveIntervalMap::new();
    map.add((1, 3), 1);
    map.add((2, 5), 2);
    assert_eq!(map.size(), 3);

    let mut map = DisjunctiveIntervalMap::new();
    map.add((2, 5), 1);
    map.add((1, 3), 2);
    assert_eq!(map.size(), 3);

    let mut map = DisjunctiveIntervalMap::new();
    map.add((1, 2), 1);
    map.add((0, 4), 2);
    assert_eq!(map.size(), 3);

    let mut map = DisjunctiveIntervalMap::new();
    map.add((0, 4), 1);
    map.add((2, 4), 2);
    assert_eq!(map.size(), 2);
}

#[test]
fn add_fills_gaps() {
    let mut map = DisjunctiveIntervalMap::new();
    map.add((0, 0), 0);
    map.add((1, 1), 1);
    map.add((3, 3), 2);
    assert_eq!(map.size(), 3);

    assert!(map.overlaps_full((0, 0)));
    assert!(map.overlaps_full((0, 1)));
    assert!(!map.overlaps_full((0, 2)));
    assert!(!map.overlaps_full((2, 3)));
    assert!(map.overlaps_full((3, 3)));
    assert!(!map.overlaps_full((3, 5)));
    assert!(map.overlaps((3, 5)));

    map.add((5, 5), 3);
    assert_eq!(map.size(), 4);
    assert!(map.overlaps_full((5, 5)));

    let changed = map.add((5, 5), 3);
    assert!(!changed);
    assert_eq!(map.size(), 4);

    map.add((0, 10), 4);
    assert_eq!(map.size(), 7);

    // the whole range is covered now, but nothing beyond it
    for start in 0..11i64 {
        for end in start..11i64 {
            assert!(map.overlaps_full((start, end)));
        }
    }
    for start in 1..11i64 {
        assert!(!map.overlaps_full((start, 11)));
    }
}

/// Scenario: `add(0..4, 1); add(1..1, 2); add(3..5, 3)`.
#[test]
fn add_multi_cover() {
    let mut map = DisjunctiveIntervalMap::new();
    map.add((0, 4), 1);
    map.add((1, 1), 2);
    map.add((3, 5), 3);
    assert_eq!(map.size(), 5);

    assert!(map.overlaps((0, 0)));
    assert!(map.overlaps((0, 10)));
    assert!(map.overlaps((0, 6)));
    assert!(map.overlaps((1, 5)));

    assert!(map.overlaps_full((0, 5)));
    assert!(map.overlaps_full((1, 5)));
    assert!(!map.overlaps_full((0, 6)));

    let intervals: Vec<Interval> = map.iter().map(|(interval, _)| *interval).collect();
    assert_eq!(
        intervals,
        vec![
            Interval::new(0, 0),
            Interval::new(1, 1),
            Interval::new(2, 2),
            Interval::new(3, 4),
            Interval::new(5, 5),
        ]
    );
}

#[test]
fn overlaps_with_negative_ranges() {
    let mut map = DisjunctiveIntervalMap::new();
    map.add((0, 2), 0);
    assert!(map.overlaps((-1, 5)));
    assert!(map.overlaps((-1, 0)));
    assert!(map.overlaps((-1, 1)));
    assert!(!map.overlaps((-1, -1)));
    assert!(!map.overlaps((-4, -1)));
    assert!(map.overlaps((-4, 10)));
    assert!(!map.overlaps_full((-4, 10)));
    assert!(!map.overlaps_full((-1, 0)));
    assert!(!map.overlaps_full((-1, 1)));
}

/// Scenario: an interval into the negative range.
#[test]
fn negative_range_coverage() {
    let mut map = DisjunctiveIntervalMap::new();
    map.add((-2, 2), 0);
    assert!(map.overlaps((-1, 5)));
    assert!(map.overlaps((-1, -1)));
    assert!(map.overlaps((-4, -1)));
    assert!(map.overlaps((-4, 10)));
    assert!(map.overlaps_full((-1, 1)));
    assert!(map.overlaps_full((-2, 2)));
    assert!(!map.overlaps_full((-4, 10)));
    assert!(!map.overlaps_full((-2, 3)));
    assert!(!map.overlaps_full((-3, 2)));
}

#[test]
fn overlap_probes_across_the_whole_range() {
    let mut map = DisjunctiveIntervalMap::new();
    map.add((0, 10), 0);
    for start in -20..21i64 {
        for end in start..21i64 {
            let hits = start <= 10 && end >= 0;
            assert_eq!(map.overlaps((start, end)), hits);
            assert_eq!(map.overlaps_full((start, end)), start >= 0 && end <= 10);
        }
    }
}

#[test]
fn overlap_before_a_later_entry_is_found() {
    let mut map = DisjunctiveIntervalMap::new();
    map.add((1, 3), 0);
    map.add((5, 6), 1);
    // the query lies inside the first entry even though the closest entry
    // by start is the second one
    assert!(map.overlaps((2, 2)));
    assert!(map.overlaps_full((2, 2)));
    assert!(!map.overlaps((4, 4)));
}

/// Scenario: consecutive updates split a wide interval apart.
#[test]
fn update_splits_covered_intervals() {
    let mut map = DisjunctiveIntervalMap::new();
    map.update((0, 4), 1);

    // now update with intervals whose union is 0..4
    map.update((0, 1), 2);
    map.update((1, 2), 3);
    map.update((2, 3), 4);
    map.update((3, 4), 5);

    assert_eq!(
        structure(&map),
        vec![
            (0, 0, vec![2]),
            (1, 1, vec![3]),
            (2, 2, vec![4]),
            (3, 4, vec![5]),
        ]
    );
    assert_eq!(map.size(), 4);
}

#[test]
fn update_is_idempotent() {
    let mut map = DisjunctiveIntervalMap::new();
    assert!(map.update((0, 4), 1));
    assert!(!map.update((0, 4), 1));
    assert!(map.update((2, 3), 2));
    assert!(!map.update((2, 3), 2));
    assert_eq!(
        structure(&map),
        vec![(0, 1, vec![1]), (2, 3, vec![2]), (4, 4, vec![1])]
    );
}

#[test]
fn add_is_idempotent_after_splits() {
    let mut map = DisjunctiveIntervalMap::new();
    map.add((0, 4), 1);
    map.add((2, 6), 2);
    let before = map.clone();
    assert!(!map.add((2, 6), 2));
    assert_eq!(map, before);
}

#[test]
fn full_coverage_is_pointwise_coverage() {
    let mut map = DisjunctiveIntervalMap::new();
    map.add((0, 4), 1);
    map.add((6, 9), 2);
    map.add((5, 5), 3);
    assert!(map.overlaps_full((0, 9)));
    for point in 0..10i64 {
        assert!(map.overlaps((point, point)));
    }
}
