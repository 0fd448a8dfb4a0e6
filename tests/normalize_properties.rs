//! Property tests for range normalization over a small address window.

use florapac::{normalize, Classification, NormalizeOptions, Partition, Range};
use proptest::prelude::*;

const WINDOW: usize = 2_400;

fn class_strategy() -> impl Strategy<Value = Classification> {
    (1u8..=4).prop_map(|v| Classification::from_u8(v).unwrap())
}

fn range_strategy() -> impl Strategy<Value = Range> {
    (0u32..2_000, 0u32..300, class_strategy()).prop_map(|(start, length, class)| {
        Range::new(start, length, class)
    })
}

/// Production defaults, including the input-sized pass cap.
fn options() -> NormalizeOptions {
    NormalizeOptions::default()
}

/// Classifications of the input ranges covering each address of the window.
fn coverage(ranges: &[Range]) -> Vec<Vec<Classification>> {
    let mut cover = vec![Vec::new(); WINDOW];
    for range in ranges {
        for addr in range.start as u64..range.end() {
            cover[addr as usize].push(range.classification.effective());
        }
    }
    cover
}

fn output_classes(partition: &Partition) -> Vec<Option<Classification>> {
    (0..WINDOW as u32).map(|addr| partition.lookup(addr)).collect()
}

proptest! {
    #[test]
    fn prop_output_is_sorted_and_disjoint(input in prop::collection::vec(range_strategy(), 0..40)) {
        let (partition, report) = normalize(input, &options());
        prop_assert!(!report.capped);
        for pair in partition.ranges().windows(2) {
            prop_assert!(pair[0].start < pair[1].start);
            prop_assert!(pair[0].end() <= pair[1].start as u64);
        }
        prop_assert!(partition.iter().all(|r| r.length > 0));
    }

    #[test]
    fn prop_no_mergeable_neighbours_survive(input in prop::collection::vec(range_strategy(), 0..40)) {
        let (partition, _) = normalize(input, &options());
        for pair in partition.ranges().windows(2) {
            let same = pair[0].classification.effective() == pair[1].classification.effective();
            prop_assert!(!(same && pair[0].touches(&pair[1])));
        }
    }

    #[test]
    fn prop_coverage_is_preserved(input in prop::collection::vec(range_strategy(), 0..40)) {
        let cover = coverage(&input);
        let (partition, report) = normalize(input, &options());
        prop_assert!(!report.capped);
        let out = output_classes(&partition);

        for (addr, classes) in cover.iter().enumerate() {
            match out[addr] {
                // Every output address takes the classification of some input covering it.
                Some(class) => prop_assert!(classes.contains(&class), "address {}", addr),
                None => prop_assert!(classes.is_empty(), "address {} lost", addr),
            }
        }
    }

    #[test]
    fn prop_normalize_is_idempotent(input in prop::collection::vec(range_strategy(), 0..40)) {
        let (first, _) = normalize(input, &options());
        let (second, report) = normalize(first.ranges().to_vec(), &options());
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(report.splits, 0);
    }

    #[test]
    fn prop_single_cover_keeps_its_classification(input in prop::collection::vec(range_strategy(), 0..40)) {
        let cover = coverage(&input);
        let (partition, _) = normalize(input, &options());
        for (addr, classes) in cover.iter().enumerate() {
            if classes.len() == 1 {
                prop_assert_eq!(partition.lookup(addr as u32), Some(classes[0]));
            }
        }
    }
}
