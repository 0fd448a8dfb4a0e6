//! Classified IPv4 ranges and the canonical partition built from them.

mod normalize;
pub mod source;

pub use normalize::{normalize, NormalizeOptions, NormalizeReport};
pub use source::{IpEntry, RangeBound};

use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;

use crate::addr::describe_range;
use crate::Classification;

/// Size of the IPv4 address space.
pub(crate) const ADDRESS_SPACE: u64 = 1 << 32;

/// A block of consecutive addresses `[start, start + length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: u32,
    pub length: u32,
    pub classification: Classification,
}

impl Range {
    /// Create a range, clamping `length` to the end of the address space.
    pub fn new(start: u32, length: u32, classification: Classification) -> Self {
        let room = ADDRESS_SPACE - start as u64;
        Self {
            start,
            length: (length as u64).min(room) as u32,
            classification,
        }
    }

    /// Create a range with the default `Normal` classification.
    pub fn normal(start: u32, length: u32) -> Self {
        Self::new(start, length, Classification::Normal)
    }

    /// One past the last address covered.
    pub fn end(&self) -> u64 {
        self.start as u64 + self.length as u64
    }

    /// Whether `addr` falls inside this range.
    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.start && (addr as u64) < self.end()
    }

    /// Whether `next`, sorted at or after `self`, starts inside `self`.
    pub fn overlaps(&self, next: &Range) -> bool {
        (next.start as u64) < self.end()
    }

    /// Whether `next` starts exactly where `self` ends.
    pub fn touches(&self, next: &Range) -> bool {
        next.start as u64 == self.end()
    }

    /// Human readable `[first - last] : class` form used in diagnostics.
    pub fn describe(&self) -> String {
        format!(
            "{} : {}",
            describe_range(self.start, self.length),
            self.classification.effective().as_u8()
        )
    }
}

/// `[start, length]`, with the classification appended only when it is not
/// the default.
impl Serialize for Range {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let compact = self.classification.is_default();
        let mut seq = serializer.serialize_seq(Some(if compact { 2 } else { 3 }))?;
        seq.serialize_element(&self.start)?;
        seq.serialize_element(&self.length)?;
        if !compact {
            seq.serialize_element(&self.classification)?;
        }
        seq.end()
    }
}

/// Sorted, non-overlapping ranges with no mergeable neighbours.
///
/// Only [`normalize`] constructs one from arbitrary input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Partition(Vec<Range>);

impl Partition {
    pub(crate) fn from_sorted(ranges: Vec<Range>) -> Self {
        Self(ranges)
    }

    pub fn ranges(&self) -> &[Range] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Range> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<Range> {
        self.0
    }

    /// Find the effective classification of `addr`, if it is covered.
    pub fn lookup(&self, addr: u32) -> Option<Classification> {
        let idx = self.0.partition_point(|r| r.start <= addr);
        let candidate = self.0.get(idx.checked_sub(1)?)?;
        candidate
            .contains(addr)
            .then(|| candidate.classification.effective())
    }

    /// Total number of addresses covered.
    pub fn coverage(&self) -> u64 {
        self.0.iter().map(|r| r.length as u64).sum()
    }
}

impl<'a> IntoIterator for &'a Partition {
    type Item = &'a Range;
    type IntoIter = std::slice::Iter<'a, Range>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_clamps_to_address_space() {
        let r = Range::normal(u32::MAX - 1, 10);
        assert_eq!(r.length, 2);
        assert_eq!(r.end(), ADDRESS_SPACE);

        let whole = Range::normal(0, u32::MAX);
        assert_eq!(whole.length, u32::MAX);
    }

    #[test]
    fn test_overlap_and_touch() {
        let a = Range::normal(10, 5);
        assert!(a.overlaps(&Range::normal(14, 1)));
        assert!(!a.overlaps(&Range::normal(15, 1)));
        assert!(a.touches(&Range::normal(15, 1)));
        assert!(a.contains(10));
        assert!(a.contains(14));
        assert!(!a.contains(15));
    }

    #[test]
    fn test_range_serialization_omits_default() {
        let ranges = vec![
            Range::normal(10, 5),
            Range::new(20, 1, Classification::Poisoned),
            Range::new(30, 2, Classification::Unknown),
        ];
        let json = serde_json::to_string(&ranges).unwrap();
        assert_eq!(json, "[[10,5],[20,1,4],[30,2]]");
    }

    #[test]
    fn test_partition_lookup() {
        let partition = Partition::from_sorted(vec![
            Range::new(100, 20, Classification::Normal),
            Range::new(120, 5, Classification::Poisoned),
            Range::new(200, 10, Classification::Local),
        ]);
        assert_eq!(partition.lookup(99), None);
        assert_eq!(partition.lookup(100), Some(Classification::Normal));
        assert_eq!(partition.lookup(124), Some(Classification::Poisoned));
        assert_eq!(partition.lookup(125), None);
        assert_eq!(partition.lookup(205), Some(Classification::Local));
        assert_eq!(partition.coverage(), 35);
    }

    #[test]
    fn test_describe() {
        let r = Range::new(0x0A00_0000, 256, Classification::Local);
        assert_eq!(r.describe(), "[10.0.0.0 - 10.0.0.255] : 1");
    }
}
