//! Interval normalization: turns an arbitrary multiset of classified ranges
//! into a [`Partition`].
//!
//! The work list is sorted by start and scanned pairwise. Nested pairs are
//! split into prefix, inner and suffix so the inner range keeps its own
//! classification and the outer one keeps the flanks. Splitting can create
//! fragments that overlap other entries, so sort and scan repeat until a
//! scan changes nothing. Adjacent ranges with equal effective
//! classification are then coalesced in a single pass.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use super::{Partition, Range, ADDRESS_SPACE};

/// Options for a normalization run.
#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    /// Upper bound on sort+split passes; `None` picks one from the input size.
    pub max_passes: Option<usize>,
    /// Log every range of the resulting partition.
    pub dump: bool,
}

impl NormalizeOptions {
    fn pass_cap(&self, len: usize) -> usize {
        self.max_passes
            .unwrap_or_else(|| len.saturating_mul(4).max(64))
    }
}

/// Counters describing what a normalization run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub input: usize,
    pub dropped: usize,
    pub collapsed: usize,
    pub merge_hints: usize,
    pub splits: usize,
    pub trims: usize,
    pub passes: usize,
    pub capped: bool,
    pub output: usize,
}

/// Normalize `ranges` into a canonical partition.
pub fn normalize<I>(ranges: I, options: &NormalizeOptions) -> (Partition, NormalizeReport)
where
    I: IntoIterator<Item = Range>,
{
    let mut report = NormalizeReport::default();
    let mut work: Vec<Range> = Vec::new();

    for range in ranges {
        report.input += 1;
        if range.length == 0 {
            log::debug!("Dropping empty ip range at {}", crate::addr::int_to_ip4(range.start));
            report.dropped += 1;
            continue;
        }
        work.push(range);
    }

    sort_by_start(&mut work);
    check_neighbours(&work, &mut report);

    let cap = options.pass_cap(work.len());
    let mut stable = false;
    while report.passes < cap {
        report.passes += 1;
        let pass = split_pass(&work);
        if pass.splits > 0 {
            report.splits += pass.splits;
            work = pass.ranges;
            sort_by_start(&mut work);
        } else if pass.crossings > 0 {
            report.trims += trim_crossings(&mut work);
        } else {
            stable = true;
            break;
        }
    }

    if !stable {
        log::warn!(
            "Ip range splitting did not settle after {} passes, forcing disjoint ranges",
            report.passes
        );
        report.capped = true;
        report.trims += force_disjoint(&mut work);
    }

    let merged = merge_neighbours(work);
    report.output = merged.len();

    if options.dump {
        for range in &merged {
            log::info!("{} / count={}", range.describe(), range.length);
        }
    }

    (Partition::from_sorted(merged), report)
}

/// Stable sort by start address; equal starts keep insertion order.
fn sort_by_start(work: &mut [Range]) {
    work.sort_by_key(|r| r.start);
}

/// Advisory diagnostics on the sorted input, before any split.
fn check_neighbours(work: &[Range], report: &mut NormalizeReport) {
    for pair in work.windows(2) {
        let (item1, item2) = (&pair[0], &pair[1]);
        if item1.overlaps(item2) {
            report.collapsed += 1;
            log::warn!(
                "Collapsed ip: {}, {}",
                item1.describe(),
                item2.describe()
            );
        } else if item1.touches(item2)
            && item1.classification.effective() == item2.classification.effective()
        {
            report.merge_hints += 1;
            log::debug!(
                "ip can be merged: {}, {}",
                item1.describe(),
                item2.describe()
            );
        }
    }
}

/// Order an overlapping pair as `(outer, inner)`.
///
/// The pair arrives sorted by start. On equal starts the longer range is
/// the outer one; otherwise the earlier start is.
fn outer_inner(item1: Range, item2: Range) -> (Range, Range) {
    match (item1.start.cmp(&item2.start), item1.length < item2.length) {
        (Ordering::Equal, true) => (item2, item1),
        _ => (item1, item2),
    }
}

/// Pieces of an outer range around the inner range nested inside it.
struct Split {
    prefix: Option<Range>,
    inner: Range,
    suffix: Option<Range>,
}

impl Split {
    fn into_ranges(self) -> impl Iterator<Item = Range> {
        [self.prefix, Some(self.inner), self.suffix]
            .into_iter()
            .flatten()
    }
}

/// Split `outer` around `inner`, or `None` when `inner` is not nested in it.
///
/// The flanks take the outer classification, so a special classification
/// on the outer range survives on both sides of the inner one.
fn split_nested(outer: Range, inner: Range) -> Option<Split> {
    let prefix_len = inner.start as i64 - outer.start as i64;
    let suffix_len = outer.end() as i64 - inner.end() as i64;
    if prefix_len < 0 || suffix_len < 0 {
        return None;
    }

    let flank = |start: u64, len: i64| {
        (len > 0).then(|| Range::new(start as u32, len as u32, outer.classification))
    };
    Some(Split {
        prefix: flank(outer.start as u64, prefix_len),
        inner,
        // A positive suffix means inner.end() < outer.end() <= 2^32.
        suffix: flank(inner.end(), suffix_len),
    })
}

struct Pass {
    ranges: Vec<Range>,
    splits: usize,
    crossings: usize,
}

/// One scan over adjacent pairs of the sorted work list.
///
/// Split pairs are consumed together. A crossing pair passes its first
/// range through unchanged and the second is compared with its own
/// successor.
fn split_pass(work: &[Range]) -> Pass {
    let mut ranges = Vec::with_capacity(work.len() + 2);
    let mut splits = 0;
    let mut crossings = 0;

    let mut i = 0;
    while i < work.len() {
        let item1 = work[i];
        if let Some(&item2) = work.get(i + 1) {
            if item1.overlaps(&item2) {
                let (outer, inner) = outer_inner(item1, item2);
                if let Some(split) = split_nested(outer, inner) {
                    ranges.extend(split.into_ranges());
                    splits += 1;
                    i += 2;
                    continue;
                }
                crossings += 1;
            }
        }
        ranges.push(item1);
        i += 1;
    }

    Pass {
        ranges,
        splits,
        crossings,
    }
}

/// Resolve crossing neighbours left over at a split fixpoint: the earlier
/// range is cut at the start of the later one, which owns the overlap.
fn trim_crossings(work: &mut Vec<Range>) -> usize {
    let mut trims = 0;
    for i in 1..work.len() {
        let (item1, item2) = (work[i - 1], work[i]);
        let (outer, inner) = outer_inner(item1, item2);
        if !item1.overlaps(&item2) || split_nested(outer, inner).is_some() {
            continue;
        }
        log::warn!(
            "Overlapping ip ranges cross: {}, {}; trimming the first",
            item1.describe(),
            item2.describe()
        );
        work[i - 1].length = item2.start - item1.start;
        trims += 1;
    }
    work.retain(|r| r.length > 0);
    trims
}

/// Last resort once the pass cap is hit: sweep the elementary segments
/// between all boundaries and give each one to the covering range that
/// starts last, with the shorter range winning an equal start. Parts of a
/// range not covered by any later one keep its classification.
fn force_disjoint(work: &mut Vec<Range>) -> usize {
    sort_by_start(work);
    let trims = work.windows(2).filter(|p| p[0].overlaps(&p[1])).count();

    let mut bounds: Vec<u64> = work.iter().flat_map(|r| [r.start as u64, r.end()]).collect();
    bounds.sort_unstable();
    bounds.dedup();

    let mut active = BinaryHeap::new();
    let mut next = 0;
    let mut out: Vec<Range> = Vec::with_capacity(bounds.len());
    for seg in bounds.windows(2) {
        let (lo, hi) = (seg[0], seg[1]);
        while next < work.len() && work[next].start as u64 <= lo {
            let r = work[next];
            active.push((r.start, Reverse(r.length), next));
            next += 1;
        }
        while matches!(active.peek(), Some(&(_, _, i)) if work[i].end() <= lo) {
            active.pop();
        }
        if let Some(&(_, _, i)) = active.peek() {
            // A segment lies inside one range, so its length fits.
            out.push(Range::new(lo as u32, (hi - lo) as u32, work[i].classification));
        }
    }

    *work = out;
    trims
}

/// Coalesce runs of equal effective classification that touch or overlap.
fn merge_neighbours(work: Vec<Range>) -> Vec<Range> {
    let mut merged: Vec<Range> = Vec::with_capacity(work.len());
    for item in work {
        if let Some(last) = merged.last_mut() {
            if last.classification.effective() == item.classification.effective()
                && item.start as u64 <= last.end()
            {
                let end = last.end().max(item.end()).min(ADDRESS_SPACE);
                let length = end - last.start as u64;
                if length > u32::MAX as u64 {
                    log::warn!(
                        "Merged ip range from {} covers the whole address space, dropping {}",
                        crate::addr::int_to_ip4(last.start),
                        crate::addr::int_to_ip4(u32::MAX)
                    );
                }
                last.length = length.min(u32::MAX as u64) as u32;
                continue;
            }
        }
        merged.push(item);
    }
    merged
}
