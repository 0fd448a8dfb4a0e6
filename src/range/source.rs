//! Explicit range entries from configuration.

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Range;
use crate::addr::ip4_to_int;
use crate::error::EntryError;
use crate::Classification;

/// One configured address entry.
///
/// Accepted forms:
/// - `"192.168.1.1"`: a single address
/// - `"10.0.0.0/8"`: a CIDR block
/// - `["10.0.0.0", "11.0.0.0"]`: start and exclusive end address
/// - `["10.0.0.0", 256]` or `["10.0.0.0", "256"]`: start and count
///
/// Anything else lands in `Invalid` so one bad entry never fails the whole
/// config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IpEntry {
    Single(String),
    Pair(String, RangeBound),
    Invalid(serde_json::Value),
}

/// Second element of a pair entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeBound {
    Count(i64),
    Text(String),
}

impl IpEntry {
    /// Shorthand for a start/end pair.
    pub fn pair(start: &str, end: &str) -> Self {
        IpEntry::Pair(start.to_string(), RangeBound::Text(end.to_string()))
    }

    /// Resolve this entry into a range tagged with `classification`.
    pub fn resolve(&self, classification: Classification) -> Result<Range, EntryError> {
        match self {
            IpEntry::Single(text) => resolve_single(text, classification),
            IpEntry::Pair(start, bound) => resolve_pair(start, bound, classification),
            IpEntry::Invalid(value) => Err(EntryError::UnsupportedShape(value.to_string())),
        }
    }
}

fn resolve_single(text: &str, classification: Classification) -> Result<Range, EntryError> {
    let text = text.trim();
    if let Some(value) = ip4_to_int(text) {
        return Ok(Range::new(value, 1, classification));
    }
    if text.contains('/') {
        let net: Ipv4Net = text
            .parse()
            .map_err(|_| EntryError::MalformedAddress(text.to_string()))?;
        let size = 1u64 << (32 - net.prefix_len() as u32);
        if size > u32::MAX as u64 {
            log::warn!("{} covers the whole address space, dropping 255.255.255.255", text);
        }
        return Ok(Range::new(
            u32::from(net.network()),
            size.min(u32::MAX as u64) as u32,
            classification,
        ));
    }
    Err(EntryError::MalformedAddress(text.to_string()))
}

fn resolve_pair(
    start: &str,
    bound: &RangeBound,
    classification: Classification,
) -> Result<Range, EntryError> {
    let start =
        ip4_to_int(start).ok_or_else(|| EntryError::MalformedAddress(start.trim().to_string()))?;

    let count = match bound {
        RangeBound::Count(n) => *n,
        RangeBound::Text(text) => match ip4_to_int(text) {
            Some(end) if end > start => (end - start) as i64,
            Some(_) => 0,
            None => text
                .trim()
                .parse::<i64>()
                .map_err(|_| EntryError::MalformedCount(text.trim().to_string()))?,
        },
    };

    if start == 0 {
        return Err(EntryError::NonPositiveStart);
    }
    if count <= 0 {
        return Err(EntryError::NonPositiveCount);
    }
    Ok(Range::new(
        start,
        count.min(u32::MAX as i64) as u32,
        classification,
    ))
}

/// Resolve every entry, logging and skipping the malformed ones.
pub fn collect_entries(
    entries: &[IpEntry],
    classification: Classification,
    key: &str,
) -> Vec<Range> {
    entries
        .iter()
        .filter_map(|entry| match entry.resolve(classification) {
            Ok(range) => Some(range),
            Err(e) => {
                log::warn!("Found invalid ip of '{}': {} ({})", key, entry, e);
                None
            }
        })
        .collect()
}

impl fmt::Display for IpEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpEntry::Single(text) => write!(f, "{:?}", text),
            IpEntry::Pair(start, RangeBound::Count(n)) => write!(f, "[{:?}, {}]", start, n),
            IpEntry::Pair(start, RangeBound::Text(t)) => write!(f, "[{:?}, {:?}]", start, t),
            IpEntry::Invalid(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for IpEntry {
    fn from(text: &str) -> Self {
        IpEntry::Single(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Classification::{Local, Normal, Poisoned};

    #[test]
    fn test_single_address() {
        let range = IpEntry::from("10.0.0.1").resolve(Poisoned).unwrap();
        assert_eq!(range, Range::new(0x0A00_0001, 1, Poisoned));
    }

    #[test]
    fn test_cidr_entry() {
        let range = IpEntry::from("192.168.0.0/16").resolve(Local).unwrap();
        assert_eq!(range, Range::new(0xC0A8_0000, 65536, Local));

        let host = IpEntry::from("8.8.8.8/32").resolve(Local).unwrap();
        assert_eq!(host.length, 1);

        assert!(IpEntry::from("10.0.0.0/40").resolve(Local).is_err());
    }

    #[test]
    fn test_whole_space_cidr_is_clamped() {
        let range = IpEntry::from("0.0.0.0/0").resolve(Normal).unwrap();
        assert_eq!(range, Range::new(0, u32::MAX, Normal));
    }

    #[test]
    fn test_pair_with_end_address() {
        let range = IpEntry::pair("10.0.0.0", "11.0.0.0").resolve(Local).unwrap();
        assert_eq!(range.start, 0x0A00_0000);
        assert_eq!(range.length, 1 << 24);
    }

    #[test]
    fn test_pair_with_count() {
        let numeric = IpEntry::Pair("1.2.3.0".into(), RangeBound::Count(256));
        assert_eq!(numeric.resolve(Normal).unwrap().length, 256);

        let text = IpEntry::pair("1.2.3.0", "5");
        assert_eq!(text.resolve(Normal).unwrap().length, 5);
    }

    #[test]
    fn test_pair_rejects_malformed_start() {
        let entry = IpEntry::pair("not-an-ip", "5");
        assert_eq!(
            entry.resolve(Normal),
            Err(EntryError::MalformedAddress("not-an-ip".into()))
        );
    }

    #[test]
    fn test_pair_rejects_non_positive() {
        assert_eq!(
            IpEntry::pair("0.0.0.0", "10").resolve(Normal),
            Err(EntryError::NonPositiveStart)
        );
        assert_eq!(
            IpEntry::pair("1.2.3.4", "0").resolve(Normal),
            Err(EntryError::NonPositiveCount)
        );
        assert_eq!(
            IpEntry::pair("1.2.3.4", "1.2.3.4").resolve(Normal),
            Err(EntryError::NonPositiveCount)
        );
        assert!(matches!(
            IpEntry::pair("1.2.3.4", "abc").resolve(Normal),
            Err(EntryError::MalformedCount(_))
        ));
        assert_eq!(
            IpEntry::Pair("1.2.3.4".into(), RangeBound::Count(-5)).resolve(Normal),
            Err(EntryError::NonPositiveCount)
        );
        assert_eq!(
            IpEntry::pair("1.2.3.4", "-5").resolve(Normal),
            Err(EntryError::NonPositiveCount)
        );
    }

    #[test]
    fn test_unsupported_shapes_deserialize_as_invalid() {
        let json = r#"[["5.6.7.0"], ["5.6.7.0", 2.5], 42, ["5.6.7.0", -5]]"#;
        let entries: Vec<IpEntry> = serde_json::from_str(json).unwrap();
        assert!(matches!(entries[0], IpEntry::Invalid(_)));
        assert!(matches!(entries[1], IpEntry::Invalid(_)));
        assert!(matches!(entries[2], IpEntry::Invalid(_)));
        assert_eq!(
            entries[3],
            IpEntry::Pair("5.6.7.0".into(), RangeBound::Count(-5))
        );
        assert!(matches!(
            entries[0].resolve(Normal),
            Err(EntryError::UnsupportedShape(_))
        ));
        assert!(collect_entries(&entries, Normal, "fakeIps").is_empty());
    }

    #[test]
    fn test_deserialize_entries() {
        let json = r#"["127.0.0.1", ["10.0.0.0", "11.0.0.0"], ["1.2.3.0", 16]]"#;
        let entries: Vec<IpEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries[0], IpEntry::from("127.0.0.1"));
        assert_eq!(entries[1], IpEntry::pair("10.0.0.0", "11.0.0.0"));
        assert_eq!(
            entries[2],
            IpEntry::Pair("1.2.3.0".into(), RangeBound::Count(16))
        );
    }

    #[test]
    fn test_collect_entries_skips_invalid() {
        let entries = vec![
            IpEntry::from("127.0.0.1"),
            IpEntry::pair("not-an-ip", "5"),
            IpEntry::from("garbage"),
        ];
        let ranges = collect_entries(&entries, Local, "localIps");
        assert_eq!(ranges, vec![Range::new(0x7F00_0001, 1, Local)]);
    }
}
