//! Bulk registry feed: sources, record extraction and the sink interface.
//!
//! A [`Feed`] only has to open a byte stream. The provided
//! [`Feed::fetch`] handles gzip detection, chunked line splitting and
//! record matching, and guarantees the sink's terminal callback runs
//! exactly once.

mod grammar;
mod registry;

pub use grammar::{LineSplitter, RecordGrammar};
pub use registry::{is_fresh, RegistryFeed};

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use crate::addr::ip4_to_int;
use crate::error::EntryError;
use crate::range::Range;
use crate::{Classification, Result};

const CHUNK_SIZE: usize = 64 * 1024;

/// One matched feed row, borrowed from the current line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedRecord<'a> {
    pub address: &'a str,
    pub count: &'a str,
    pub date: &'a str,
}

impl FeedRecord<'_> {
    /// Convert to a range. Feed ranges are always `Normal`.
    pub fn to_range(&self) -> std::result::Result<Range, EntryError> {
        let start = ip4_to_int(self.address)
            .ok_or_else(|| EntryError::MalformedAddress(self.address.to_string()))?;
        let count: u64 = self
            .count
            .parse()
            .map_err(|_| EntryError::MalformedCount(self.count.to_string()))?;
        if count == 0 {
            return Err(EntryError::NonPositiveCount);
        }
        Ok(Range::new(
            start,
            count.min(u32::MAX as u64) as u32,
            Classification::Normal,
        ))
    }
}

/// Receiver for feed records.
pub trait FeedSink {
    /// Called once per matched record, in file order.
    fn on_record(&mut self, record: &FeedRecord<'_>);

    /// Called exactly once when retrieval finishes.
    fn on_end(&mut self, ok: bool);
}

/// A source of registry text.
pub trait Feed {
    /// Short description for log messages.
    fn describe(&self) -> String;

    /// Open the raw (possibly gzip compressed) byte stream.
    fn open(&self) -> Result<Box<dyn Read + '_>>;

    /// Stream all matching records into `sink`.
    ///
    /// Any failure is reported through `on_end(false)` and returned.
    fn fetch(&self, grammar: &RecordGrammar, sink: &mut dyn FeedSink) -> Result<usize> {
        let outcome = self
            .open()
            .and_then(|reader| stream_records(reader, grammar, sink));
        match &outcome {
            Ok(count) => log::info!("Read {} records from {}", count, self.describe()),
            Err(e) => log::warn!("Fetching {} failed: {}", self.describe(), e),
        }
        sink.on_end(outcome.is_ok());
        outcome
    }
}

/// Read `reader` to the end, decompressing gzip input, and forward every
/// matching line to `sink`. Does not call `on_end`.
pub fn stream_records<R: Read>(
    reader: R,
    grammar: &RecordGrammar,
    sink: &mut dyn FeedSink,
) -> Result<usize> {
    let mut buffered = BufReader::new(reader);
    let head = buffered.fill_buf()?;
    let gzip = head.len() >= 2 && head[0] == 0x1f && head[1] == 0x8b;

    if gzip {
        pump(GzDecoder::new(buffered), grammar, sink)
    } else {
        pump(buffered, grammar, sink)
    }
}

fn pump<R: Read>(mut source: R, grammar: &RecordGrammar, sink: &mut dyn FeedSink) -> Result<usize> {
    let mut splitter = LineSplitter::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut matched = 0;

    let mut on_line = |line: &str| {
        if let Some(record) = grammar.parse(line) {
            matched += 1;
            sink.on_record(&record);
        }
    };

    loop {
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        splitter.push(&buf[..n], &mut on_line);
    }
    splitter.finish(&mut on_line);

    Ok(matched)
}

/// Feed backed by in-memory text.
#[derive(Debug, Clone)]
pub struct TextFeed {
    text: String,
}

impl TextFeed {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Feed for TextFeed {
    fn describe(&self) -> String {
        format!("inline feed ({} bytes)", self.text.len())
    }

    fn open(&self) -> Result<Box<dyn Read + '_>> {
        Ok(Box::new(Cursor::new(self.text.as_bytes())))
    }
}

/// Feed backed by a local registry file.
#[derive(Debug, Clone)]
pub struct FileFeed {
    path: PathBuf,
}

impl FileFeed {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Feed for FileFeed {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    fn open(&self) -> Result<Box<dyn Read + '_>> {
        Ok(Box::new(File::open(&self.path)?))
    }
}

/// Sink that turns records into `Normal` ranges.
#[derive(Debug, Default)]
pub struct RangeCollector {
    ranges: Vec<Range>,
    rejected: usize,
    outcome: Option<bool>,
    trace: bool,
}

impl RangeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log every accepted record at debug level.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// `Some(ok)` once the feed has finished.
    pub fn outcome(&self) -> Option<bool> {
        self.outcome
    }

    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn into_ranges(self) -> Vec<Range> {
        self.ranges
    }
}

impl FeedSink for RangeCollector {
    fn on_record(&mut self, record: &FeedRecord<'_>) {
        match record.to_range() {
            Ok(range) => {
                if self.trace {
                    log::debug!("Found feed ip: {} at {}", range.describe(), record.date);
                }
                self.ranges.push(range);
            }
            Err(e) => {
                log::warn!(
                    "Skipping feed record {}|{}: {}",
                    record.address,
                    record.count,
                    e
                );
                self.rejected += 1;
            }
        }
    }

    fn on_end(&mut self, ok: bool) {
        debug_assert!(self.outcome.is_none(), "feed finished twice");
        self.outcome = Some(ok);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const SAMPLE: &str = "\
2|apnic|20240101|5|19830613|20231231|+1000
apnic|*|ipv4|*|3|summary
apnic|CN|ipv4|1.0.1.0|256|20110414|allocated
apnic|JP|ipv4|1.0.16.0|4096|20110412|allocated
apnic|CN|ipv4|1.0.2.0|512|20110414|allocated
apnic|CN|ipv6|2001:250::|35|20000426|allocated
apnic|CN|ipv4|1.0.8.0|2048|20110412|assigned";

    fn grammar() -> RecordGrammar {
        RecordGrammar::new("apnic", "CN").unwrap()
    }

    struct BrokenFeed;

    impl Feed for BrokenFeed {
        fn describe(&self) -> String {
            "broken".to_string()
        }

        fn open(&self) -> Result<Box<dyn Read + '_>> {
            Err(crate::Error::FeedStatus(503))
        }
    }

    #[test]
    fn test_text_feed_collects_records_in_order() {
        let mut sink = RangeCollector::new();
        let count = TextFeed::new(SAMPLE).fetch(&grammar(), &mut sink).unwrap();

        assert_eq!(count, 3);
        assert_eq!(sink.outcome(), Some(true));
        let starts: Vec<u32> = sink.ranges().iter().map(|r| r.start).collect();
        assert_eq!(starts, vec![0x0100_0100, 0x0100_0200, 0x0100_0800]);
        assert!(sink
            .ranges()
            .iter()
            .all(|r| r.classification == Classification::Normal));
    }

    #[test]
    fn test_last_line_without_newline_is_read() {
        let mut sink = RangeCollector::new();
        TextFeed::new("apnic|CN|ipv4|1.0.1.0|256|20110414|allocated")
            .fetch(&grammar(), &mut sink)
            .unwrap();
        assert_eq!(sink.ranges().len(), 1);
    }

    #[test]
    fn test_gzip_input_is_decompressed() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(SAMPLE.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("delegated.gz");
        std::fs::write(&path, compressed).unwrap();

        let mut sink = RangeCollector::new();
        let count = FileFeed::new(&path).fetch(&grammar(), &mut sink).unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_failed_open_reports_not_ok() {
        let mut sink = RangeCollector::new();
        let result = BrokenFeed.fetch(&grammar(), &mut sink);
        assert!(matches!(result, Err(crate::Error::FeedStatus(503))));
        assert_eq!(sink.outcome(), Some(false));
        assert!(sink.ranges().is_empty());
    }

    #[test]
    fn test_missing_file_reports_not_ok() {
        let mut sink = RangeCollector::new();
        let result = FileFeed::new("/nonexistent/delegated").fetch(&grammar(), &mut sink);
        assert!(result.is_err());
        assert_eq!(sink.outcome(), Some(false));
    }

    #[test]
    fn test_record_to_range() {
        let record = FeedRecord {
            address: "1.0.1.0",
            count: "256",
            date: "20110414",
        };
        assert_eq!(record.to_range().unwrap(), Range::normal(0x0100_0100, 256));

        let zero = FeedRecord {
            count: "0",
            ..record
        };
        assert_eq!(zero.to_range(), Err(EntryError::NonPositiveCount));

        let bad = FeedRecord {
            address: "1.0.1",
            ..record
        };
        assert!(matches!(bad.to_range(), Err(EntryError::MalformedAddress(_))));
    }

    #[test]
    fn test_collector_counts_rejected() {
        let mut sink = RangeCollector::new();
        // Matches the grammar but the address is not a valid dotted quad.
        TextFeed::new("apnic|CN|ipv4|1.0.1.999|256|20110414|allocated\n")
            .fetch(&grammar(), &mut sink)
            .unwrap();
        assert_eq!(sink.rejected(), 1);
        assert!(sink.ranges().is_empty());
    }
}
