//! Record grammar for delegated registry statistics and chunk-to-line
//! splitting.
//!
//! Matched rows look like:
//!
//! ```text
//! apnic|CN|ipv4|111.119.64.0|16384|20090703|allocated
//! ```

use regex::Regex;

use super::FeedRecord;
use crate::{Error, Result};

/// Line matcher for one registry and country.
#[derive(Debug, Clone)]
pub struct RecordGrammar {
    pattern: Regex,
}

impl RecordGrammar {
    /// Build a case-insensitive grammar for `registry` rows of `country`.
    pub fn new(registry: &str, country: &str) -> Result<Self> {
        let source = format!(
            r"(?i)^{}\|{}\|ipv4\|([0-9.]+)\|([0-9]+)\|([0-9]+)\|a.*$",
            regex::escape(registry),
            regex::escape(country)
        );
        let pattern = Regex::new(&source).map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self { pattern })
    }

    /// Extract a record from one line, ignoring a trailing `\r`.
    pub fn parse<'a>(&self, line: &'a str) -> Option<FeedRecord<'a>> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let caps = self.pattern.captures(line)?;
        Some(FeedRecord {
            address: caps.get(1)?.as_str(),
            count: caps.get(2)?.as_str(),
            date: caps.get(3)?.as_str(),
        })
    }
}

/// Splits a stream of byte chunks into complete lines.
///
/// The text after the last newline of a chunk is held back and prefixed to
/// the next one.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, calling `on_line` for every line it completes.
    pub fn push<F: FnMut(&str)>(&mut self, chunk: &[u8], mut on_line: F) {
        let Some(last_lf) = chunk.iter().rposition(|&b| b == b'\n') else {
            self.pending.extend_from_slice(chunk);
            return;
        };

        self.pending.extend_from_slice(&chunk[..last_lf]);
        let complete = std::mem::take(&mut self.pending);
        for line in complete.split(|&b| b == b'\n') {
            on_line(String::from_utf8_lossy(line).as_ref());
        }
        self.pending.extend_from_slice(&chunk[last_lf + 1..]);
    }

    /// Flush the held-back tail as a final line.
    pub fn finish<F: FnMut(&str)>(&mut self, on_line: F) {
        self.push(b"\n", on_line);
    }
}
