//! Flora PAC - proxy auto-config generation from classified IPv4 ranges.
//!
//! This crate classifies IPv4 ranges and domain names into routing
//! categories and renders a PAC script that picks a proxy directive per
//! connection.
//!
//! # Classifications
//!
//! - **LOCAL**: intranet space, always `DIRECT`
//! - **NORMAL**: in-country space from the registry feed, direct or via the
//!   internal proxy
//! - **GFWED**: blocked destinations, external proxy with direct fallback
//! - **POISONED**: addresses returned by poisoned DNS, external proxy only
//!
//! # Pipeline
//!
//! 1. A [`Feed`] streams registry rows (`apnic|CN|ipv4|...`) as `NORMAL`
//!    ranges.
//! 2. Configured local, normal and fake addresses are added.
//! 3. [`normalize`] resolves overlaps and merges neighbours into a
//!    [`Partition`].
//! 4. The partition, the domain map and the proxy table are rendered into
//!    the PAC template.
//!
//! ```ignore
//! use florapac::{PacConfig, PacGenerator, RegistryFeed};
//!
//! let config = PacConfig::default();
//! let feed = RegistryFeed::from_config(&config);
//! let generator = PacGenerator::new(config)?;
//! let path = generator.write(&feed)?;
//! println!("File generated: {}", path.display());
//! ```
//!
//! # Overlap resolution
//!
//! When one range is nested in another, the inner range keeps its own
//! classification and the remaining flanks keep the outer one. Ranges with
//! the same start are ordered so the longer one is outer. Equal touching
//! or overlapping neighbours are merged.

mod classification;
mod error;

pub mod addr;
pub mod config;
pub mod feed;
pub mod pac;
pub mod range;

// Re-export core types
pub use classification::Classification;
pub use error::{EntryError, Error, Result};

pub use config::{PacConfig, UserConfig};
pub use feed::{Feed, FeedRecord, FeedSink, FileFeed, RangeCollector, RecordGrammar, RegistryFeed, TextFeed};
pub use pac::{Classifier, DomainMap, PacGenerator, ProxyTable, Template};
pub use range::{normalize, IpEntry, NormalizeOptions, NormalizeReport, Partition, Range};
