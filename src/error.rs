//! Error types for florapac.

use thiserror::Error;

/// Error type for florapac operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Registry answered with a non-success status
    #[error("feed request failed with HTTP status {0}")]
    FeedStatus(u16),

    /// Transport-level failure while fetching the feed
    #[error("feed transport error: {0}")]
    FeedTransport(String),

    /// The feed reported an unsuccessful retrieval; nothing was generated
    #[error("feed retrieval failed, no output written")]
    FeedUnavailable,

    /// Template rendering error
    #[error("template error: {0}")]
    Template(String),
}

/// Result type alias for florapac operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error for a single explicit range entry.
///
/// These are reported and the entry is skipped; they never abort a run.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EntryError {
    /// Start address text did not parse
    #[error("malformed address: {0}")]
    MalformedAddress(String),

    /// Second element is neither an address nor a count
    #[error("malformed count or end address: {0}")]
    MalformedCount(String),

    /// Resolved start address is zero
    #[error("start address must be positive")]
    NonPositiveStart,

    /// Resolved count is zero or negative
    #[error("range count must be positive")]
    NonPositiveCount,

    /// Entry is neither an address string nor a two element pair
    #[error("unsupported entry: {0}")]
    UnsupportedShape(String),
}
