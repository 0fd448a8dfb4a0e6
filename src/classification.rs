//! Routing classifications for address ranges and domains.

use serde::{Serialize, Serializer};
use std::fmt;

/// Classification decides which proxy directive a connection gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum Classification {
    /// Unused placeholder, behaves as `Normal`
    Unknown = 0,
    /// Intranet, always direct
    Local = 1,
    /// In-country space, direct or internal proxy
    #[default]
    Normal = 2,
    /// Blocked, external proxy with direct fallback
    Gfwed = 3,
    /// DNS-poisoned, external proxy only
    Poisoned = 4,
}

impl Classification {
    /// Number of classifications, i.e. the proxy table length.
    pub const COUNT: usize = 5;

    /// Convert from a u8 value.
    ///
    /// Returns `None` for invalid values.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Classification::Unknown),
            1 => Some(Classification::Local),
            2 => Some(Classification::Normal),
            3 => Some(Classification::Gfwed),
            4 => Some(Classification::Poisoned),
            _ => None,
        }
    }

    /// Convert to a u8 value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// The classification used for merging and lookups.
    ///
    /// `Unknown` collapses to `Normal`.
    pub fn effective(self) -> Self {
        match self {
            Classification::Unknown => Classification::Normal,
            other => other,
        }
    }

    /// Whether this is the default classification once made effective.
    pub fn is_default(self) -> bool {
        self.effective() == Classification::Normal
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Unknown => "UNKNOWN",
            Classification::Local => "LOCAL",
            Classification::Normal => "NORMAL",
            Classification::Gfwed => "GFWED",
            Classification::Poisoned => "POISONED",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Classification {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "UNKNOWN" => Ok(Classification::Unknown),
            "LOCAL" => Ok(Classification::Local),
            "NORMAL" => Ok(Classification::Normal),
            "GFWED" | "WALLED" => Ok(Classification::Gfwed),
            "POISONED" | "FAKE" => Ok(Classification::Poisoned),
            _ => Err(()),
        }
    }
}

impl Serialize for Classification {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}
