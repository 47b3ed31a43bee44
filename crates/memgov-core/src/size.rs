//! Human-readable byte counts for limits and chunk sizes.
//!
//! A [`ByteSize`] of zero is meaningful: for limits it means "unlimited".
//!
//! # Parsing
//! Accepts a plain byte count or a number followed by a binary suffix:
//! - `"512M"` or `"512MB"` → 512 × 1024² bytes
//! - `"1G"` or `"1GB"` → 1 × 1024³ bytes
//! - `"32K"` or `"32KB"` → 32 × 1024 bytes
//! - `"100B"` or `"100"` → 100 bytes
//!
//! ```
//! use memgov_core::ByteSize;
//!
//! assert_eq!(ByteSize::parse("32K").unwrap().as_bytes(), 32 * 1024);
//! assert!(ByteSize::parse("0").unwrap().is_zero());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const KB: u64 = 1024;
const MB: u64 = 1024 * KB;
const GB: u64 = 1024 * MB;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ByteSize(u64);

impl ByteSize {
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    pub const fn from_kb(kb: u64) -> Self {
        Self(kb * KB)
    }

    pub const fn from_mb(mb: u64) -> Self {
        Self(mb * MB)
    }

    pub const fn from_gb(gb: u64) -> Self {
        Self(gb * GB)
    }

    pub const fn as_bytes(&self) -> u64 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parses a human-readable size string. Case-insensitive, surrounding
    /// whitespace is ignored.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::Config("empty size string".to_string()));
        }

        let upper = s.to_ascii_uppercase();
        let (num_str, multiplier) = if let Some(n) = upper.strip_suffix("GB") {
            (n, GB)
        } else if let Some(n) = upper.strip_suffix('G') {
            (n, GB)
        } else if let Some(n) = upper.strip_suffix("MB") {
            (n, MB)
        } else if let Some(n) = upper.strip_suffix('M') {
            (n, MB)
        } else if let Some(n) = upper.strip_suffix("KB") {
            (n, KB)
        } else if let Some(n) = upper.strip_suffix('K') {
            (n, KB)
        } else if let Some(n) = upper.strip_suffix('B') {
            (n, 1)
        } else {
            (upper.as_str(), 1)
        };

        let value: u64 = num_str.trim().parse().map_err(|_| {
            Error::Config(format!(
                "invalid size '{s}': expected a number with an optional K, M or G suffix"
            ))
        })?;

        value
            .checked_mul(multiplier)
            .map(Self)
            .ok_or_else(|| Error::Config(format!("size overflow: '{s}'")))
    }
}

impl From<u64> for ByteSize {
    fn from(bytes: u64) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        if b >= GB && b % GB == 0 {
            write!(f, "{} GB", b / GB)
        } else if b >= MB && b % MB == 0 {
            write!(f, "{} MB", b / MB)
        } else if b >= KB && b % KB == 0 {
            write!(f, "{} KB", b / KB)
        } else {
            write!(f, "{} B", b)
        }
    }
}
