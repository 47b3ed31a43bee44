//! Memory-governance configuration that embedders can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::size::ByteSize;

/// Default granularity at which per-query usage is folded into the global counter.
pub const DEFAULT_CHUNK_SIZE: u64 = 32 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Process-wide ceiling across all queries. Zero means unlimited.
    pub global_limit: ByteSize,

    /// Ceiling applied to each query's local tracker. Zero means only the
    /// global ceiling applies.
    pub query_limit: ByteSize,

    /// Chunking granularity for global updates. Must be non-zero.
    pub chunk_size: ByteSize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            global_limit: ByteSize::from_bytes(0),
            query_limit: ByteSize::from_bytes(0),
            chunk_size: ByteSize::from_bytes(DEFAULT_CHUNK_SIZE),
        }
    }
}

impl MemoryConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables (values accept `K`/`M`/`G` suffixes):
    /// - `MEMGOV_GLOBAL_LIMIT`: process-wide ceiling
    /// - `MEMGOV_QUERY_LIMIT`: per-query ceiling
    /// - `MEMGOV_CHUNK_SIZE`: global update granularity
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`MemoryConfig::from_env`] but reads values through `lookup`.
    /// Unparsable values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = lookup("MEMGOV_GLOBAL_LIMIT").and_then(|s| ByteSize::parse(&s).ok()) {
            cfg.global_limit = v;
        }

        if let Some(v) = lookup("MEMGOV_QUERY_LIMIT").and_then(|s| ByteSize::parse(&s).ok()) {
            cfg.query_limit = v;
        }

        if let Some(v) = lookup("MEMGOV_CHUNK_SIZE").and_then(|s| ByteSize::parse(&s).ok()) {
            if !v.is_zero() {
                cfg.chunk_size = v;
            }
        }

        cfg
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size.is_zero() {
            return Err(Error::Config("chunk_size must be non-zero".to_string()));
        }
        Ok(())
    }
}
