use std::fmt;

use thiserror::Error;

/// Result type local to memgov-mem.
pub type Result<T> = std::result::Result<T, Error>;

/// Which ceiling rejected a request. Only used for diagnostics and violation
/// bookkeeping; callers handle both the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitOrigin {
    Local,
    Global,
}

impl fmt::Display for LimitOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitOrigin::Local => f.write_str("query"),
            LimitOrigin::Global => f.write_str("global"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("resource limit exceeded: query would use more memory than allowed ({origin} limit {limit} bytes, requested {requested}, in use {current})")]
    ResourceLimit {
        origin: LimitOrigin,
        requested: u64,
        limit: u64,
        current: u64,
    },

    #[error(transparent)]
    Core(#[from] memgov_core::Error),
}

impl Error {
    pub fn is_resource_limit(&self) -> bool {
        matches!(self, Error::ResourceLimit { .. })
    }

    pub fn origin(&self) -> Option<LimitOrigin> {
        match self {
            Error::ResourceLimit { origin, .. } => Some(*origin),
            _ => None,
        }
    }
}
