//! Capability tag describing how a backend client reaches its service.

/// Declared at store construction; replaces any runtime inspection of the
/// client's concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendRole {
    /// The client talks to the data service directly.
    Direct,
    /// The client is a caching front-end proxy. On sustained failure the
    /// store may substitute a direct backend for the whole operation.
    CacheProxy,
}

impl BackendRole {
    /// Whether a failed operation may be re-run against a direct fallback.
    pub fn allows_substitution(&self) -> bool {
        matches!(self, BackendRole::CacheProxy)
    }
}
