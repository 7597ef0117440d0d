//! Error types for idlecache.
//!
//! Insertion, flush and existence checks cannot fail; only lookups and explicit
//! deletes report errors.

use thiserror::Error;

/// Result type alias using `CacheError`.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors returned by table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The key is absent and no loader is configured, or an explicit delete
    /// targeted an absent key.
    #[error("Key not found in cache")]
    KeyNotFound,

    /// The key is absent and the configured loader produced no value for it.
    #[error("Key not found and could not be loaded into cache")]
    KeyNotFoundOrNotLoadable,
}

impl CacheError {
    /// Returns true if this error describes a plain miss (the key is absent).
    ///
    /// Both variants are misses; the distinction is whether a loader was tried.
    pub fn is_miss(&self) -> bool {
        matches!(
            self,
            CacheError::KeyNotFound | CacheError::KeyNotFoundOrNotLoadable
        )
    }

    /// Returns true if a loader was consulted before failing.
    pub fn loader_attempted(&self) -> bool {
        matches!(self, CacheError::KeyNotFoundOrNotLoadable)
    }
}
