use std::collections::TryReserveError;

use thiserror::Error;

/// Recoverable storage failures.
///
/// Contract violations (erasing an absent entity, sorting a storage with tombstones, ...) are never
/// reported through this type; they panic in debug builds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The allocator refused to grow a page table, a page or the packed array.
    #[error("storage allocation failed: {0}")]
    Alloc(#[from] TryReserveError),

    /// Every representable entity index is already assigned.
    #[error("entity identifiers exhausted")]
    Exhausted,
}

/// Unwrap the result of a fallible storage operation for its infallible counterpart.
///
/// Mirrors the standard collections, which panic on allocation failure unless the `try_` variant
/// is used.
#[inline]
#[track_caller]
pub(crate) fn infallible<T>(result: Result<T, Error>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{err}"),
    }
}
