//! Push rejection.

use thiserror::Error;

/// Returned when a push finds the ring full.
///
/// The rejected input comes back untouched: the value for `try_push`, the uncalled
/// constructor for `try_emplace`, and `()` for `try_push_cloned` (nothing was cloned).
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum PushError<T> {
    #[error("ring buffer is full")]
    Full(T),
}

impl<T> PushError<T> {
    /// Recover the rejected input.
    #[inline]
    pub fn into_inner(self) -> T {
        match self {
            PushError::Full(value) => value,
        }
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        matches!(self, PushError::Full(_))
    }
}
