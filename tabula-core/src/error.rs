use crate::Error;

/// Conditions raised by the data layer itself, as opposed to the errors
/// surfaced by the engine which are propagated untouched.
///
/// They travel inside an [`Error`], use [`DbError::of`] (or
/// `downcast_ref::<DbError>()`) to recover them:
/// ```rust
/// use tabula_core::{DbError, Error};
/// let error = Error::from(DbError::NullResult);
/// assert_eq!(DbError::of(&error), Some(DbError::NullResult));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DbError {
    /// The database handle was never opened or it has been closed.
    #[error("database is not initialized")]
    NotInitialized,
    /// A lookup expected at least one row and found none.
    #[error("null result")]
    NullResult,
}

impl DbError {
    pub fn of(error: &Error) -> Option<DbError> {
        error.downcast_ref::<DbError>().copied()
    }
}
