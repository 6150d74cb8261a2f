use libsqlite3_sys::{SQLITE_CONSTRAINT, sqlite3, sqlite3_errmsg, sqlite3_errstr};
use std::{
    ffi::{CStr, c_char, c_int},
    ptr,
};
use tabula_core::Error;

/// An error reported by the SQLite engine, carried verbatim.
///
/// Recover it from a [`tabula_core::Error`] with [`SqliteError::of`]:
/// ```rust,ignore
/// if SqliteError::of(&error).is_some_and(SqliteError::is_constraint_violation) { ... }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (sqlite error {code})")]
pub struct SqliteError {
    /// Extended result code.
    pub code: c_int,
    pub message: String,
}

impl SqliteError {
    /// Reads the last error message of `connection`, `code` is the result code of the failed call.
    pub(crate) fn last(connection: *mut sqlite3, code: c_int) -> Self {
        let message = unsafe {
            if connection.is_null() {
                message_from_ptr(sqlite3_errstr(code))
            } else {
                message_from_ptr(sqlite3_errmsg(connection))
            }
        };
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn primary_code(&self) -> c_int {
        self.code & 0xff
    }

    /// Uniqueness, primary key, foreign key, not null and check failures.
    pub fn is_constraint_violation(&self) -> bool {
        self.primary_code() == SQLITE_CONSTRAINT
    }

    pub fn of(error: &Error) -> Option<&SqliteError> {
        error.downcast_ref::<SqliteError>()
    }
}

fn message_from_ptr<'a>(ptr: *const c_char) -> &'a str {
    if ptr == ptr::null() {
        return "Unknown error (could not extract the error message)";
    }
    unsafe {
        CStr::from_ptr(ptr)
            .to_str()
            .unwrap_or("Unknown error (the error message was not a valid C string)")
    }
}
