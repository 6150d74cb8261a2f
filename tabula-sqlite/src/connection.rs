use crate::{CBox, SqliteError, SqlitePrepared};
use libsqlite3_sys::{
    SQLITE_OK, SQLITE_OPEN_CREATE, SQLITE_OPEN_FULLMUTEX, SQLITE_OPEN_READWRITE, SQLITE_OPEN_URI,
    sqlite3, sqlite3_close, sqlite3_extended_result_codes, sqlite3_finalize,
    sqlite3_open_v2, sqlite3_prepare_v2, sqlite3_stmt,
};
use std::{
    ffi::{CStr, CString, c_char, c_int},
    ptr,
};
use tabula_core::{Context, Error, Result, truncate_long};

/// One connection to a SQLite database.
///
/// Opened in serialized mode: the connection can be shared between threads,
/// the engine serializes the calls on it.
pub struct SqliteConnection {
    connection: CBox<*mut sqlite3>,
}

impl SqliteConnection {
    const FLAGS: c_int =
        SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE | SQLITE_OPEN_FULLMUTEX | SQLITE_OPEN_URI;

    /// Opens (creating it if missing) the database at `path`.
    ///
    /// Accepts a file path, `:memory:` or a `file:` URI.
    pub fn open(path: &str) -> Result<Self> {
        let c_path = CString::new(path)
            .with_context(|| format!("The database path `{}` contains a NUL byte", path))?;
        let mut connection = CBox::new(ptr::null_mut(), |p: *mut sqlite3| unsafe {
            sqlite3_close(p);
        });
        let rc = unsafe {
            sqlite3_open_v2(
                c_path.as_ptr(),
                &mut *connection,
                Self::FLAGS,
                ptr::null(),
            )
        };
        if rc != SQLITE_OK {
            let error = Error::new(SqliteError::last(*connection, rc))
                .context(format!("Could not open the database `{}`", path));
            log::error!("{:#}", error);
            return Err(error);
        }
        unsafe {
            sqlite3_extended_result_codes(*connection, 1);
        }
        Ok(Self { connection })
    }

    /// Compiles exactly one SQL statement.
    pub fn prepare(&self, query: &str) -> Result<SqlitePrepared> {
        let context = || format!("While preparing the query:\n{}", truncate_long!(query));
        let sql = match CString::new(query) {
            Ok(sql) => sql,
            Err(e) => {
                let error = Error::new(e)
                    .context("Could not create a CString from the query String")
                    .context(context());
                log::error!("{:#}", error);
                return Err(error);
            }
        };
        let mut statement = CBox::new(ptr::null_mut(), |p: *mut sqlite3_stmt| unsafe {
            sqlite3_finalize(p);
        });
        let mut tail: *const c_char = ptr::null();
        let rc = unsafe {
            sqlite3_prepare_v2(
                *self.connection,
                sql.as_ptr(),
                sql.as_bytes_with_nul().len() as c_int,
                &mut *statement,
                &mut tail,
            )
        };
        if rc != SQLITE_OK {
            let error = Error::new(SqliteError::last(*self.connection, rc)).context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        if statement.is_null() {
            let error = Error::msg("The query does not contain any statement").context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        let remaining = if tail.is_null() {
            &[][..]
        } else {
            unsafe { CStr::from_ptr(tail) }.to_bytes()
        };
        if !remaining
            .iter()
            .all(|c| c.is_ascii_whitespace() || *c == b';')
        {
            let error =
                Error::msg("Cannot prepare more than one statement at a time").context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        Ok(SqlitePrepared::new(statement, query))
    }

    /// Closes the connection, every statement prepared on it must be dropped first.
    pub fn close(mut self) -> Result<()> {
        let connection = self.connection.take();
        let rc = unsafe { sqlite3_close(connection) };
        if rc != SQLITE_OK {
            let error = Error::new(SqliteError::last(connection, rc))
                .context("Could not close the database connection");
            log::error!("{:#}", error);
            // Still open, the drop tries again
            *self.connection = connection;
            return Err(error);
        }
        Ok(())
    }
}
