use crate::{
    CBox, SqliteError,
    extract::{extract_name, extract_value},
};
use libsqlite3_sys::*;
use parking_lot::{Mutex, MutexGuard};
use std::{
    ffi::{c_char, c_int, c_void},
    fmt::{self, Debug, Display},
};
use tabula_core::{Context, Error, Result, Row, RowNames, RowsAffected, Value, truncate_long};

/// A compiled statement.
///
/// SQLite allows only one cursor per statement, the statement is locked for as
/// long as a [`Rows`] returned by [`SqlitePrepared::query`] is alive. Dropping
/// the value finalizes the statement.
pub struct SqlitePrepared {
    statement: Mutex<CBox<*mut sqlite3_stmt>>,
    sql: Box<str>,
}

impl SqlitePrepared {
    pub(crate) fn new(statement: CBox<*mut sqlite3_stmt>, sql: &str) -> Self {
        Self {
            statement: Mutex::new(statement),
            sql: sql.into(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// True while a cursor over this statement is open.
    pub fn is_busy(&self) -> bool {
        self.statement.is_locked()
    }

    /// Binds `params` and returns the cursor over the result rows.
    ///
    /// Blocks while another cursor over the same statement is alive.
    pub fn query(&self, params: &[Value]) -> Result<Rows<'_>> {
        let guard = self.statement.lock();
        unsafe {
            sqlite3_reset(**guard);
            sqlite3_clear_bindings(**guard);
        }
        let rows = Rows {
            guard,
            sql: &self.sql,
            done: false,
        };
        bind_params(rows.statement(), &self.sql, params)?;
        Ok(rows)
    }

    /// Runs the statement to completion, discarding the rows.
    ///
    /// The connection is locked until the counters are read, the changes made
    /// by other threads are not reported.
    pub fn execute(&self, params: &[Value]) -> Result<RowsAffected> {
        let mut rows = self.query(params)?;
        let connection = unsafe { sqlite3_db_handle(rows.statement()) };
        let _lock = ConnectionLock::enter(connection);
        let before = unsafe { sqlite3_total_changes(connection) };
        while rows.next()?.is_some() {}
        let rows_affected = unsafe { sqlite3_total_changes(connection) }.saturating_sub(before);
        let rows_affected = rows_affected.max(0) as u64;
        Ok(RowsAffected {
            rows_affected,
            last_affected_id: if rows_affected > 0 {
                Some(unsafe { sqlite3_last_insert_rowid(connection) })
            } else {
                None
            },
        })
    }

    /// Names of the result columns.
    ///
    /// The statement is stepped once: after a schema change SQLite compiles it
    /// again, so the names are the ones of the live schema.
    pub fn columns(&self) -> Result<RowNames> {
        let mut rows = self.query(&[])?;
        rows.next()?;
        rows.labels()
    }
}

/// Holds the mutex of a serialized connection, it is recursive.
struct ConnectionLock(*mut sqlite3_mutex);

impl ConnectionLock {
    fn enter(connection: *mut sqlite3) -> Self {
        let mutex = unsafe { sqlite3_db_mutex(connection) };
        unsafe { sqlite3_mutex_enter(mutex) };
        Self(mutex)
    }
}

impl Drop for ConnectionLock {
    fn drop(&mut self) {
        unsafe { sqlite3_mutex_leave(self.0) };
    }
}

fn bind_params(statement: *mut sqlite3_stmt, sql: &str, params: &[Value]) -> Result<()> {
    let expected = unsafe { sqlite3_bind_parameter_count(statement) } as usize;
    if expected != params.len() {
        let error = Error::msg(format!(
            "The query expects {} parameters, {} were provided",
            expected,
            params.len()
        ))
        .context(format!(
            "While binding the parameters of the query:\n{}",
            truncate_long!(sql)
        ));
        log::error!("{:#}", error);
        return Err(error);
    }
    for (i, value) in params.iter().enumerate() {
        let index = i as c_int + 1;
        if let Err(error) = bind_value(statement, index, value) {
            let error = error.context(format!(
                "Cannot bind parameter {} to query:\n{}",
                index,
                truncate_long!(sql)
            ));
            log::error!("{:#}", error);
            return Err(error);
        }
    }
    Ok(())
}

fn length(len: usize) -> Result<c_int> {
    c_int::try_from(len).context("The parameter is too large to be bound")
}

fn bind_value(statement: *mut sqlite3_stmt, index: c_int, value: &Value) -> Result<()> {
    let rc = unsafe {
        match *value {
            Value::Boolean(Some(v)) => sqlite3_bind_int(statement, index, v as c_int),
            Value::Int8(Some(v)) => sqlite3_bind_int(statement, index, v as c_int),
            Value::Int16(Some(v)) => sqlite3_bind_int(statement, index, v as c_int),
            Value::Int32(Some(v)) => sqlite3_bind_int(statement, index, v as c_int),
            Value::Int64(Some(v)) => sqlite3_bind_int64(statement, index, v),
            Value::UInt8(Some(v)) => sqlite3_bind_int(statement, index, v as c_int),
            Value::UInt16(Some(v)) => sqlite3_bind_int(statement, index, v as c_int),
            Value::UInt32(Some(v)) => sqlite3_bind_int64(statement, index, v as sqlite3_int64),
            Value::UInt64(Some(v)) => {
                let Ok(v) = sqlite3_int64::try_from(v) else {
                    return Err(Error::msg(format!(
                        "Cannot bind the value {} into a sqlite integer because it's out of bounds",
                        v
                    )));
                };
                sqlite3_bind_int64(statement, index, v)
            }
            Value::Float32(Some(v)) => sqlite3_bind_double(statement, index, v as f64),
            Value::Float64(Some(v)) => sqlite3_bind_double(statement, index, v),
            Value::Varchar(Some(ref v)) => sqlite3_bind_text(
                statement,
                index,
                v.as_ptr() as *const c_char,
                length(v.len())?,
                SQLITE_TRANSIENT(),
            ),
            Value::Blob(Some(ref v)) => sqlite3_bind_blob(
                statement,
                index,
                v.as_ptr() as *const c_void,
                length(v.len())?,
                SQLITE_TRANSIENT(),
            ),
            // Every other variant is a NULL
            _ => sqlite3_bind_null(statement, index),
        }
    };
    if rc != SQLITE_OK {
        let connection = unsafe { sqlite3_db_handle(statement) };
        return Err(SqliteError::last(connection, rc).into());
    }
    Ok(())
}

impl Display for SqlitePrepared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", truncate_long!(self.sql))
    }
}

impl Debug for SqlitePrepared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlitePrepared")
            .field("sql", &self.sql)
            .field("busy", &self.is_busy())
            .finish()
    }
}

/// Cursor over the rows of a running statement.
///
/// Dropping it resets the statement, making it available again.
pub struct Rows<'s> {
    guard: MutexGuard<'s, CBox<*mut sqlite3_stmt>>,
    sql: &'s str,
    done: bool,
}

impl<'s> Rows<'s> {
    fn statement(&self) -> *mut sqlite3_stmt {
        **self.guard
    }

    /// Steps to the next row, `None` once the statement is done.
    pub fn next(&mut self) -> Result<Option<Row>> {
        if self.done {
            return Ok(None);
        }
        let statement = self.statement();
        match unsafe { sqlite3_step(statement) } {
            SQLITE_ROW => {
                let count = unsafe { sqlite3_data_count(statement) };
                let row = (0..count)
                    .map(|i| extract_value(statement, i))
                    .collect::<Result<Row>>()
                    .with_context(|| {
                        format!("While reading a row of the query:\n{}", truncate_long!(self.sql))
                    });
                if row.is_err() {
                    self.done = true;
                }
                row.map(Some)
            }
            SQLITE_DONE => {
                self.done = true;
                Ok(None)
            }
            rc => {
                self.done = true;
                let connection = unsafe { sqlite3_db_handle(statement) };
                let error = Error::new(SqliteError::last(connection, rc)).context(format!(
                    "While executing the query:\n{}",
                    truncate_long!(self.sql)
                ));
                log::error!("{:#}", error);
                Err(error)
            }
        }
    }

    /// Names of the result columns.
    pub fn labels(&self) -> Result<RowNames> {
        let statement = self.statement();
        let count = unsafe { sqlite3_column_count(statement) };
        (0..count).map(|i| extract_name(statement, i)).collect()
    }
}

impl Drop for Rows<'_> {
    fn drop(&mut self) {
        let statement = self.statement();
        unsafe {
            sqlite3_reset(statement);
            sqlite3_clear_bindings(statement);
        }
    }
}
