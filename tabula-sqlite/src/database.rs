use crate::{SqliteConnection, SqlitePrepared, SqliteSqlWriter};
use parking_lot::RwLock;
use std::{sync::Arc, time::Duration};
use tabula_core::{
    AsValue, CacheStatsSnapshot, Context, DbError, Error, PreparedCache, Record, Result,
    RowsAffected, SqlWriter, Sweeper, Value, truncate_long,
};

/// A SQLite database file together with its statement cache.
///
/// Created closed with [`SqliteDatabase::new`], [`SqliteDatabase::open`] connects
/// and starts the cache, [`SqliteDatabase::close`] releases everything. Every
/// operation on a closed database fails with [`DbError::NotInitialized`].
///
/// The value can be shared between threads. Statements are cached by their
/// literal text: conditions are written with `?` placeholders and the values
/// passed as parameters, so the same statement is reused across calls.
///
/// ```rust,ignore
/// let db = SqliteDatabase::new("app.db");
/// db.open(Duration::from_secs(60))?;
/// db.create::<User>("users", &[])?;
/// db.insert("users", &user)?;
/// let user: User = db.find_as("users", "WHERE id = ?", &params![1])?;
/// ```
pub struct SqliteDatabase {
    path: String,
    state: RwLock<Option<Inner>>,
}

// Fields drop in declaration order: sweeper, cache, connection
struct Inner {
    sweeper: Sweeper,
    cache: Arc<PreparedCache<SqlitePrepared>>,
    connection: SqliteConnection,
}

impl Inner {
    /// The compiled statement for `query`, from the cache when possible.
    ///
    /// When the cached statement has an open cursor (a callback issuing the
    /// same query) a transient statement is compiled instead.
    fn statement(&self, query: &str) -> Result<Arc<SqlitePrepared>> {
        let prepared = match self.cache.get(query) {
            Some(prepared) => prepared,
            None => {
                let prepared = self.connection.prepare(query)?;
                log::debug!("Compiled the statement:\n{}", truncate_long!(query));
                self.cache.set(query, prepared)
            }
        };
        if prepared.is_busy() {
            log::debug!(
                "The statement is busy, compiling a transient one:\n{}",
                truncate_long!(query)
            );
            return Ok(Arc::new(self.connection.prepare(query)?));
        }
        Ok(prepared)
    }

    fn close(self) -> Result<()> {
        let Inner {
            sweeper,
            cache,
            connection,
        } = self;
        sweeper.stop();
        cache.destroy();
        drop(cache);
        connection.close()
    }
}

impl SqliteDatabase {
    /// `path` is anything SQLite accepts: a file path, `:memory:` or a `file:` URI.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            state: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.state.read_recursive().is_some()
    }

    /// Connects and starts the statement cache, statements idle for `ttl` are finalized.
    ///
    /// Does nothing if the database is already open.
    pub fn open(&self, ttl: Duration) -> Result<()> {
        let mut state = self.state.write();
        if state.is_some() {
            return Ok(());
        }
        let connection = SqliteConnection::open(&self.path)?;
        let cache = Arc::new(PreparedCache::new(ttl).on_evict(|query, _| {
            log::debug!("Finalizing the statement:\n{}", truncate_long!(query));
        }));
        let sweeper = cache.spawn_sweeper(cache.sweep_interval())?;
        *state = Some(Inner {
            sweeper,
            cache,
            connection,
        });
        log::info!("Opened the database `{}`", self.path);
        Ok(())
    }

    /// Finalizes every cached statement and closes the connection.
    ///
    /// Waits for the running operations. Does nothing if the database is not
    /// open. Must not be called from a callback of this database.
    pub fn close(&self) -> Result<()> {
        let Some(inner) = self.state.write().take() else {
            return Ok(());
        };
        inner
            .close()
            .with_context(|| format!("While closing the database `{}`", self.path))?;
        log::info!("Closed the database `{}`", self.path);
        Ok(())
    }

    /// Number of statements currently cached.
    pub fn cached_statements(&self) -> Result<usize> {
        self.with_inner(|inner| Ok(inner.cache.len()))
    }

    /// The cache counters, `inserts` is the number of statements compiled and kept.
    pub fn cache_stats(&self) -> Result<CacheStatsSnapshot> {
        self.with_inner(|inner| Ok(inner.cache.stats().snapshot()))
    }

    fn with_inner<T>(&self, f: impl FnOnce(&Inner) -> Result<T>) -> Result<T> {
        // Recursive, callbacks run while the lock is held
        let state = self.state.read_recursive();
        let Some(inner) = state.as_ref() else {
            return Err(DbError::NotInitialized.into());
        };
        f(inner)
    }

    /// Runs one statement with `params`, discarding the rows.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<RowsAffected> {
        self.with_inner(|inner| inner.statement(sql)?.execute(params))
    }

    /// Creates `table` from the fields of `R`, if it does not exist.
    ///
    /// `additional` clauses (like `FOREIGN KEY(...) REFERENCES ...`) follow the columns.
    pub fn create<R: Record>(&self, table: &str, additional: &[&str]) -> Result<()> {
        let mut sql = String::with_capacity(128);
        SqliteSqlWriter.write_create_table(&mut sql, table, R::fields(), additional);
        self.execute(&sql, &[]).map(|_| ())
    }

    /// Inserts `record`, replacing the row with the same primary key.
    pub fn insert<R: Record>(&self, table: &str, record: &R) -> Result<RowsAffected> {
        self.insert_record(table, record, true)
    }

    /// Inserts `record`, fails with a constraint violation if the primary key
    /// or a unique column already exists.
    pub fn insert_unique<R: Record>(&self, table: &str, record: &R) -> Result<RowsAffected> {
        self.insert_record(table, record, false)
    }

    fn insert_record<R: Record>(
        &self,
        table: &str,
        record: &R,
        replace: bool,
    ) -> Result<RowsAffected> {
        self.with_inner(|inner| {
            // The live columns of the table, not the ones declared by the record
            let mut probe = String::with_capacity(64);
            SqliteSqlWriter.write_probe(&mut probe, table);
            let columns = inner.statement(&probe)?.columns()?;
            let values = record.values();
            if columns.len() != values.len() {
                let error = Error::msg(format!(
                    "Table `{}` has {} columns while the record provides {} values",
                    table,
                    columns.len(),
                    values.len()
                ));
                log::error!("{:#}", error);
                return Err(error);
            }
            let mut sql = String::with_capacity(128);
            SqliteSqlWriter.write_insert(&mut sql, table, &columns, replace);
            inner.statement(&sql)?.execute(&values)
        })
    }

    /// Scans every row of `sql` into `record` calling `f` after each one,
    /// returns the number of rows.
    fn scan_each<R: Record>(
        &self,
        sql: &str,
        params: &[Value],
        record: &mut R,
        mut f: impl FnMut(&mut R) -> Result<()>,
    ) -> Result<usize> {
        self.with_inner(|inner| {
            let statement = inner.statement(sql)?;
            let mut rows = statement.query(params)?;
            let mut count = 0;
            while let Some(row) = rows.next()? {
                record.scan(row).with_context(|| {
                    format!("While scanning the result of:\n{}", truncate_long!(sql))
                })?;
                count += 1;
                f(record)?;
            }
            Ok(count)
        })
    }

    fn scan_all<T: Record + Default>(&self, sql: &str, params: &[Value]) -> Result<Vec<T>> {
        self.with_inner(|inner| {
            let statement = inner.statement(sql)?;
            let mut rows = statement.query(params)?;
            let mut result = Vec::new();
            while let Some(row) = rows.next()? {
                let mut record = T::default();
                record.scan(row).with_context(|| {
                    format!("While scanning the result of:\n{}", truncate_long!(sql))
                })?;
                result.push(record);
            }
            if result.is_empty() {
                return Err(DbError::NullResult.into());
            }
            Ok(result)
        })
    }

    fn select(table: &str, condition: &str) -> String {
        let mut sql = String::with_capacity(64 + condition.len());
        SqliteSqlWriter.write_select(&mut sql, table, condition);
        sql
    }

    /// Scans the rows of `table` matching `condition` into `record`.
    ///
    /// All the matching rows are scanned and the last one wins: use an `ORDER BY`
    /// in the condition to choose it. Fails with [`DbError::NullResult`] when
    /// nothing matches.
    pub fn find<R: Record>(
        &self,
        table: &str,
        record: &mut R,
        condition: &str,
        params: &[Value],
    ) -> Result<()> {
        self.query(&Self::select(table, condition), record, params)
    }

    /// Like [`SqliteDatabase::find`], returning a new record.
    pub fn find_as<T: Record + Default>(
        &self,
        table: &str,
        condition: &str,
        params: &[Value],
    ) -> Result<T> {
        self.query_as(&Self::select(table, condition), params)
    }

    /// Calls `f` after scanning each matching row into `record`.
    pub fn find_for<R: Record>(
        &self,
        table: &str,
        record: &mut R,
        condition: &str,
        params: &[Value],
        f: impl FnMut(&mut R) -> Result<()>,
    ) -> Result<()> {
        self.query_for(&Self::select(table, condition), record, params, f)
    }

    /// Every matching row, in order. Fails with [`DbError::NullResult`] when nothing matches.
    pub fn find_all<T: Record + Default>(
        &self,
        table: &str,
        condition: &str,
        params: &[Value],
    ) -> Result<Vec<T>> {
        self.scan_all(&Self::select(table, condition), params)
    }

    /// Runs the query `sql` and scans its rows into `record`, the last row wins.
    pub fn query<R: Record>(&self, sql: &str, record: &mut R, params: &[Value]) -> Result<()> {
        self.query_for(sql, record, params, |_| Ok(()))
    }

    pub fn query_as<T: Record + Default>(&self, sql: &str, params: &[Value]) -> Result<T> {
        let mut record = T::default();
        self.query(sql, &mut record, params)?;
        Ok(record)
    }

    pub fn query_for<R: Record>(
        &self,
        sql: &str,
        record: &mut R,
        params: &[Value],
        f: impl FnMut(&mut R) -> Result<()>,
    ) -> Result<()> {
        if self.scan_each(sql, params, record, f)? == 0 {
            return Err(DbError::NullResult.into());
        }
        Ok(())
    }

    pub fn query_all<T: Record + Default>(&self, sql: &str, params: &[Value]) -> Result<Vec<T>> {
        self.scan_all(sql, params)
    }

    /// True if at least one row of `table` matches, any error counts as no.
    pub fn can_find(&self, table: &str, condition: &str, params: &[Value]) -> bool {
        self.can_query(&Self::select(table, condition), params)
    }

    /// True if `sql` returns at least one row, any error counts as no.
    pub fn can_query(&self, sql: &str, params: &[Value]) -> bool {
        self.with_inner(|inner| {
            let statement = inner.statement(sql)?;
            let mut rows = statement.query(params)?;
            Ok(rows.next()?.is_some())
        })
        .unwrap_or(false)
    }

    /// Scans one random row of `table` into `record`.
    pub fn pick<R: Record>(&self, table: &str, record: &mut R) -> Result<()> {
        self.pick_for(table, 1, record, |_| Ok(()))
    }

    /// Calls `f` for up to `n` random rows of `table`.
    pub fn pick_for<R: Record>(
        &self,
        table: &str,
        n: u32,
        record: &mut R,
        f: impl FnMut(&mut R) -> Result<()>,
    ) -> Result<()> {
        let mut condition = String::with_capacity(32);
        SqliteSqlWriter.write_random_order(&mut condition, n);
        self.find_for(table, record, &condition, &[], f)
    }

    /// Deletes the rows of `table` matching `condition`, all of them if it is empty.
    pub fn delete(&self, table: &str, condition: &str, params: &[Value]) -> Result<RowsAffected> {
        let mut sql = String::with_capacity(64 + condition.len());
        SqliteSqlWriter.write_delete(&mut sql, table, condition);
        self.execute(&sql, params)
    }

    pub fn drop_table(&self, table: &str) -> Result<()> {
        let mut sql = String::with_capacity(64);
        SqliteSqlWriter.write_drop_table(&mut sql, table);
        self.execute(&sql, &[]).map(|_| ())
    }

    pub fn count(&self, table: &str) -> Result<u64> {
        let mut sql = String::with_capacity(64);
        SqliteSqlWriter.write_count(&mut sql, table);
        self.single(&sql)
    }

    /// Names of the tables, in lexicographic order.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut sql = String::with_capacity(64);
        SqliteSqlWriter.write_list_tables(&mut sql);
        self.with_inner(|inner| {
            let statement = inner.statement(&sql)?;
            let mut rows = statement.query(&[])?;
            let mut result = Vec::new();
            while let Some(row) = rows.next()? {
                let Some(name) = row.into_vec().into_iter().next() else {
                    continue;
                };
                result.push(String::try_from_value(name)?);
            }
            Ok(result)
        })
    }

    fn single<T: AsValue>(&self, sql: &str) -> Result<T> {
        self.with_inner(|inner| {
            let statement = inner.statement(sql)?;
            let mut rows = statement.query(&[])?;
            let Some(value) = rows
                .next()?
                .and_then(|row| row.into_vec().into_iter().next())
            else {
                return Err(DbError::NullResult.into());
            };
            T::try_from_value(value)
        })
    }
}

impl Drop for SqliteDatabase {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            log::error!("{:#}", error);
        }
    }
}
