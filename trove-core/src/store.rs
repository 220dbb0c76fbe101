use crate::{ColumnMap, Conflict, Result, RowLabeled, SqlWriter, Value, report_error};

/// A relational store the engine runs against.
///
/// The store is shared by every worker of a pool, handles are taken per operation.
pub trait Store: Send + Sync + 'static {
    type Handle<'s>: StoreHandle
    where
        Self: 's;

    fn sql_writer(&self) -> &dyn SqlWriter;

    /// Handle for reads.
    fn readable(&self) -> Result<Self::Handle<'_>>;

    /// Handle for reads and writes.
    fn writable(&self) -> Result<Self::Handle<'_>>;
}

/// Open access to a store, valid for the duration of one operation.
pub trait StoreHandle {
    /// Lazy iterator over the rows of a query.
    type Cursor<'h>: Iterator<Item = Result<RowLabeled>>
    where
        Self: 'h;

    fn sql_writer(&self) -> &dyn SqlWriter;

    /// Run every statement of `sql`, without parameters.
    fn execute(&mut self, sql: &str) -> Result<()>;

    /// Run a single statement binding `params`, returns the number of rows it changed.
    fn execute_with(&mut self, sql: &str, params: &[Value]) -> Result<u64>;

    fn raw_query(&mut self, sql: &str, params: &[Value]) -> Result<Self::Cursor<'_>>;

    /// Row id generated by the most recent successful insert.
    fn last_insert_id(&self) -> i64;

    fn write_row(&mut self, table: &str, values: &ColumnMap, conflict: Conflict) -> Result<i64> {
        let mut sql = String::with_capacity(128);
        let columns = values.columns().collect::<Vec<_>>();
        self.sql_writer()
            .write_insert(&mut sql, table, &columns, conflict);
        let params = values.values().cloned().collect::<Vec<_>>();
        self.execute_with(&sql, &params)?;
        Ok(self.last_insert_id())
    }

    fn insert_or_throw(&mut self, table: &str, values: &ColumnMap) -> Result<i64> {
        self.write_row(table, values, Conflict::Abort)
    }

    /// Like [`StoreHandle::insert_or_throw`], failures are reported and yield `None`.
    fn insert(&mut self, table: &str, values: &ColumnMap) -> Option<i64> {
        self.insert_or_throw(table, values)
            .inspect_err(report_error)
            .ok()
    }

    fn replace_or_throw(&mut self, table: &str, values: &ColumnMap) -> Result<i64> {
        self.write_row(table, values, Conflict::Replace)
    }

    /// Like [`StoreHandle::replace_or_throw`], failures are reported and yield `None`.
    fn replace(&mut self, table: &str, values: &ColumnMap) -> Option<i64> {
        self.replace_or_throw(table, values)
            .inspect_err(report_error)
            .ok()
    }

    fn update(
        &mut self,
        table: &str,
        values: &ColumnMap,
        where_clause: &str,
        where_params: &[Value],
    ) -> Result<u64> {
        let mut sql = String::with_capacity(128);
        let columns = values.columns().collect::<Vec<_>>();
        self.sql_writer()
            .write_update(&mut sql, table, &columns, where_clause);
        let params = values
            .values()
            .chain(where_params)
            .cloned()
            .collect::<Vec<_>>();
        self.execute_with(&sql, &params)
    }

    fn begin_transaction(&mut self) -> Result<()> {
        let mut sql = String::new();
        self.sql_writer().write_transaction_begin(&mut sql);
        self.execute(&sql)
    }

    fn commit_transaction(&mut self) -> Result<()> {
        let mut sql = String::new();
        self.sql_writer().write_transaction_commit(&mut sql);
        self.execute(&sql)
    }

    fn rollback_transaction(&mut self) -> Result<()> {
        let mut sql = String::new();
        self.sql_writer().write_transaction_rollback(&mut sql);
        self.execute(&sql)
    }
}

/// A transaction owning its handle.
///
/// `end()` commits only when `set_successful()` was called before, otherwise it rolls
/// back. A commit the store refuses is rolled back too, the handle never leaves with a
/// transaction still open. A transaction dropped without `end()` rolls back.
pub struct Transaction<H: StoreHandle> {
    handle: H,
    successful: bool,
    ended: bool,
}

impl<H: StoreHandle> Transaction<H> {
    pub fn begin(mut handle: H) -> Result<Self> {
        handle.begin_transaction()?;
        Ok(Self {
            handle,
            successful: false,
            ended: false,
        })
    }

    pub fn set_successful(&mut self) {
        self.successful = true;
    }

    pub fn is_successful(&self) -> bool {
        self.successful
    }

    pub fn end(mut self) -> Result<()> {
        self.ended = true;
        if !self.successful {
            return self.handle.rollback_transaction();
        }
        let result = self.handle.commit_transaction();
        if result.is_err() {
            if let Err(e) = self.handle.rollback_transaction() {
                report_error(&e.context("Rollback after a failed commit"));
            }
        }
        result
    }
}

impl<H: StoreHandle> StoreHandle for Transaction<H> {
    type Cursor<'h>
        = H::Cursor<'h>
    where
        Self: 'h;

    fn sql_writer(&self) -> &dyn SqlWriter {
        self.handle.sql_writer()
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        self.handle.execute(sql)
    }

    fn execute_with(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        self.handle.execute_with(sql, params)
    }

    fn raw_query(&mut self, sql: &str, params: &[Value]) -> Result<Self::Cursor<'_>> {
        self.handle.raw_query(sql, params)
    }

    fn last_insert_id(&self) -> i64 {
        self.handle.last_insert_id()
    }
}

impl<H: StoreHandle> Drop for Transaction<H> {
    fn drop(&mut self) {
        if self.ended {
            return;
        }
        log::warn!("Transaction dropped before it was ended, rolling back");
        if let Err(e) = self.handle.rollback_transaction() {
            report_error(&e);
        }
    }
}
