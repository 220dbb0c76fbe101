use crate::{
    AsValue, Conflict, Model, Result, Selection, Session, SqlWriter, Store, Transaction, Value,
    report_error,
};
use std::{collections::HashMap, hash::Hash};

/// Runs model reads and writes against a store.
///
/// Every call is synchronous and blocks the calling thread, see `Repository` for the
/// pooled asynchronous variant.
pub struct Database<S: Store> {
    store: S,
}

impl<S: Store> Database<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sql_writer(&self) -> &dyn SqlWriter {
        self.store.sql_writer()
    }

    /// Session over a readable handle, released when the session is dropped.
    pub fn reader(&self) -> Result<Session<S::Handle<'_>>> {
        Ok(Session::new(self.store.readable()?))
    }

    /// Session over a writable handle, released when the session is dropped.
    pub fn writer(&self) -> Result<Session<S::Handle<'_>>> {
        Ok(Session::new(self.store.writable()?))
    }

    /// Create the table of `M` and its unique indexes.
    pub fn create_table<M: Model>(&self, if_not_exists: bool) -> Result<()> {
        self.writer()?.create_table::<M>(if_not_exists)
    }

    pub fn drop_table<M: Model>(&self) -> Result<()> {
        self.writer()?.drop_table::<M>()
    }

    pub fn execute(&self, sql: &str) -> Result<()> {
        self.writer()?.execute(sql)
    }

    fn write_all<'a, M, I>(&self, models: I, conflict: Conflict, throw: bool) -> Result<Vec<i64>>
    where
        M: Model,
        I: IntoIterator<Item = &'a M>,
    {
        let models = models.into_iter();
        let mut ids = Vec::with_capacity(models.size_hint().0);
        let mut session = Session::new(Transaction::begin(self.store.writable()?)?);
        for model in models {
            match session.write_one(model, conflict) {
                Ok(id) => ids.push(id),
                Err(e) if throw => {
                    if let Err(rollback) = session.into_inner().end() {
                        report_error(&rollback);
                    }
                    return Err(e);
                }
                Err(e) => {
                    report_error(&e.context(format!(
                        "Batch write on `{}` stopped after {} rows",
                        M::TABLE,
                        ids.len()
                    )));
                    break;
                }
            }
        }
        let mut transaction = session.into_inner();
        transaction.set_successful();
        transaction.end()?;
        Ok(ids)
    }

    pub fn insert_or_throw<M: Model>(&self, model: &M) -> Result<i64> {
        self.writer()?.insert_or_throw(model)
    }

    /// Insert `model`, a failure is reported and yields `None`.
    pub fn insert<M: Model>(&self, model: &M) -> Option<i64> {
        self.insert_or_throw(model).inspect_err(report_error).ok()
    }

    /// Insert every model in one transaction. The first failure rolls back the whole
    /// batch and is returned.
    pub fn insert_all_or_throw<'a, M, I>(&self, models: I) -> Result<Vec<i64>>
    where
        M: Model,
        I: IntoIterator<Item = &'a M>,
    {
        self.write_all(models, Conflict::Abort, true)
    }

    /// Insert every model in one transaction. The first failure is reported and stops
    /// the batch, the rows written before it are committed and their ids returned.
    pub fn insert_all<'a, M, I>(&self, models: I) -> Vec<i64>
    where
        M: Model,
        I: IntoIterator<Item = &'a M>,
    {
        self.write_all(models, Conflict::Abort, false)
            .inspect_err(report_error)
            .unwrap_or_default()
    }

    pub fn replace_or_throw<M: Model>(&self, model: &M) -> Result<i64> {
        self.writer()?.replace_or_throw(model)
    }

    pub fn replace<M: Model>(&self, model: &M) -> Option<i64> {
        self.replace_or_throw(model).inspect_err(report_error).ok()
    }

    pub fn replace_all_or_throw<'a, M, I>(&self, models: I) -> Result<Vec<i64>>
    where
        M: Model,
        I: IntoIterator<Item = &'a M>,
    {
        self.write_all(models, Conflict::Replace, true)
    }

    pub fn replace_all<'a, M, I>(&self, models: I) -> Vec<i64>
    where
        M: Model,
        I: IntoIterator<Item = &'a M>,
    {
        self.write_all(models, Conflict::Replace, false)
            .inspect_err(report_error)
            .unwrap_or_default()
    }

    /// Update the row sharing the primary key of `model`, returns the number of rows changed.
    pub fn update<M: Model>(&self, model: &M) -> Result<u64> {
        self.writer()?.update(model)
    }

    /// Models matching `selection`. Rows that cannot be marshalled are reported and skipped.
    pub fn query<M: Model>(&self, selection: impl Into<Selection>) -> Result<Vec<M>> {
        self.reader()?.query(selection)
    }

    /// First model matching `selection`.
    pub fn query_row<M: Model>(&self, selection: impl Into<Selection>) -> Result<Option<M>> {
        self.reader()?.query_row(selection)
    }

    /// Models returned by `sql`, where `{:table}` stands for the table of `M`.
    pub fn query_raw_sql<M: Model>(&self, sql: &str, params: &[Value]) -> Result<Vec<M>> {
        self.reader()?.query_raw_sql(sql, params)
    }

    pub fn query_row_raw_sql<M: Model>(&self, sql: &str, params: &[Value]) -> Result<Option<M>> {
        self.reader()?.query_row_raw_sql(sql, params)
    }

    /// Models keyed by `key_field` (the primary key when `None`). A later row with the
    /// same key replaces the earlier one.
    pub fn query_rows_mapped<M, K>(
        &self,
        key_field: Option<&str>,
        selection: impl Into<Selection>,
    ) -> Result<HashMap<K, M>>
    where
        M: Model,
        K: AsValue + Eq + Hash,
    {
        self.reader()?.query_rows_mapped(key_field, selection)
    }

    pub fn query_rows_mapped_raw_sql<M, K>(
        &self,
        key_field: Option<&str>,
        sql: &str,
        params: &[Value],
    ) -> Result<HashMap<K, M>>
    where
        M: Model,
        K: AsValue + Eq + Hash,
    {
        self.reader()?
            .query_rows_mapped_raw_sql(key_field, sql, params)
    }

    /// Models grouped by `key_field` (the primary key when `None`), in row order.
    pub fn query_grouped_rows<M, K>(
        &self,
        key_field: Option<&str>,
        selection: impl Into<Selection>,
    ) -> Result<HashMap<K, Vec<M>>>
    where
        M: Model,
        K: AsValue + Eq + Hash,
    {
        self.reader()?.query_grouped_rows(key_field, selection)
    }

    pub fn query_grouped_rows_raw_sql<M, K>(
        &self,
        key_field: Option<&str>,
        sql: &str,
        params: &[Value],
    ) -> Result<HashMap<K, Vec<M>>>
    where
        M: Model,
        K: AsValue + Eq + Hash,
    {
        self.reader()?
            .query_grouped_rows_raw_sql(key_field, sql, params)
    }

    /// Number of rows of `M` matching `selection`.
    pub fn get_count<M: Model>(&self, selection: impl Into<Selection>) -> Result<i64> {
        self.reader()?.get_count::<M>(selection)
    }

    /// First column of the first row of `sql`, `None` when there are no rows or the
    /// cell is NULL.
    pub fn query_scalar<T: AsValue>(&self, sql: &str, params: &[Value]) -> Result<Option<T>> {
        self.reader()?.query_scalar(sql, params)
    }

    pub fn query_string(&self, sql: &str, params: &[Value]) -> Result<Option<String>> {
        self.query_scalar(sql, params)
    }

    pub fn query_integer(&self, sql: &str, params: &[Value]) -> Result<Option<i32>> {
        self.query_scalar(sql, params)
    }

    pub fn query_long(&self, sql: &str, params: &[Value]) -> Result<Option<i64>> {
        self.query_scalar(sql, params)
    }

    pub fn query_double(&self, sql: &str, params: &[Value]) -> Result<Option<f64>> {
        self.query_scalar(sql, params)
    }

    /// First column of every row of `sql`. Cells that cannot be converted are reported
    /// and skipped.
    pub fn query_column<T: AsValue>(&self, sql: &str, params: &[Value]) -> Result<Vec<T>> {
        self.reader()?.query_column(sql, params)
    }

    /// Run `f` inside one transaction on a writable handle. The transaction commits when
    /// `f` succeeds and rolls back otherwise.
    ///
    /// The store is held for the whole call: `f` must go through the session it receives,
    /// not through this `Database`.
    pub fn in_transaction<'s, R, F>(&'s self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Session<Transaction<S::Handle<'s>>>) -> Result<R>,
    {
        let mut session = Session::new(Transaction::begin(self.store.writable()?)?);
        let result = f(&mut session);
        let mut transaction = session.into_inner();
        match result {
            Ok(result) => {
                transaction.set_successful();
                transaction.end()?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback) = transaction.end() {
                    report_error(&rollback);
                }
                Err(e)
            }
        }
    }
}
