use crate::{
    AsValue, Database, Dispatcher, Model, PendingOperation, PoolConfig, Result, Selection,
    Session, Store, Transaction, Value, WorkerPool,
};
use std::{collections::HashMap, hash::Hash, sync::Arc};

/// Asynchronous front of a [`Database`]: every operation runs on a worker of the pool
/// and the caller gets a [`PendingOperation`] back right away.
///
/// Inputs are taken by value since they travel to another thread.
pub struct Repository<S: Store> {
    database: Arc<Database<S>>,
    pool: WorkerPool,
}

impl<S: Store> Repository<S> {
    pub fn new(store: S) -> Result<Self> {
        Self::with_config(store, PoolConfig::default())
    }

    pub fn with_config(store: S, config: PoolConfig) -> Result<Self> {
        Ok(Self {
            database: Arc::new(Database::new(store)),
            pool: WorkerPool::new(config)?,
        })
    }

    pub fn database(&self) -> &Arc<Database<S>> {
        &self.database
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Run `f` on a worker.
    pub fn submit<T, F>(&self, f: F) -> PendingOperation<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database<S>) -> Result<T> + Send + 'static,
    {
        let database = self.database.clone();
        self.pool.submit(move || f(&database))
    }

    /// Run `f` on a worker and hand a copy of its successful result to `on_success`
    /// through `dispatcher`. Failures only reach the returned operation.
    pub fn submit_with_callback<T, F, D, C>(
        &self,
        f: F,
        dispatcher: D,
        on_success: C,
    ) -> PendingOperation<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce(&Database<S>) -> Result<T> + Send + 'static,
        D: Dispatcher,
        C: FnOnce(T) + Send + 'static,
    {
        self.submit(move |database| {
            let result = f(database)?;
            let value = result.clone();
            dispatcher.dispatch(Box::new(move || on_success(value)));
            Ok(result)
        })
    }

    /// Run `f` inside one transaction on a worker, committing when it succeeds.
    ///
    /// Related reads and writes made through the session are atomic.
    pub fn execute_write<T, F>(&self, f: F) -> PendingOperation<T>
    where
        T: Send + 'static,
        F: for<'s> FnOnce(&mut Session<Transaction<S::Handle<'s>>>) -> Result<T> + Send + 'static,
    {
        self.submit(move |database| database.in_transaction(f))
    }

    pub fn execute_write_with_callback<T, F, D, C>(
        &self,
        f: F,
        dispatcher: D,
        on_success: C,
    ) -> PendingOperation<T>
    where
        T: Clone + Send + 'static,
        F: for<'s> FnOnce(&mut Session<Transaction<S::Handle<'s>>>) -> Result<T> + Send + 'static,
        D: Dispatcher,
        C: FnOnce(T) + Send + 'static,
    {
        self.submit_with_callback(
            move |database| database.in_transaction(f),
            dispatcher,
            on_success,
        )
    }

    pub fn create_table<M: Model>(&self, if_not_exists: bool) -> PendingOperation<()> {
        self.submit(move |db| db.create_table::<M>(if_not_exists))
    }

    pub fn drop_table<M: Model>(&self) -> PendingOperation<()> {
        self.submit(|db| db.drop_table::<M>())
    }

    pub fn execute(&self, sql: impl Into<String>) -> PendingOperation<()> {
        let sql = sql.into();
        self.submit(move |db| db.execute(&sql))
    }

    pub fn insert<M: Model>(&self, model: M) -> PendingOperation<Option<i64>> {
        self.submit(move |db| Ok(db.insert(&model)))
    }

    pub fn insert_or_throw<M: Model>(&self, model: M) -> PendingOperation<i64> {
        self.submit(move |db| db.insert_or_throw(&model))
    }

    pub fn insert_all<M: Model>(&self, models: Vec<M>) -> PendingOperation<Vec<i64>> {
        self.submit(move |db| Ok(db.insert_all(&models)))
    }

    pub fn insert_all_or_throw<M: Model>(&self, models: Vec<M>) -> PendingOperation<Vec<i64>> {
        self.submit(move |db| db.insert_all_or_throw(&models))
    }

    pub fn replace<M: Model>(&self, model: M) -> PendingOperation<Option<i64>> {
        self.submit(move |db| Ok(db.replace(&model)))
    }

    pub fn replace_or_throw<M: Model>(&self, model: M) -> PendingOperation<i64> {
        self.submit(move |db| db.replace_or_throw(&model))
    }

    pub fn replace_all<M: Model>(&self, models: Vec<M>) -> PendingOperation<Vec<i64>> {
        self.submit(move |db| Ok(db.replace_all(&models)))
    }

    pub fn replace_all_or_throw<M: Model>(&self, models: Vec<M>) -> PendingOperation<Vec<i64>> {
        self.submit(move |db| db.replace_all_or_throw(&models))
    }

    pub fn update<M: Model>(&self, model: M) -> PendingOperation<u64> {
        self.submit(move |db| db.update(&model))
    }

    pub fn query<M: Model>(&self, selection: impl Into<Selection>) -> PendingOperation<Vec<M>> {
        let selection = selection.into();
        self.submit(move |db| db.query::<M>(selection))
    }

    pub fn query_row<M: Model>(
        &self,
        selection: impl Into<Selection>,
    ) -> PendingOperation<Option<M>> {
        let selection = selection.into();
        self.submit(move |db| db.query_row::<M>(selection))
    }

    pub fn query_raw_sql<M: Model>(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> PendingOperation<Vec<M>> {
        let sql = sql.into();
        self.submit(move |db| db.query_raw_sql::<M>(&sql, &params))
    }

    pub fn query_row_raw_sql<M: Model>(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> PendingOperation<Option<M>> {
        let sql = sql.into();
        self.submit(move |db| db.query_row_raw_sql::<M>(&sql, &params))
    }

    pub fn query_rows_mapped<M, K>(
        &self,
        key_field: Option<String>,
        selection: impl Into<Selection>,
    ) -> PendingOperation<HashMap<K, M>>
    where
        M: Model,
        K: AsValue + Eq + Hash + Send + 'static,
    {
        let selection = selection.into();
        self.submit(move |db| db.query_rows_mapped::<M, K>(key_field.as_deref(), selection))
    }

    pub fn query_rows_mapped_raw_sql<M, K>(
        &self,
        key_field: Option<String>,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> PendingOperation<HashMap<K, M>>
    where
        M: Model,
        K: AsValue + Eq + Hash + Send + 'static,
    {
        let sql = sql.into();
        self.submit(move |db| {
            db.query_rows_mapped_raw_sql::<M, K>(key_field.as_deref(), &sql, &params)
        })
    }

    pub fn query_grouped_rows<M, K>(
        &self,
        key_field: Option<String>,
        selection: impl Into<Selection>,
    ) -> PendingOperation<HashMap<K, Vec<M>>>
    where
        M: Model,
        K: AsValue + Eq + Hash + Send + 'static,
    {
        let selection = selection.into();
        self.submit(move |db| db.query_grouped_rows::<M, K>(key_field.as_deref(), selection))
    }

    pub fn query_grouped_rows_raw_sql<M, K>(
        &self,
        key_field: Option<String>,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> PendingOperation<HashMap<K, Vec<M>>>
    where
        M: Model,
        K: AsValue + Eq + Hash + Send + 'static,
    {
        let sql = sql.into();
        self.submit(move |db| {
            db.query_grouped_rows_raw_sql::<M, K>(key_field.as_deref(), &sql, &params)
        })
    }

    pub fn get_count<M: Model>(&self, selection: impl Into<Selection>) -> PendingOperation<i64> {
        let selection = selection.into();
        self.submit(move |db| db.get_count::<M>(selection))
    }

    pub fn query_scalar<T>(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> PendingOperation<Option<T>>
    where
        T: AsValue + Send + 'static,
    {
        let sql = sql.into();
        self.submit(move |db| db.query_scalar::<T>(&sql, &params))
    }

    pub fn query_string(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> PendingOperation<Option<String>> {
        self.query_scalar(sql, params)
    }

    pub fn query_integer(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> PendingOperation<Option<i32>> {
        self.query_scalar(sql, params)
    }

    pub fn query_long(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> PendingOperation<Option<i64>> {
        self.query_scalar(sql, params)
    }

    pub fn query_double(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> PendingOperation<Option<f64>> {
        self.query_scalar(sql, params)
    }

    pub fn query_column<T>(
        &self,
        sql: impl Into<String>,
        params: Vec<Value>,
    ) -> PendingOperation<Vec<T>>
    where
        T: AsValue + Send + 'static,
    {
        let sql = sql.into();
        self.submit(move |db| db.query_column::<T>(&sql, &params))
    }
}
