use crate::{
    AsValue, Conflict, Model, OrmError, Result, RowLabeled, Selection, SqlWriter, StoreHandle,
    Value, create_table_statements, from_row, from_row_column, from_row_column_as, report_error,
    to_insert_row, to_storage_row, truncate_long,
};
use anyhow::Context;
use std::{
    collections::HashMap,
    hash::Hash,
    ops::{Deref, DerefMut},
};

/// Model reads and writes running on one store handle.
///
/// Inside [`crate::Database::in_transaction`] the session wraps the transaction, so every
/// call joins it. The raw handle stays reachable through `Deref`.
pub struct Session<H: StoreHandle> {
    handle: H,
}

impl<H: StoreHandle> Session<H> {
    pub fn new(handle: H) -> Self {
        Self { handle }
    }

    pub fn into_inner(self) -> H {
        self.handle
    }

    pub fn sql_writer(&self) -> &dyn SqlWriter {
        self.handle.sql_writer()
    }

    /// Create the table of `M` and its unique indexes.
    pub fn create_table<M: Model>(&mut self, if_not_exists: bool) -> Result<()> {
        let descriptor = M::describe()?;
        let statements = create_table_statements(self.sql_writer(), descriptor, if_not_exists);
        self.handle
            .execute(&statements.join("\n"))
            .with_context(|| format!("While creating the table `{}`", descriptor.table()))
    }

    pub fn drop_table<M: Model>(&mut self) -> Result<()> {
        let descriptor = M::describe()?;
        let mut sql = String::with_capacity(64);
        self.sql_writer().write_drop_table(&mut sql, descriptor.table());
        self.handle.execute(&sql)
    }

    pub fn execute(&mut self, sql: &str) -> Result<()> {
        self.handle.execute(sql)
    }

    pub(crate) fn write_one<M: Model>(&mut self, model: &M, conflict: Conflict) -> Result<i64> {
        let row = to_insert_row(model)?;
        self.handle.write_row(M::TABLE, &row, conflict)
    }

    pub fn insert_or_throw<M: Model>(&mut self, model: &M) -> Result<i64> {
        self.write_one(model, Conflict::Abort)
    }

    /// Insert `model`, a failure is reported and yields `None`.
    pub fn insert<M: Model>(&mut self, model: &M) -> Option<i64> {
        self.insert_or_throw(model).inspect_err(report_error).ok()
    }

    pub fn replace_or_throw<M: Model>(&mut self, model: &M) -> Result<i64> {
        self.write_one(model, Conflict::Replace)
    }

    pub fn replace<M: Model>(&mut self, model: &M) -> Option<i64> {
        self.replace_or_throw(model).inspect_err(report_error).ok()
    }

    /// Update the row sharing the primary key of `model`, returns the number of rows changed.
    pub fn update<M: Model>(&mut self, model: &M) -> Result<u64> {
        let descriptor = M::describe()?;
        let pk = descriptor.require_primary_key()?;
        let mut row = to_storage_row(model)?;
        let key = row.remove(pk.name).unwrap_or_default();
        if row.is_empty() {
            log::debug!("Nothing to update in `{}`, only the key is stored", M::TABLE);
            return Ok(0);
        }
        let mut criteria = String::with_capacity(32);
        self.sql_writer()
            .write_identifier_quoted(&mut criteria, pk.name);
        criteria.push_str(" = ?");
        self.handle.update(M::TABLE, &row, &criteria, &[key])
    }

    fn select_sql<M: Model>(&self, selection: &Selection) -> String {
        let mut sql = String::with_capacity(64 + selection.criteria.len());
        self.sql_writer()
            .write_select(&mut sql, M::TABLE, &selection.criteria);
        sql
    }

    fn raw_sql<M: Model>(&self, sql: &str) -> String {
        let mut out = String::with_capacity(sql.len() + 16);
        self.sql_writer()
            .write_table_placeholder(&mut out, sql, M::TABLE);
        out
    }

    /// Visit the rows of `sql`. Store failures end the visit, `f` failures are
    /// reported and the row is skipped.
    fn each_row<F>(&mut self, sql: &str, params: &[Value], mut f: F) -> Result<()>
    where
        F: FnMut(&RowLabeled) -> Result<()>,
    {
        for row in self.handle.raw_query(sql, params)? {
            let row = row?;
            if let Err(e) = f(&row) {
                let context = format!("Skipped a row of `{}`", truncate_long!(sql));
                report_error(&e.context(context));
            }
        }
        Ok(())
    }

    fn first_row(&mut self, sql: &str, params: &[Value]) -> Result<Option<RowLabeled>> {
        let mut cursor = self.handle.raw_query(sql, params)?;
        cursor.next().transpose()
    }

    fn collect<M: Model>(&mut self, sql: &str, params: &[Value]) -> Result<Vec<M>> {
        let mut result = Vec::new();
        self.each_row(sql, params, |row| {
            result.push(from_row::<M>(row)?);
            Ok(())
        })?;
        Ok(result)
    }

    fn first<M: Model>(&mut self, sql: &str, params: &[Value]) -> Result<Option<M>> {
        self.first_row(sql, params)?
            .map(|row| from_row::<M>(&row))
            .transpose()
    }

    /// Models matching `selection`. Rows that cannot be marshalled are reported and skipped.
    pub fn query<M: Model>(&mut self, selection: impl Into<Selection>) -> Result<Vec<M>> {
        let selection = selection.into();
        let sql = self.select_sql::<M>(&selection);
        self.collect(&sql, &selection.params)
    }

    /// First model matching `selection`.
    pub fn query_row<M: Model>(&mut self, selection: impl Into<Selection>) -> Result<Option<M>> {
        let selection = selection.into();
        let sql = self.select_sql::<M>(&selection);
        self.first(&sql, &selection.params)
    }

    /// Models returned by `sql`, where `{:table}` stands for the table of `M`.
    pub fn query_raw_sql<M: Model>(&mut self, sql: &str, params: &[Value]) -> Result<Vec<M>> {
        let sql = self.raw_sql::<M>(sql);
        self.collect(&sql, params)
    }

    pub fn query_row_raw_sql<M: Model>(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<M>> {
        let sql = self.raw_sql::<M>(sql);
        self.first(&sql, params)
    }

    /// Name of the field models are keyed by: `key_field`, else the primary key.
    fn key_field<M: Model>(key_field: Option<&str>) -> Result<&'static str> {
        let descriptor = M::describe()?;
        let field = match key_field {
            Some(name) => descriptor.field(name),
            None => descriptor.primary_key(),
        };
        field.map(|v| v.name).ok_or_else(|| {
            OrmError::NoSuchField {
                model: descriptor.model().to_owned(),
                field: key_field.unwrap_or("<primary key>").to_owned(),
            }
            .into()
        })
    }

    fn keyed<M: Model, K: AsValue>(row: &RowLabeled, key: &str) -> Result<(K, M)> {
        let model = from_row::<M>(row)?;
        let value = model.field(key).ok_or_else(|| OrmError::FieldAccess {
            model: M::TABLE.to_owned(),
            field: key.to_owned(),
        })?;
        Ok((K::try_from_value(value)?, model))
    }

    fn mapped<M, K>(
        &mut self,
        key_field: Option<&str>,
        sql: &str,
        params: &[Value],
    ) -> Result<HashMap<K, M>>
    where
        M: Model,
        K: AsValue + Eq + Hash,
    {
        let key = Self::key_field::<M>(key_field)?;
        let mut result = HashMap::new();
        self.each_row(sql, params, |row| {
            let (k, v) = Self::keyed::<M, K>(row, key)?;
            result.insert(k, v);
            Ok(())
        })?;
        Ok(result)
    }

    fn grouped<M, K>(
        &mut self,
        key_field: Option<&str>,
        sql: &str,
        params: &[Value],
    ) -> Result<HashMap<K, Vec<M>>>
    where
        M: Model,
        K: AsValue + Eq + Hash,
    {
        let key = Self::key_field::<M>(key_field)?;
        let mut result = HashMap::<K, Vec<M>>::new();
        self.each_row(sql, params, |row| {
            let (k, v) = Self::keyed::<M, K>(row, key)?;
            result.entry(k).or_default().push(v);
            Ok(())
        })?;
        Ok(result)
    }

    /// Models keyed by `key_field` (the primary key when `None`). A later row with the
    /// same key replaces the earlier one.
    pub fn query_rows_mapped<M, K>(
        &mut self,
        key_field: Option<&str>,
        selection: impl Into<Selection>,
    ) -> Result<HashMap<K, M>>
    where
        M: Model,
        K: AsValue + Eq + Hash,
    {
        let selection = selection.into();
        let sql = self.select_sql::<M>(&selection);
        self.mapped(key_field, &sql, &selection.params)
    }

    pub fn query_rows_mapped_raw_sql<M, K>(
        &mut self,
        key_field: Option<&str>,
        sql: &str,
        params: &[Value],
    ) -> Result<HashMap<K, M>>
    where
        M: Model,
        K: AsValue + Eq + Hash,
    {
        let sql = self.raw_sql::<M>(sql);
        self.mapped(key_field, &sql, params)
    }

    /// Models grouped by `key_field` (the primary key when `None`), in row order.
    pub fn query_grouped_rows<M, K>(
        &mut self,
        key_field: Option<&str>,
        selection: impl Into<Selection>,
    ) -> Result<HashMap<K, Vec<M>>>
    where
        M: Model,
        K: AsValue + Eq + Hash,
    {
        let selection = selection.into();
        let sql = self.select_sql::<M>(&selection);
        self.grouped(key_field, &sql, &selection.params)
    }

    pub fn query_grouped_rows_raw_sql<M, K>(
        &mut self,
        key_field: Option<&str>,
        sql: &str,
        params: &[Value],
    ) -> Result<HashMap<K, Vec<M>>>
    where
        M: Model,
        K: AsValue + Eq + Hash,
    {
        let sql = self.raw_sql::<M>(sql);
        self.grouped(key_field, &sql, params)
    }

    /// Number of rows of `M` matching `selection`.
    pub fn get_count<M: Model>(&mut self, selection: impl Into<Selection>) -> Result<i64> {
        let selection = selection.into();
        let mut sql = String::with_capacity(64 + selection.criteria.len());
        self.sql_writer()
            .write_count(&mut sql, M::TABLE, &selection.criteria);
        Ok(self
            .query_scalar::<i64>(&sql, &selection.params)?
            .unwrap_or_default())
    }

    /// First column of the first row of `sql`.
    ///
    /// `None` when there are no rows or the cell is NULL, like `MAX` over an empty table.
    pub fn query_scalar<T: AsValue>(&mut self, sql: &str, params: &[Value]) -> Result<Option<T>> {
        let Some(row) = self.first_row(sql, params)? else {
            return Ok(None);
        };
        let value = from_row_column(T::KIND.nullable(), &row, 0)?;
        if value.is_null() {
            return Ok(None);
        }
        T::try_from_value(value).map(Some)
    }

    pub fn query_string(&mut self, sql: &str, params: &[Value]) -> Result<Option<String>> {
        self.query_scalar(sql, params)
    }

    pub fn query_integer(&mut self, sql: &str, params: &[Value]) -> Result<Option<i32>> {
        self.query_scalar(sql, params)
    }

    pub fn query_long(&mut self, sql: &str, params: &[Value]) -> Result<Option<i64>> {
        self.query_scalar(sql, params)
    }

    pub fn query_double(&mut self, sql: &str, params: &[Value]) -> Result<Option<f64>> {
        self.query_scalar(sql, params)
    }

    /// First column of every row of `sql`. Cells that cannot be converted are reported
    /// and skipped.
    pub fn query_column<T: AsValue>(&mut self, sql: &str, params: &[Value]) -> Result<Vec<T>> {
        let mut result = Vec::new();
        self.each_row(sql, params, |row| {
            result.push(from_row_column_as::<T>(row, 0)?);
            Ok(())
        })?;
        Ok(result)
    }
}

impl<H: StoreHandle> Deref for Session<H> {
    type Target = H;
    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl<H: StoreHandle> DerefMut for Session<H> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.handle
    }
}
