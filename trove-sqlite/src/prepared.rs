use crate::{CBox, error_message_from_ptr};
use libsqlite3_sys::*;
use std::{
    ffi::{CStr, c_int},
    fmt::{self, Display},
    os::raw::{c_char, c_void},
};
use trove_core::{Error, Result, Value, truncate_long};

/// A compiled statement, finalized on drop.
pub struct SqlitePrepared {
    pub(crate) statement: CBox<*mut sqlite3_stmt>,
}

impl SqlitePrepared {
    pub(crate) fn new(statement: CBox<*mut sqlite3_stmt>) -> Self {
        Self { statement }
    }

    pub fn sql(&self) -> String {
        unsafe {
            let sql = sqlite3_sql(*self.statement);
            if sql.is_null() {
                return String::new();
            }
            CStr::from_ptr(sql).to_string_lossy().into_owned()
        }
    }

    pub fn parameter_count(&self) -> usize {
        unsafe { sqlite3_bind_parameter_count(*self.statement) as usize }
    }

    /// Bind `params` to the placeholders, in order. The count must match.
    pub fn bind_all(&mut self, params: &[Value]) -> Result<&mut Self> {
        let expected = self.parameter_count();
        if params.len() != expected {
            let sql = self.sql();
            let error = Error::msg(format!(
                "The query expects {} parameters but {} were provided:\n{}",
                expected,
                params.len(),
                truncate_long!(sql)
            ));
            return Err(error);
        }
        unsafe {
            sqlite3_clear_bindings(*self.statement);
        }
        for (i, value) in params.iter().enumerate() {
            self.bind_index(value, i as u64 + 1)?;
        }
        Ok(self)
    }

    /// Bind `value` to the placeholder at `index`, counting from 1.
    pub fn bind_index(&mut self, value: &Value, index: u64) -> Result<&mut Self> {
        let index = index as c_int;
        unsafe {
            let rc = match value {
                Value::Null => sqlite3_bind_null(*self.statement, index),
                Value::Boolean(v) => sqlite3_bind_int(*self.statement, index, *v as c_int),
                Value::Integer(v) => sqlite3_bind_int64(*self.statement, index, *v),
                Value::Real(v) => sqlite3_bind_double(*self.statement, index, *v),
                Value::Text(v) => sqlite3_bind_text(
                    *self.statement,
                    index,
                    v.as_ptr() as *const c_char,
                    v.len() as c_int,
                    SQLITE_TRANSIENT(),
                ),
                Value::Blob(v) => sqlite3_bind_blob(
                    *self.statement,
                    index,
                    v.as_ptr() as *const c_void,
                    v.len() as c_int,
                    SQLITE_TRANSIENT(),
                ),
            };
            if rc != SQLITE_OK {
                let db = sqlite3_db_handle(*self.statement);
                let sql = self.sql();
                let error = Error::msg(error_message_from_ptr(sqlite3_errmsg(db)).to_string())
                    .context(format!(
                        "Cannot bind parameter {} to query:\n{}",
                        index,
                        truncate_long!(sql)
                    ));
                log::error!("{:#}", error);
                return Err(error);
            }
            Ok(self)
        }
    }
}

impl Display for SqlitePrepared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:p}", *self.statement)
    }
}
