use crate::{CBox, SqliteCursor, SqlitePrepared, error_message_from_ptr};
use libsqlite3_sys::*;
use std::{
    ffi::{CString, c_char, c_int},
    ptr,
};
use trove_core::{Context, Error, OrmError, Result, Value, truncate_long};

/// One open database connection.
pub struct SqliteConnection {
    pub(crate) connection: CBox<*mut sqlite3>,
}

impl SqliteConnection {
    /// Open `path` with the `SQLITE_OPEN_*` `flags`. The connection is always serialized.
    pub fn open(path: &str, flags: c_int, busy_timeout: u32) -> Result<Self> {
        let context = || format!("While opening the sqlite database `{}`", path);
        let c_path = CString::new(path).with_context(context)?;
        let mut connection = CBox::new(ptr::null_mut(), |p| unsafe {
            sqlite3_close(p);
        });
        let rc = unsafe {
            sqlite3_open_v2(
                c_path.as_ptr(),
                &mut *connection,
                flags | SQLITE_OPEN_FULLMUTEX,
                ptr::null(),
            )
        };
        if rc != SQLITE_OK {
            let message = if connection.is_null() {
                "out of memory".to_string()
            } else {
                unsafe { error_message_from_ptr(sqlite3_errmsg(*connection)).to_string() }
            };
            return Err(Error::msg(message).context(context()));
        }
        unsafe {
            sqlite3_extended_result_codes(*connection, 1);
            sqlite3_busy_timeout(*connection, busy_timeout.min(c_int::MAX as u32) as c_int);
        }
        log::debug!("Opened the sqlite database `{}`", path);
        Ok(Self { connection })
    }

    /// Error raised by the last failing call, classified by its extended result code.
    pub(crate) fn last_error(&self) -> Error {
        unsafe {
            let code = sqlite3_extended_errcode(*self.connection);
            let message = error_message_from_ptr(sqlite3_errmsg(*self.connection)).to_string();
            if code & 0xff == SQLITE_CONSTRAINT {
                if code == SQLITE_CONSTRAINT_UNIQUE || code == SQLITE_CONSTRAINT_PRIMARYKEY {
                    OrmError::DuplicateKey { message }.into()
                } else {
                    OrmError::Constraint { message }.into()
                }
            } else {
                Error::msg(message)
            }
        }
    }

    /// Compile the first statement of `sql[offset..]`. Returns the statement (absent when
    /// only whitespace or comments were left) and the offset of the rest of the script.
    fn prepare_at(&self, sql: &str, offset: usize) -> Result<(Option<SqlitePrepared>, usize)> {
        let rest = &sql[offset..];
        let mut statement = CBox::new(ptr::null_mut(), |p| unsafe {
            sqlite3_finalize(p);
        });
        let mut tail: *const c_char = ptr::null();
        let rc = unsafe {
            sqlite3_prepare_v2(
                *self.connection,
                rest.as_ptr() as *const c_char,
                rest.len() as c_int,
                &mut *statement,
                &mut tail,
            )
        };
        if rc != SQLITE_OK {
            return Err(self.last_error().context(format!(
                "While preparing the query:\n{}",
                truncate_long!(rest)
            )));
        }
        let consumed = if tail.is_null() {
            rest.len()
        } else {
            (tail as usize - rest.as_ptr() as usize).min(rest.len())
        };
        let prepared = (!statement.is_null()).then(|| SqlitePrepared::new(statement));
        Ok((prepared, offset + consumed))
    }

    /// Compile a single statement.
    pub fn prepare(&self, sql: &str) -> Result<SqlitePrepared> {
        let (prepared, offset) = self.prepare_at(sql, 0)?;
        let Some(prepared) = prepared else {
            return Err(Error::msg("The query does not contain any statement"));
        };
        if !sql[offset..].trim().is_empty() {
            return Err(Error::msg(format!(
                "Cannot prepare more than one statement at a time:\n{}",
                truncate_long!(sql)
            )));
        }
        Ok(prepared)
    }

    /// Step `prepared` until it is done, discarding rows.
    fn run(&self, prepared: &SqlitePrepared) -> Result<()> {
        loop {
            match unsafe { sqlite3_step(*prepared.statement) } {
                SQLITE_ROW => continue,
                SQLITE_DONE => return Ok(()),
                _ => {
                    let sql = prepared.sql();
                    return Err(self
                        .last_error()
                        .context(format!("While executing:\n{}", truncate_long!(sql))));
                }
            }
        }
    }

    /// Run every statement of `sql`.
    pub fn execute(&mut self, sql: &str) -> Result<()> {
        log::debug!("Executing:\n{}", truncate_long!(sql));
        let mut offset = 0;
        while offset < sql.len() {
            let (prepared, next) = self.prepare_at(sql, offset)?;
            if let Some(prepared) = prepared {
                self.run(&prepared)?;
            }
            if next <= offset {
                break;
            }
            offset = next;
        }
        Ok(())
    }

    /// Run one statement binding `params`, returns the number of rows it changed.
    pub fn execute_with(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        log::debug!("Executing:\n{}", truncate_long!(sql));
        let mut prepared = self.prepare(sql)?;
        prepared.bind_all(params)?;
        self.run(&prepared)?;
        Ok(unsafe { sqlite3_changes64(*self.connection) } as u64)
    }

    /// Rows of `sql`, read lazily while the cursor is iterated.
    pub fn query(&mut self, sql: &str, params: &[Value]) -> Result<SqliteCursor<'_>> {
        log::debug!("Querying:\n{}", truncate_long!(sql));
        let mut prepared = self.prepare(sql)?;
        prepared.bind_all(params)?;
        SqliteCursor::new(self, prepared)
    }

    pub fn last_insert_rowid(&self) -> i64 {
        unsafe { sqlite3_last_insert_rowid(*self.connection) }
    }

    pub fn is_autocommit(&self) -> bool {
        unsafe { sqlite3_get_autocommit(*self.connection) != 0 }
    }
}
