use crate::{SqliteConnection, SqliteCursor, SqliteSqlWriter};
use libsqlite3_sys::{
    SQLITE_OPEN_CREATE, SQLITE_OPEN_MEMORY, SQLITE_OPEN_READONLY, SQLITE_OPEN_READWRITE,
};
use std::{
    ffi::c_int,
    sync::{Mutex, MutexGuard, PoisonError},
    thread::{self, ThreadId},
};
use trove_core::{Context, Error, Result, SqlWriter, Store, StoreHandle, Value};
use url::form_urlencoded;

/// How the database file is opened.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqliteMode {
    ReadOnly,
    ReadWrite,
    /// Read and write, creating the file when missing.
    #[default]
    ReadWriteCreate,
    Memory,
}

impl SqliteMode {
    fn flags(&self) -> c_int {
        match self {
            SqliteMode::ReadOnly => SQLITE_OPEN_READONLY,
            SqliteMode::ReadWrite => SQLITE_OPEN_READWRITE,
            SqliteMode::ReadWriteCreate => SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE,
            SqliteMode::Memory => SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE | SQLITE_OPEN_MEMORY,
        }
    }
}

/// Settings decoded from a `sqlite://<path>?mode=..&busy_timeout=..` url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteOptions {
    pub path: String,
    pub mode: SqliteMode,
    /// Milliseconds to wait on a locked database.
    pub busy_timeout: u32,
}

impl SqliteOptions {
    pub const PREFIX: &'static str = "sqlite://";

    pub fn parse(url: &str) -> Result<Self> {
        let context = || format!("Error while decoding connection URL: `{}`", url);
        let Some(rest) = url.strip_prefix(Self::PREFIX) else {
            return Err(Error::msg(format!(
                "Expected sqlite connection url to start with `{}`",
                Self::PREFIX
            ))
            .context(context()));
        };
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        let path = urlencoding::decode(path).with_context(context)?.into_owned();
        if path.is_empty() {
            return Err(Error::msg("The database path is empty").context(context()));
        }
        let mut result = Self {
            path,
            mode: SqliteMode::default(),
            busy_timeout: 5000,
        };
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "mode" => {
                    result.mode = match value.as_ref() {
                        "ro" => SqliteMode::ReadOnly,
                        "rw" => SqliteMode::ReadWrite,
                        "rwc" => SqliteMode::ReadWriteCreate,
                        "memory" => SqliteMode::Memory,
                        _ => {
                            return Err(Error::msg(format!(
                                "Unknown mode `{}`, expected one of `ro`, `rw`, `rwc`, `memory`",
                                value
                            ))
                            .context(context()));
                        }
                    }
                }
                "busy_timeout" => {
                    result.busy_timeout = value
                        .parse::<u32>()
                        .with_context(|| format!("Invalid busy_timeout `{}`", value))
                        .with_context(context)?;
                }
                _ => log::warn!("Ignoring the unknown sqlite option `{}`", key),
            }
        }
        Ok(result)
    }
}

/// A sqlite database shared by every worker through one serialized connection.
pub struct SqliteStore {
    connection: Mutex<SqliteConnection>,
    /// Thread currently holding `connection`.
    holder: Mutex<Option<ThreadId>>,
    options: SqliteOptions,
    writer: SqliteSqlWriter,
}

impl SqliteStore {
    pub fn open(url: &str) -> Result<Self> {
        let options = SqliteOptions::parse(url)?;
        let connection =
            SqliteConnection::open(&options.path, options.mode.flags(), options.busy_timeout)?;
        Ok(Self {
            connection: Mutex::new(connection),
            holder: Mutex::new(None),
            options,
            writer: SqliteSqlWriter::default(),
        })
    }

    /// A private database living in memory until the store is dropped.
    pub fn open_in_memory() -> Result<Self> {
        Self::open("sqlite://:memory:")
    }

    pub fn options(&self) -> &SqliteOptions {
        &self.options
    }

    pub fn is_read_only(&self) -> bool {
        self.options.mode == SqliteMode::ReadOnly
    }

    fn holder(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.holder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits for the connection, failing instead of deadlocking when this thread already holds it.
    fn lock(&self) -> Result<MutexGuard<'_, SqliteConnection>> {
        let current = thread::current().id();
        if *self.holder() == Some(current) {
            return Err(Error::msg(
                "The sqlite connection is already held by this thread, \
                 use the handle or session that holds it instead",
            ));
        }
        let connection = self.connection.lock().unwrap_or_else(|e| {
            log::warn!("A worker panicked while holding the sqlite connection");
            PoisonError::into_inner(e)
        });
        *self.holder() = Some(current);
        Ok(connection)
    }
}

impl Store for SqliteStore {
    type Handle<'s> = SqliteHandle<'s>;

    fn sql_writer(&self) -> &dyn SqlWriter {
        &self.writer
    }

    fn readable(&self) -> Result<SqliteHandle<'_>> {
        Ok(SqliteHandle {
            connection: self.lock()?,
            holder: &self.holder,
            writer: &self.writer,
        })
    }

    fn writable(&self) -> Result<SqliteHandle<'_>> {
        if self.is_read_only() {
            return Err(Error::msg(format!(
                "The sqlite database `{}` is opened read only",
                self.options.path
            )));
        }
        self.readable()
    }
}

/// Exclusive access to the connection of a [`SqliteStore`].
pub struct SqliteHandle<'s> {
    connection: MutexGuard<'s, SqliteConnection>,
    holder: &'s Mutex<Option<ThreadId>>,
    writer: &'s SqliteSqlWriter,
}

impl Drop for SqliteHandle<'_> {
    fn drop(&mut self) {
        // Cleared while the connection guard is still held
        *self.holder.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl<'s> StoreHandle for SqliteHandle<'s> {
    type Cursor<'h>
        = SqliteCursor<'h>
    where
        Self: 'h;

    fn sql_writer(&self) -> &dyn SqlWriter {
        self.writer
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        self.connection.execute(sql)
    }

    fn execute_with(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        self.connection.execute_with(sql, params)
    }

    fn raw_query(&mut self, sql: &str, params: &[Value]) -> Result<SqliteCursor<'_>> {
        self.connection.query(sql, params)
    }

    fn last_insert_id(&self) -> i64 {
        self.connection.last_insert_rowid()
    }
}
