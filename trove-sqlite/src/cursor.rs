use crate::{
    SqliteConnection, SqlitePrepared,
    extract::{extract_name, extract_value},
};
use libsqlite3_sys::{SQLITE_DONE, SQLITE_ROW, sqlite3_column_count, sqlite3_step};
use trove_core::{Result, RowLabeled, RowNames};

/// Rows of a running query, stepped one at a time.
///
/// Borrows the connection, no other statement can run until it is dropped.
pub struct SqliteCursor<'c> {
    connection: &'c SqliteConnection,
    prepared: SqlitePrepared,
    names: RowNames,
    done: bool,
}

impl<'c> SqliteCursor<'c> {
    pub(crate) fn new(
        connection: &'c mut SqliteConnection,
        prepared: SqlitePrepared,
    ) -> Result<Self> {
        let count = unsafe { sqlite3_column_count(*prepared.statement) };
        let names = (0..count)
            .map(|i| extract_name(*prepared.statement, i))
            .collect::<Result<RowNames>>()?;
        Ok(Self {
            connection,
            prepared,
            names,
            done: false,
        })
    }

    pub fn names(&self) -> &RowNames {
        &self.names
    }
}

impl<'c> Iterator for SqliteCursor<'c> {
    type Item = Result<RowLabeled>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let statement = *self.prepared.statement;
        match unsafe { sqlite3_step(statement) } {
            SQLITE_ROW => Some(
                (0..self.names.len() as i32)
                    .map(|i| extract_value(statement, i))
                    .collect::<Result<Box<[_]>>>()
                    .map(|values| RowLabeled::new(self.names.clone(), values)),
            ),
            SQLITE_DONE => {
                self.done = true;
                None
            }
            _ => {
                self.done = true;
                let error = self.connection.last_error();
                log::error!("{:#}", error);
                Some(Err(error))
            }
        }
    }
}
