use trove_core::{Conflict, SqlWriter};

/// SQL dialect of sqlite.
#[derive(Default, Debug, Clone, Copy)]
pub struct SqliteSqlWriter {}

impl SqlWriter for SqliteSqlWriter {
    fn write_insert_prefix(&self, out: &mut String, conflict: Conflict) {
        out.push_str(match conflict {
            Conflict::Abort => "INSERT INTO ",
            Conflict::Replace => "INSERT OR REPLACE INTO ",
        });
    }

    fn write_transaction_begin(&self, out: &mut String) {
        // Takes the write lock upfront, a deferred transaction could fail to upgrade later
        out.push_str("BEGIN IMMEDIATE;");
    }
}
