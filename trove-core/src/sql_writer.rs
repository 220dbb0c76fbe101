use crate::{ColumnType, FieldDescriptor, FieldScope, ModelDescriptor, UniqueGroup, separated_by};

/// Conflict policy of an insert.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    /// Fail on a unique or primary key violation.
    #[default]
    Abort,
    /// Delete the conflicting row, then insert.
    Replace,
}

/// Renders the statements the engine runs. Values are never inlined, every
/// statement uses `?` placeholders for them.
pub trait SqlWriter: Send + Sync {
    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    fn write_identifier_quoted(&self, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(out, value, '"', r#""""#);
        out.push('"');
    }

    fn write_value_string(&self, out: &mut String, value: &str) {
        out.push('\'');
        self.write_escaped(out, value, '\'', "''");
        out.push('\'');
    }

    fn write_column_type(&self, out: &mut String, value: ColumnType) {
        out.push_str(value.sql_name());
    }

    fn write_create_table(
        &self,
        out: &mut String,
        descriptor: &ModelDescriptor,
        if_not_exists: bool,
    ) {
        out.push_str("CREATE TABLE ");
        if if_not_exists {
            out.push_str("IF NOT EXISTS ");
        }
        self.write_identifier_quoted(out, descriptor.table());
        out.push_str(" (\n");
        separated_by(
            out,
            descriptor.fields(FieldScope::Storage),
            |out, v| self.write_create_table_column_fragment(out, v),
            ",\n",
        );
        out.push_str("\n);");
    }

    fn write_create_table_column_fragment(&self, out: &mut String, field: &FieldDescriptor) {
        self.write_identifier_quoted(out, field.name);
        out.push(' ');
        self.write_column_type(out, field.column_type());
        if field.primary_key {
            out.push_str(" PRIMARY KEY");
            if field.autoincrement {
                out.push_str(" AUTOINCREMENT");
            }
        }
        if let Some(default) = &field.default {
            out.push_str(" DEFAULT ");
            self.write_value_string(out, default);
        }
        if field.not_null {
            out.push_str(" NOT NULL");
        }
    }

    fn write_create_unique_index(
        &self,
        out: &mut String,
        descriptor: &ModelDescriptor,
        group: &UniqueGroup,
        if_not_exists: bool,
    ) {
        out.push_str("CREATE UNIQUE INDEX ");
        if if_not_exists {
            out.push_str("IF NOT EXISTS ");
        }
        self.write_identifier_quoted(
            out,
            &format!("{}_unique_index_{}", descriptor.table(), group.name),
        );
        out.push_str(" ON ");
        self.write_identifier_quoted(out, descriptor.table());
        out.push_str(" (");
        separated_by(
            out,
            &group.columns,
            |out, v| self.write_identifier_quoted(out, v),
            ", ",
        );
        out.push_str(");");
    }

    fn write_drop_table(&self, out: &mut String, table: &str) {
        out.push_str("DROP TABLE IF EXISTS ");
        self.write_identifier_quoted(out, table);
        out.push(';');
    }

    fn write_where(&self, out: &mut String, criteria: &str) {
        let criteria = criteria.trim();
        if !criteria.is_empty() {
            out.push_str(" WHERE ");
            out.push_str(criteria);
        }
    }

    fn write_select(&self, out: &mut String, table: &str, criteria: &str) {
        out.push_str("SELECT * FROM ");
        self.write_identifier_quoted(out, table);
        self.write_where(out, criteria);
        out.push(';');
    }

    fn write_count(&self, out: &mut String, table: &str, criteria: &str) {
        out.push_str("SELECT COUNT(*) FROM ");
        self.write_identifier_quoted(out, table);
        self.write_where(out, criteria);
        out.push(';');
    }

    fn write_insert_prefix(&self, out: &mut String, conflict: Conflict) {
        out.push_str(match conflict {
            Conflict::Abort => "INSERT INTO ",
            Conflict::Replace => "REPLACE INTO ",
        });
    }

    fn write_insert(&self, out: &mut String, table: &str, columns: &[&str], conflict: Conflict) {
        self.write_insert_prefix(out, conflict);
        self.write_identifier_quoted(out, table);
        if columns.is_empty() {
            out.push_str(" DEFAULT VALUES;");
            return;
        }
        out.push_str(" (");
        separated_by(
            out,
            columns,
            |out, v| self.write_identifier_quoted(out, v),
            ", ",
        );
        out.push_str(") VALUES (");
        separated_by(out, columns, |out, _| out.push('?'), ", ");
        out.push_str(");");
    }

    fn write_update(&self, out: &mut String, table: &str, columns: &[&str], criteria: &str) {
        out.push_str("UPDATE ");
        self.write_identifier_quoted(out, table);
        out.push_str(" SET ");
        separated_by(
            out,
            columns,
            |out, v| {
                self.write_identifier_quoted(out, v);
                out.push_str(" = ?");
            },
            ", ",
        );
        self.write_where(out, criteria);
        out.push(';');
    }

    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("BEGIN;");
    }

    fn write_transaction_commit(&self, out: &mut String) {
        out.push_str("COMMIT;");
    }

    fn write_transaction_rollback(&self, out: &mut String) {
        out.push_str("ROLLBACK;");
    }

    /// Copy `sql` replacing every `{:table}` token (any letter case) with `table`.
    fn write_table_placeholder(&self, out: &mut String, sql: &str, table: &str) {
        const TOKEN: &[u8] = b"{:table}";
        let bytes = sql.as_bytes();
        let mut position = 0;
        let mut i = 0;
        while i + TOKEN.len() <= bytes.len() {
            if bytes[i..i + TOKEN.len()].eq_ignore_ascii_case(TOKEN) {
                out.push_str(&sql[position..i]);
                out.push_str(table);
                i += TOKEN.len();
                position = i;
            } else {
                i += 1;
            }
        }
        out.push_str(&sql[position..]);
    }
}

/// Table statement followed by one unique index per group, in declaration order.
pub fn create_table_statements(
    writer: &dyn SqlWriter,
    descriptor: &ModelDescriptor,
    if_not_exists: bool,
) -> Vec<String> {
    let mut result = Vec::with_capacity(1 + descriptor.unique_groups().len());
    let mut out = String::with_capacity(256);
    writer.write_create_table(&mut out, descriptor, if_not_exists);
    result.push(out);
    for group in descriptor.unique_groups() {
        let mut out = String::with_capacity(128);
        writer.write_create_unique_index(&mut out, descriptor, group, if_not_exists);
        result.push(out);
    }
    result
}

#[derive(Default, Debug, Clone, Copy)]
pub struct GenericSqlWriter;
impl GenericSqlWriter {
    pub fn new() -> Self {
        Self {}
    }
}
impl SqlWriter for GenericSqlWriter {}
