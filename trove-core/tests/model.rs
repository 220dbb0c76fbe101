#[cfg(test)]
mod tests {
    use indoc::indoc;
    use trove_core::{
        AsValue, ColumnMap, DescriptorBuilder, Error, FieldDescriptor, FieldScope,
        GenericSqlWriter, Model, OrmError, Result, RowLabeled, SqlWriter, Value, ValueKind,
        create_table_statements, from_row, from_row_column, from_row_column_as, to_insert_row,
        to_row, to_storage_row,
    };

    #[derive(Default, Debug, Clone, PartialEq)]
    struct Customer {
        id: i64,
        name: String,
        email: Option<String>,
        score: f64,
        session: String,
    }

    impl Model for Customer {
        const TABLE: &'static str = "customer";

        fn register(builder: &mut DescriptorBuilder) {
            builder
                .field(FieldDescriptor::new("id", ValueKind::Long).primary_key(true))
                .field(
                    FieldDescriptor::new("name", ValueKind::Text)
                        .not_null()
                        .unique("identity"),
                )
                .field(FieldDescriptor::new("email", ValueKind::TextOpt).unique("identity"))
                .field(FieldDescriptor::new("score", ValueKind::Double).default_value("0"))
                .field(FieldDescriptor::new("session", ValueKind::Text).private());
        }

        fn instantiate() -> Result<Self> {
            Ok(Self::default())
        }

        fn field(&self, name: &str) -> Option<Value> {
            Some(match name {
                "id" => self.id.as_value(),
                "name" => self.name.as_value(),
                "email" => self.email.as_value(),
                "score" => self.score.as_value(),
                "session" => self.session.as_value(),
                _ => return None,
            })
        }

        fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
            match name {
                "id" => self.id = AsValue::try_from_value(value)?,
                "name" => self.name = AsValue::try_from_value(value)?,
                "email" => self.email = AsValue::try_from_value(value)?,
                "score" => {
                    let score: f64 = AsValue::try_from_value(value)?;
                    if score < 0.0 {
                        return Err(Error::msg("The score cannot be negative"));
                    }
                    self.score = score;
                }
                "session" => self.session = AsValue::try_from_value(value)?,
                _ => {
                    return Err(OrmError::NoSuchField {
                        model: "Customer".into(),
                        field: name.into(),
                    }
                    .into());
                }
            }
            Ok(())
        }
    }

    /// Embedded into [`Invoice`].
    #[derive(Default, Debug, Clone, PartialEq)]
    struct Audit {
        id: String,
        created_at: i64,
    }

    impl Model for Audit {
        const TABLE: &'static str = "audit";

        fn register(builder: &mut DescriptorBuilder) {
            builder
                .field(FieldDescriptor::new("id", ValueKind::Text))
                .field(FieldDescriptor::new("created_at", ValueKind::Long).not_null());
        }

        fn instantiate() -> Result<Self> {
            Ok(Self::default())
        }

        fn field(&self, name: &str) -> Option<Value> {
            Some(match name {
                "id" => self.id.as_value(),
                "created_at" => self.created_at.as_value(),
                _ => return None,
            })
        }

        fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
            match name {
                "id" => self.id = AsValue::try_from_value(value)?,
                "created_at" => self.created_at = AsValue::try_from_value(value)?,
                _ => return Err(Error::msg(format!("No field `{}`", name))),
            }
            Ok(())
        }
    }

    #[derive(Default, Debug, Clone, PartialEq)]
    struct Invoice {
        id: i32,
        total: f32,
        audit: Audit,
    }

    impl Model for Invoice {
        const TABLE: &'static str = "invoice";

        fn register(builder: &mut DescriptorBuilder) {
            builder
                .field(FieldDescriptor::new("id", ValueKind::Int).primary_key(false))
                .field(FieldDescriptor::new("total", ValueKind::Float))
                .inherit::<Audit>();
        }

        fn instantiate() -> Result<Self> {
            Ok(Self::default())
        }

        fn field(&self, name: &str) -> Option<Value> {
            Some(match name {
                "id" => self.id.as_value(),
                "total" => self.total.as_value(),
                _ => return self.audit.field(name),
            })
        }

        fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
            match name {
                "id" => self.id = AsValue::try_from_value(value)?,
                "total" => self.total = AsValue::try_from_value(value)?,
                _ => return self.audit.set_field(name, value),
            }
            Ok(())
        }
    }

    fn customer() -> Customer {
        Customer {
            id: 0,
            name: "O'Brien".into(),
            email: None,
            score: 4.5,
            session: "s3cr3t".into(),
        }
    }

    #[test]
    fn descriptor() {
        let descriptor = Customer::describe().expect("Customer should be a valid model");
        assert_eq!(descriptor.model(), "Customer");
        assert_eq!(descriptor.table(), "customer");
        assert_eq!(
            descriptor
                .fields(FieldScope::All)
                .map(|v| v.name)
                .collect::<Vec<_>>(),
            ["id", "name", "email", "score", "session"]
        );
        assert_eq!(
            descriptor
                .fields(FieldScope::Storage)
                .map(|v| v.name)
                .collect::<Vec<_>>(),
            ["id", "name", "email", "score"]
        );
        let pk = descriptor.primary_key().expect("Customer has a primary key");
        assert_eq!(pk.name, "id");
        assert!(pk.is_passive());
        assert!(descriptor.field("session").unwrap().is_private());
        assert_eq!(descriptor.field("email").unwrap().kind, ValueKind::TextOpt);
        assert!(descriptor.field("missing").is_none());
        assert_eq!(descriptor.unique_groups().len(), 1);
        assert_eq!(descriptor.unique_groups()[0].name, "identity");
        assert_eq!(descriptor.unique_groups()[0].columns, ["name", "email"]);
        assert!(std::ptr::eq(descriptor, Customer::describe().unwrap()));
    }

    #[test]
    fn inherited_fields() {
        let descriptor = Invoice::describe().expect("Invoice should be a valid model");
        // The own `id` shadows the one of the parent
        assert_eq!(
            descriptor
                .fields(FieldScope::All)
                .map(|v| (v.name, v.kind))
                .collect::<Vec<_>>(),
            [
                ("id", ValueKind::Int),
                ("total", ValueKind::Float),
                ("created_at", ValueKind::Long)
            ]
        );
        assert!(!descriptor.primary_key().unwrap().is_passive());

        let invoice = Invoice {
            id: 7,
            total: 99.5,
            audit: Audit {
                id: "ignored".into(),
                created_at: 1_700_000_000,
            },
        };
        let row = to_row(&invoice).unwrap();
        assert_eq!(
            row,
            ColumnMap::from_iter([
                ("id", Value::Integer(7)),
                ("total", Value::Real(99.5)),
                ("created_at", Value::Integer(1_700_000_000)),
            ])
        );
        let read = from_row::<Invoice>(&row.into()).unwrap();
        assert_eq!(read.id, 7);
        assert_eq!(read.total, 99.5);
        assert_eq!(read.audit.created_at, 1_700_000_000);
        assert_eq!(read.audit.id, "");
    }

    #[test]
    fn schema_failures() {
        let schema_error = |builder: DescriptorBuilder| -> String {
            let error = builder.build().expect_err("The descriptor should be refused");
            match OrmError::of(&error) {
                Some(OrmError::Schema { reason, .. }) => reason.clone(),
                _ => panic!("Expected a schema error, got: {:#}", error),
            }
        };

        let builder = DescriptorBuilder::new("Empty", "empty");
        assert!(schema_error(builder).contains("no accessible persisted fields"));

        let mut builder = DescriptorBuilder::new("Hidden", "hidden");
        builder.field(FieldDescriptor::new("secret", ValueKind::Text).private());
        assert!(schema_error(builder).contains("no accessible persisted fields"));

        let mut builder = DescriptorBuilder::new("Nameless", "");
        builder.field(FieldDescriptor::new("a", ValueKind::Text));
        assert!(schema_error(builder).contains("table name is empty"));

        let mut builder = DescriptorBuilder::new("TwoKeys", "two_keys");
        builder
            .field(FieldDescriptor::new("a", ValueKind::Long).primary_key(false))
            .field(FieldDescriptor::new("b", ValueKind::Long).primary_key(false));
        assert!(schema_error(builder).contains("both `a` and `b`"));

        let mut builder = DescriptorBuilder::new("TextCounter", "text_counter");
        builder.field(FieldDescriptor::new("a", ValueKind::Text).primary_key(true));
        assert!(schema_error(builder).contains("not an integer"));

        let mut builder = DescriptorBuilder::new("LooseCounter", "loose_counter");
        let mut field = FieldDescriptor::new("a", ValueKind::Long);
        field.autoincrement = true;
        builder.field(field);
        assert!(schema_error(builder).contains("not the primary key"));

        let mut builder = DescriptorBuilder::new("HiddenKey", "hidden_key");
        builder
            .field(FieldDescriptor::new("a", ValueKind::Long).primary_key(false).private())
            .field(FieldDescriptor::new("b", ValueKind::Long));
        assert!(schema_error(builder).contains("private field"));

        let mut builder = DescriptorBuilder::new("Keyless", "keyless");
        builder
            .field(FieldDescriptor::new("a", ValueKind::Text))
            .field(FieldDescriptor::new("a", ValueKind::Long));
        let descriptor = builder.build().expect("A model without key is valid");
        assert_eq!(descriptor.field("a").unwrap().kind, ValueKind::Text);
        let error = descriptor.require_primary_key().unwrap_err();
        assert!(matches!(
            OrmError::of(&error),
            Some(OrmError::NoPrimaryKey { model }) if model == "Keyless"
        ));
    }

    #[test]
    fn table_name_collision() {
        macro_rules! shared_table_model {
            ($name:ident, $table:literal) => {
                #[derive(Default)]
                struct $name {
                    value: i64,
                }
                impl Model for $name {
                    const TABLE: &'static str = $table;
                    fn register(builder: &mut DescriptorBuilder) {
                        builder.field(FieldDescriptor::new("value", ValueKind::Long));
                    }
                    fn instantiate() -> Result<Self> {
                        Ok(Self::default())
                    }
                    fn field(&self, name: &str) -> Option<Value> {
                        (name == "value").then(|| self.value.as_value())
                    }
                    fn set_field(&mut self, _name: &str, value: Value) -> Result<()> {
                        self.value = AsValue::try_from_value(value)?;
                        Ok(())
                    }
                }
            };
        }
        shared_table_model!(First, "shared");
        shared_table_model!(Second, "shared");
        shared_table_model!(Third, "Shared");

        First::describe().expect("The first model claims the table");
        let error = Second::describe().expect_err("The table is taken");
        assert!(matches!(
            OrmError::of(&error),
            Some(OrmError::TableNameCollision { table, .. }) if table == "shared"
        ));
        let error = Third::describe().expect_err("Table names differing in case collide");
        assert!(matches!(
            OrmError::of(&error),
            Some(OrmError::TableNameCollision { table, existing, .. })
                if table == "Shared" && existing.ends_with("First")
        ));
        assert!(First::describe().is_ok());
    }

    #[test]
    fn marshal() {
        let mut value = customer();
        let row = to_row(&value).unwrap();
        assert_eq!(row.len(), 5);
        assert_eq!(row.get("session"), Some(&Value::Text("s3cr3t".into())));

        let row = to_storage_row(&value).unwrap();
        assert_eq!(
            row.columns().collect::<Vec<_>>(),
            ["id", "name", "email", "score"]
        );
        assert_eq!(row.get("email"), Some(&Value::Null));

        let row = to_insert_row(&value).unwrap();
        assert_eq!(row.columns().collect::<Vec<_>>(), ["name", "email", "score"]);
        value.id = 12;
        let row = to_insert_row(&value).unwrap();
        assert_eq!(row.get("id"), Some(&Value::Integer(12)));

        // Private fields round trip in memory
        let read = from_row::<Customer>(&to_row(&value).unwrap().into()).unwrap();
        assert_eq!(read, value);
    }

    #[test]
    fn unmarshal() {
        let row: RowLabeled = ColumnMap::from_iter([
            ("id", Value::Text("12".into())),
            ("name", Value::Text("Ada".into())),
            ("unknown", Value::Integer(1)),
        ])
        .into();
        let read = from_row::<Customer>(&row).unwrap();
        assert_eq!(
            read,
            Customer {
                id: 12,
                name: "Ada".into(),
                ..Default::default()
            }
        );

        let row: RowLabeled = ColumnMap::from_iter([("name", Value::Null)]).into();
        let error = from_row::<Customer>(&row).unwrap_err();
        assert!(matches!(
            OrmError::of(&error),
            Some(OrmError::NullConstraintViolation { column }) if column == "name"
        ));

        let row: RowLabeled = ColumnMap::from_iter([("id", Value::Text("twelve".into()))]).into();
        let error = from_row::<Customer>(&row).unwrap_err();
        assert!(matches!(
            OrmError::of(&error),
            Some(OrmError::TypeMismatch { column, expected: ValueKind::Long, .. }) if column == "id"
        ));

        let row: RowLabeled = ColumnMap::from_iter([("score", Value::Real(-1.0))]).into();
        let error = from_row::<Customer>(&row).unwrap_err();
        assert!(matches!(
            OrmError::of(&error),
            Some(OrmError::FieldAccess { field, .. }) if field == "score"
        ));
        assert!(format!("{:#}", error).contains("The score cannot be negative"));
    }

    #[test]
    fn row_columns() {
        let row: RowLabeled = ColumnMap::from_iter([
            ("count", Value::Text("3".into())),
            ("label", Value::Null),
        ])
        .into();
        assert_eq!(row.column_index("label"), Some(1));
        assert_eq!(
            from_row_column(ValueKind::Int, &row, 0).unwrap(),
            Value::Integer(3)
        );
        assert_eq!(from_row_column_as::<i64>(&row, 0).unwrap(), 3);
        assert_eq!(from_row_column_as::<Option<String>>(&row, 1).unwrap(), None);
        assert!(from_row_column_as::<String>(&row, 1).is_err());
        let error = from_row_column_as::<i64>(&row, 2).unwrap_err();
        assert!(matches!(
            OrmError::of(&error),
            Some(OrmError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn create_table() {
        let writer = GenericSqlWriter::new();
        let descriptor = Customer::describe().unwrap();
        let statements = create_table_statements(&writer, descriptor, false);
        assert_eq!(
            statements,
            [
                indoc! {r#"
                    CREATE TABLE "customer" (
                    "id" INTEGER PRIMARY KEY AUTOINCREMENT,
                    "name" TEXT NOT NULL,
                    "email" TEXT,
                    "score" REAL DEFAULT '0'
                    );"#},
                r#"CREATE UNIQUE INDEX "customer_unique_index_identity" ON "customer" ("name", "email");"#,
            ]
        );
        let statements = create_table_statements(&writer, Invoice::describe().unwrap(), true);
        assert_eq!(
            statements,
            [indoc! {r#"
                CREATE TABLE IF NOT EXISTS "invoice" (
                "id" INTEGER PRIMARY KEY,
                "total" REAL,
                "created_at" INTEGER NOT NULL
                );"#}]
        );

        let mut out = String::new();
        writer.write_drop_table(&mut out, "customer");
        assert_eq!(out, r#"DROP TABLE IF EXISTS "customer";"#);
    }

    #[test]
    fn statements() {
        let writer = GenericSqlWriter::new();
        let mut out = String::new();
        writer.write_select(&mut out, "customer", "  ");
        assert_eq!(out, r#"SELECT * FROM "customer";"#);

        let mut out = String::new();
        writer.write_select(&mut out, "customer", " score > ? ");
        assert_eq!(out, r#"SELECT * FROM "customer" WHERE score > ?;"#);

        let mut out = String::new();
        writer.write_count(&mut out, "customer", "name = ?");
        assert_eq!(out, r#"SELECT COUNT(*) FROM "customer" WHERE name = ?;"#);

        let mut out = String::new();
        writer.write_insert(&mut out, "customer", &["name", "score"], Default::default());
        assert_eq!(out, r#"INSERT INTO "customer" ("name", "score") VALUES (?, ?);"#);

        let mut out = String::new();
        writer.write_insert(&mut out, "customer", &[], trove_core::Conflict::Replace);
        assert_eq!(out, r#"REPLACE INTO "customer" DEFAULT VALUES;"#);

        let mut out = String::new();
        writer.write_update(&mut out, "customer", &["name", "score"], "\"id\" = ?");
        assert_eq!(
            out,
            r#"UPDATE "customer" SET "name" = ?, "score" = ? WHERE "id" = ?;"#
        );

        let mut out = String::new();
        writer.write_identifier_quoted(&mut out, r#"odd"name"#);
        writer.write_value_string(&mut out, "it's");
        assert_eq!(out, r#""odd""name"'it''s'"#);

        let mut out = String::new();
        writer.write_table_placeholder(
            &mut out,
            "SELECT a FROM {:table} JOIN {:TABLE} x WHERE b = '{:Table}'",
            "customer",
        );
        assert_eq!(
            out,
            "SELECT a FROM customer JOIN customer x WHERE b = 'customer'"
        );

        let mut out = String::new();
        writer.write_transaction_begin(&mut out);
        writer.write_transaction_commit(&mut out);
        writer.write_transaction_rollback(&mut out);
        assert_eq!(out, "BEGIN;COMMIT;ROLLBACK;");
    }
}
