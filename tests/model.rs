#[cfg(test)]
mod tests {
    use indoc::indoc;
    use trove::{
        ColumnMap, FieldScope, GenericSqlWriter, Model, OrmError, Value, ValueKind,
        create_table_statements, from_row, to_insert_row, to_row, to_storage_row,
    };

    #[test]
    fn simple_model() {
        #[derive(Model, Default)]
        pub struct SomeModel {
            pub a: i16,
            pub b: String,
        }
        let descriptor = SomeModel::describe().unwrap();

        assert_eq!(SomeModel::TABLE, "SomeModel");
        assert_eq!(descriptor.model(), "SomeModel");

        let fields = descriptor.fields(FieldScope::All).collect::<Vec<_>>();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "a");
        assert_eq!(fields[0].kind, ValueKind::Short);
        assert!(!fields[0].not_null);
        assert_eq!(fields[1].name, "b");
        assert_eq!(fields[1].kind, ValueKind::Text);
        assert!(descriptor.primary_key().is_none());

        assert_eq!(
            create_table_statements(&GenericSqlWriter, descriptor, false),
            [indoc! {r#"
                CREATE TABLE "SomeModel" (
                "a" INTEGER,
                "b" TEXT
                );"#}]
        );
    }

    #[test]
    fn attributes() {
        #[derive(Model, Default, Debug, PartialEq)]
        #[trove(table = "accounts")]
        pub struct Account {
            #[trove(primary_key, autoincrement)]
            pub id: i64,
            #[trove(name = "user_name", not_null, unique)]
            pub name: String,
            #[trove(unique = "contact", unique = "reach")]
            pub email: Option<String>,
            #[trove(unique = "contact")]
            pub phone: Option<String>,
            #[trove(default = "free")]
            pub plan: String,
            #[trove(default = 10)]
            pub credits: i32,
            #[trove(default = true)]
            pub active: bool,
            pub avatar: Option<Vec<u8>>,
            pub initial: Option<char>,
            pub ratio: f32,
            #[trove(ignore)]
            pub cache: Vec<String>,
            password_hash: String,
        }
        let descriptor = Account::describe().unwrap();
        assert_eq!(descriptor.table(), "accounts");
        assert_eq!(
            descriptor
                .fields(FieldScope::All)
                .map(|v| (v.name, v.kind))
                .collect::<Vec<_>>(),
            [
                ("id", ValueKind::Long),
                ("user_name", ValueKind::Text),
                ("email", ValueKind::TextOpt),
                ("phone", ValueKind::TextOpt),
                ("plan", ValueKind::Text),
                ("credits", ValueKind::Int),
                ("active", ValueKind::Bool),
                ("avatar", ValueKind::BlobOpt),
                ("initial", ValueKind::CharOpt),
                ("ratio", ValueKind::Float),
                ("password_hash", ValueKind::Text),
            ]
        );
        assert!(descriptor.field("password_hash").unwrap().is_private());
        assert!(descriptor.field("cache").is_none());
        assert_eq!(
            descriptor
                .unique_groups()
                .iter()
                .map(|v| (v.name, v.columns.clone()))
                .collect::<Vec<_>>(),
            [
                ("default", vec!["user_name"]),
                ("contact", vec!["email", "phone"]),
                ("reach", vec!["email"]),
            ]
        );
        assert_eq!(
            create_table_statements(&GenericSqlWriter, descriptor, true),
            [
                indoc! {r#"
                    CREATE TABLE IF NOT EXISTS "accounts" (
                    "id" INTEGER PRIMARY KEY AUTOINCREMENT,
                    "user_name" TEXT NOT NULL,
                    "email" TEXT,
                    "phone" TEXT,
                    "plan" TEXT DEFAULT 'free',
                    "credits" INTEGER DEFAULT '10',
                    "active" BOOLEAN DEFAULT '1',
                    "avatar" BLOB,
                    "initial" TEXT,
                    "ratio" REAL
                    );"#},
                r#"CREATE UNIQUE INDEX IF NOT EXISTS "accounts_unique_index_default" ON "accounts" ("user_name");"#,
                r#"CREATE UNIQUE INDEX IF NOT EXISTS "accounts_unique_index_contact" ON "accounts" ("email", "phone");"#,
                r#"CREATE UNIQUE INDEX IF NOT EXISTS "accounts_unique_index_reach" ON "accounts" ("email");"#,
            ]
        );

        let account = Account {
            id: 0,
            name: "mara".into(),
            email: Some("mara@example.com".into()),
            phone: None,
            plan: "pro".into(),
            credits: 3,
            active: true,
            avatar: Some(vec![1, 2, 3]),
            initial: Some('m'),
            ratio: 0.5,
            cache: vec!["transient".into()],
            password_hash: "x1y2".into(),
        };
        let row = to_insert_row(&account).unwrap();
        assert_eq!(
            row,
            ColumnMap::from_iter([
                ("user_name", Value::Text("mara".into())),
                ("email", Value::Text("mara@example.com".into())),
                ("phone", Value::Null),
                ("plan", Value::Text("pro".into())),
                ("credits", Value::Integer(3)),
                ("active", Value::Boolean(true)),
                ("avatar", Value::Blob([1, 2, 3].into())),
                ("initial", Value::Text("m".into())),
                ("ratio", Value::Real(0.5)),
            ])
        );
        assert_eq!(to_storage_row(&account).unwrap().len(), 10);

        let read = from_row::<Account>(&to_row(&account).unwrap().into()).unwrap();
        assert_eq!(
            read,
            Account {
                cache: Vec::new(),
                ..account
            }
        );
    }

    #[test]
    fn field_access() {
        #[derive(Model, Default)]
        #[trove(table = "counters")]
        pub struct Counter {
            #[trove(primary_key)]
            pub key: String,
            pub hits: i64,
        }
        let mut counter = Counter::default();
        assert_eq!(counter.field("hits"), Some(Value::Integer(0)));
        assert_eq!(counter.field("missing"), None);
        counter.set_field("hits", Value::Integer(41)).unwrap();
        counter.set_field("key", "home".into()).unwrap();
        assert_eq!(counter.hits, 41);
        assert_eq!(counter.key, "home");
        let error = counter
            .set_field("missing", Value::Null)
            .expect_err("Unknown fields cannot be written");
        assert!(matches!(
            OrmError::of(&error),
            Some(OrmError::NoSuchField { model, field }) if model == "Counter" && field == "missing"
        ));
        assert!(!Counter::describe().unwrap().primary_key().unwrap().is_passive());
    }

    #[test]
    fn parent_model() {
        #[derive(Model, Default, Debug, Clone, PartialEq)]
        #[trove(table = "timestamps")]
        pub struct Timestamps {
            pub created_at: i64,
            pub updated_at: Option<i64>,
            pub id: String,
        }

        #[derive(Model, Default, Debug, Clone, PartialEq)]
        #[trove(table = "posts")]
        pub struct Post {
            #[trove(primary_key, autoincrement)]
            pub id: i64,
            pub title: String,
            #[trove(parent)]
            pub timestamps: Timestamps,
        }

        let descriptor = Post::describe().unwrap();
        assert_eq!(
            descriptor
                .fields(FieldScope::All)
                .map(|v| v.name)
                .collect::<Vec<_>>(),
            ["id", "title", "created_at", "updated_at"]
        );
        let post = Post {
            id: 3,
            title: "Hello".into(),
            timestamps: Timestamps {
                created_at: 100,
                updated_at: Some(200),
                id: "shadowed".into(),
            },
        };
        let row = to_row(&post).unwrap();
        assert_eq!(row.get("id"), Some(&Value::Integer(3)));
        assert_eq!(row.get("updated_at"), Some(&Value::Integer(200)));
        let read = from_row::<Post>(&row.into()).unwrap();
        assert_eq!(read.id, 3);
        assert_eq!(read.timestamps.created_at, 100);
        assert_eq!(read.timestamps.updated_at, Some(200));
        assert_eq!(read.timestamps.id, "");
        assert_eq!(
            create_table_statements(&GenericSqlWriter, descriptor, false),
            [indoc! {r#"
                CREATE TABLE "posts" (
                "id" INTEGER PRIMARY KEY AUTOINCREMENT,
                "title" TEXT,
                "created_at" INTEGER,
                "updated_at" INTEGER
                );"#}]
        );
    }

    #[test]
    fn raw_identifiers() {
        #[derive(Model, Default)]
        #[trove(table = "items")]
        pub struct Item {
            pub r#type: String,
            #[trove(name = "order")]
            pub position: i32,
        }
        let descriptor = Item::describe().unwrap();
        assert_eq!(
            descriptor
                .fields(FieldScope::Storage)
                .map(|v| v.name)
                .collect::<Vec<_>>(),
            ["type", "order"]
        );
        let item = Item {
            r#type: "tool".into(),
            position: 2,
        };
        assert_eq!(item.field("type"), Some(Value::Text("tool".into())));
        assert_eq!(item.field("order"), Some(Value::Integer(2)));
    }
}
