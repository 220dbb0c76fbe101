#[cfg(test)]
mod tests {
    use std::{path::Path, sync::Mutex};
    use tokio::fs;
    use trove::{Database, Model, Store, Value};
    use trove_sqlite::{SqliteMode, SqliteOptions, SqliteStore};
    use trove_tests::{init_logs, silent_logs};

    static MUTEX: Mutex<()> = Mutex::new(());

    #[derive(Model, Default)]
    #[trove(table = "setting")]
    pub struct Setting {
        #[trove(primary_key)]
        pub key: String,
        pub value: Option<String>,
    }

    #[derive(Model, Default)]
    #[trove(table = "reading")]
    pub struct Reading {
        #[trove(primary_key)]
        pub id: i64,
        #[trove(unique = "sample")]
        pub sensor: String,
        #[trove(unique = "sample")]
        pub taken_at: i64,
        #[trove(unique)]
        pub label: String,
    }

    #[test]
    fn parse_options() {
        let options = SqliteOptions::parse("sqlite://data/app.sqlite").unwrap();
        assert_eq!(
            options,
            SqliteOptions {
                path: "data/app.sqlite".into(),
                mode: SqliteMode::ReadWriteCreate,
                busy_timeout: 5000,
            }
        );
        let options =
            SqliteOptions::parse("sqlite:///tmp/my%20file.db?mode=ro&busy_timeout=250").unwrap();
        assert_eq!(options.path, "/tmp/my file.db");
        assert_eq!(options.mode, SqliteMode::ReadOnly);
        assert_eq!(options.busy_timeout, 250);
        assert_eq!(
            SqliteOptions::parse("sqlite://:memory:?mode=memory")
                .unwrap()
                .mode,
            SqliteMode::Memory
        );
        assert_eq!(
            SqliteOptions::parse("sqlite://a.db?mode=rw").unwrap().mode,
            SqliteMode::ReadWrite
        );
        silent_logs! {
            assert_eq!(
                SqliteOptions::parse("sqlite://a.db?journal=wal").unwrap().path,
                "a.db"
            );
        }
    }

    #[test]
    fn wrong_url() {
        silent_logs! {
            assert!(SqliteStore::open("duckdb://some_value").is_err());
            assert!(SqliteStore::open("sqlite://").is_err());
            assert!(SqliteStore::open("sqlite://a.db?mode=write").is_err());
            assert!(SqliteStore::open("sqlite://a.db?busy_timeout=soon").is_err());
        }
    }

    #[tokio::test]
    async fn create_database() {
        init_logs();
        const DB_PATH: &'static str = "../target/debug/creation.sqlite";
        let _guard = MUTEX.lock().unwrap();
        if Path::new(DB_PATH).exists() {
            fs::remove_file(DB_PATH)
                .await
                .expect(format!("Failed to remove test database file {}", DB_PATH).as_str());
        }
        assert!(
            !Path::new(DB_PATH).exists(),
            "Database file should not exist before test"
        );
        {
            let database = Database::new(
                SqliteStore::open(&format!("sqlite://{}?mode=rwc", DB_PATH))
                    .expect("Could not open the database"),
            );
            assert!(
                Path::new(DB_PATH).exists(),
                "Database file should be created when the store is opened"
            );
            database
                .create_table::<Setting>(false)
                .expect("Failed to create the Setting table");
            database
                .insert_or_throw(&Setting {
                    key: "theme".into(),
                    value: Some("dark".into()),
                })
                .expect("Failed to insert a setting");
        }
        {
            let store = SqliteStore::open(&format!("sqlite://{}?mode=ro", DB_PATH))
                .expect("Could not open the database");
            assert!(store.is_read_only());
            assert!(store.writable().is_err(), "A read only store is not writable");
            let database = Database::new(store);
            assert_eq!(
                database
                    .query_string("SELECT value FROM \"setting\" WHERE key = 'theme'", &[])
                    .expect("Failed to read the setting"),
                Some("dark".to_string())
            );
            silent_logs! {
                assert!(
                    database
                        .insert(&Setting {
                            key: "font".into(),
                            value: None,
                        })
                        .is_none()
                );
            }
        }
        fs::remove_file(DB_PATH)
            .await
            .expect(format!("Failed to remove existing test database file {}", DB_PATH).as_str());
        assert!(
            SqliteStore::open(&format!("sqlite://{}?mode=ro", DB_PATH)).is_err(),
            "Should not be able to open in read only a missing database"
        );
        assert!(
            SqliteStore::open(&format!("sqlite://{}?mode=rw", DB_PATH)).is_err(),
            "Should not be able to open in read write a missing database"
        );
    }

    #[test]
    fn statements() {
        let store = SqliteStore::open_in_memory().expect("Could not open the database");
        let database = Database::new(store);
        database
            .execute(
                "CREATE TABLE t (a INTEGER, b TEXT);
                -- a comment between statements
                INSERT INTO t VALUES (1, 'x');
                INSERT INTO t VALUES (2, 'y');",
            )
            .expect("Failed to execute a multi statement script");
        assert_eq!(database.query_long("SELECT SUM(a) FROM t", &[]).unwrap(), Some(3));
        let error = database
            .query_long("SELECT a FROM t; SELECT b FROM t", &[])
            .expect_err("Queries take a single statement");
        assert!(format!("{:#}", error).contains("more than one statement"));
        let error = database
            .query_long("SELECT a FROM t WHERE a = ?", &[])
            .expect_err("Every placeholder must be bound");
        assert!(format!("{:#}", error).contains("expects 1 parameters"));
        assert!(database.execute("SELECT FROM WHERE").is_err());
    }

    #[test]
    fn held_connection() {
        let store = SqliteStore::open_in_memory().expect("Could not open the database");
        {
            let handle = store.readable().expect("Could not get a handle");
            let error = store
                .writable()
                .err()
                .expect("The same thread cannot wait on the connection it holds");
            assert!(format!("{:#}", error).contains("already held by this thread"));
            std::thread::scope(|scope| {
                let other = scope.spawn(|| {
                    store.readable().map(|_| ()).expect("Another thread waits its turn")
                });
                drop(handle);
                other.join().expect("The other thread panicked");
            });
        }
        assert!(store.writable().is_ok(), "Released once the handle is dropped");
    }

    #[test]
    fn drop_table_removes_indexes() {
        let database =
            Database::new(SqliteStore::open_in_memory().expect("Could not open the database"));
        let schema = |database: &Database<SqliteStore>| {
            database
                .query_column::<String>(
                    "SELECT name FROM sqlite_master WHERE tbl_name = ? ORDER BY name",
                    &[Value::Text("reading".into())],
                )
                .expect("Failed to read the schema")
        };
        assert!(schema(&database).is_empty());
        database
            .create_table::<Reading>(false)
            .expect("Failed to create the Reading table");
        let created = schema(&database);
        assert!(
            created.contains(&"reading".to_string())
                && created.contains(&"reading_unique_index_sample".to_string()),
            "Expected the table and its unique index, got: {:?}",
            created
        );
        assert!(created.len() >= 3, "The unique label is indexed too: {:?}", created);
        database
            .drop_table::<Reading>()
            .expect("Failed to drop the Reading table");
        assert_eq!(schema(&database), Vec::<String>::new());
        database
            .create_table::<Reading>(false)
            .expect("Recreating the table must not collide with a leftover index");
    }
}
