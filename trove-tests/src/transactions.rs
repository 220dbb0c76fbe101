use crate::silent_logs;
use trove::{
    Database, Error, Model, Selection, Store, StoreHandle, Transaction, Value, to_insert_row,
};

#[derive(Model, Default, Debug, Clone, PartialEq)]
#[trove(table = "account")]
pub struct Account {
    #[trove(primary_key, autoincrement)]
    pub id: i64,
    #[trove(unique)]
    pub owner: String,
    pub balance: i64,
}

impl Account {
    fn new(owner: &str, balance: i64) -> Self {
        Self {
            id: 0,
            owner: owner.into(),
            balance,
        }
    }
}

fn balance<S: Store>(database: &Database<S>, owner: &str) -> Option<i64> {
    database
        .query_long(
            "SELECT balance FROM \"account\" WHERE owner = ?",
            &[Value::Text(owner.into())],
        )
        .expect("Failed to query the balance")
}

pub fn transactions<S: Store>(database: &Database<S>) {
    database
        .drop_table::<Account>()
        .expect("Failed to drop the Account table");
    database
        .create_table::<Account>(false)
        .expect("Failed to create the Account table");

    // Committed
    let ids = database
        .in_transaction(|transaction| {
            let first = transaction.insert_or_throw(&Account::new("ann", 100))?;
            let second = transaction.insert_or_throw(&Account::new("bob", 20))?;
            Ok((first, second))
        })
        .expect("The transaction should commit");
    assert_ne!(ids.0, ids.1);
    assert_eq!(database.get_count::<Account>(()).unwrap(), 2);

    // A failing body rolls everything back
    silent_logs! {
        let result = database.in_transaction(|transaction| {
            transaction.update(&Account {
                id: ids.0,
                owner: "ann".into(),
                balance: 70,
            })?;
            transaction.insert_or_throw(&Account::new("bob", 0))?;
            Ok(())
        });
        assert!(result.is_err(), "The duplicated owner must fail the transaction");
    }
    assert_eq!(balance(database, "ann"), Some(100));

    let result = database.in_transaction(|_| -> Result<(), Error> {
        Err(Error::msg("The transfer was refused"))
    });
    assert_eq!(
        result.map_err(|e| e.to_string()),
        Err("The transfer was refused".to_string())
    );

    // Rows read inside the transaction see its own writes
    let inside = database
        .in_transaction(|transaction| {
            transaction
                .execute("UPDATE \"account\" SET balance = balance - 30 WHERE owner = 'ann';")?;
            transaction
                .execute("UPDATE \"account\" SET balance = balance + 30 WHERE owner = 'bob';")?;
            transaction.query_raw_sql::<Account>("SELECT * FROM {:table} ORDER BY owner", &[])
        })
        .expect("The transfer should commit");
    assert_eq!(
        inside.iter().map(|v| v.balance).collect::<Vec<_>>(),
        [70, 50]
    );
    assert_eq!(balance(database, "ann"), Some(70));
    assert_eq!(balance(database, "bob"), Some(50));

    // Reads and writes composed on the session
    let moved = database
        .in_transaction(|transaction| {
            let before = transaction.get_count::<Account>(Selection::new("balance > ?").bind(50))?;
            let mut ann = transaction
                .query_row::<Account>(Selection::new("owner = ?").bind("ann"))?
                .ok_or_else(|| Error::msg("ann is missing"))?;
            ann.balance -= 20;
            transaction.update(&ann)?;
            let after = transaction.get_count::<Account>(Selection::new("balance > ?").bind(50))?;
            Ok(before - after)
        })
        .expect("The session should commit");
    assert_eq!(moved, 1);
    assert_eq!(balance(database, "ann"), Some(50));

    // Reaching for the database from inside the transaction fails instead of waiting on itself
    silent_logs! {
        let result = database.in_transaction(|_| database.get_count::<Account>(()));
        assert!(result.is_err(), "The connection is held by the transaction");
    }
    assert_eq!(
        database
            .in_transaction(|transaction| transaction.get_count::<Account>(()))
            .expect("The next transaction should run"),
        2
    );

    // A commit refused by the database is rolled back
    database
        .execute(
            "PRAGMA foreign_keys = ON;
            CREATE TABLE fk_parent (id INTEGER PRIMARY KEY);
            CREATE TABLE fk_child (
                id INTEGER PRIMARY KEY,
                parent INTEGER REFERENCES fk_parent(id) DEFERRABLE INITIALLY DEFERRED
            );",
        )
        .expect("Failed to create the foreign key tables");
    silent_logs! {
        let result = database.in_transaction(|transaction| {
            transaction.execute("INSERT INTO fk_child VALUES (1, 99);")
        });
        assert!(result.is_err(), "The deferred foreign key must refuse the commit");
    }
    database
        .in_transaction(|transaction| {
            transaction.execute("INSERT INTO fk_parent VALUES (1);")?;
            transaction.execute("INSERT INTO fk_child VALUES (2, 1);")
        })
        .expect("A transaction after the refused commit should run");
    assert_eq!(
        database
            .query_long("SELECT COUNT(*) FROM fk_child WHERE parent = 99", &[])
            .expect("Failed to count the orphans"),
        Some(0)
    );
    database
        .execute(
            "DROP TABLE fk_child;
            DROP TABLE fk_parent;
            PRAGMA foreign_keys = OFF;",
        )
        .expect("Failed to drop the foreign key tables");

    // Explicit transactions
    {
        let mut transaction = Transaction::begin(
            database
                .store()
                .writable()
                .expect("Could not get a writable handle"),
        )
        .expect("Could not begin a transaction");
        transaction
            .insert_or_throw(Account::TABLE, &to_insert_row(&Account::new("cid", 5)).unwrap())
            .expect("Failed to insert cid");
        assert!(!transaction.is_successful());
        transaction.end().expect("Failed to roll back");
    }
    assert_eq!(balance(database, "cid"), None);
    {
        let mut transaction = Transaction::begin(database.store().writable().unwrap())
            .expect("Could not begin a transaction");
        transaction
            .insert_or_throw(Account::TABLE, &to_insert_row(&Account::new("dan", 8)).unwrap())
            .expect("Failed to insert dan");
        silent_logs! {
            drop(transaction);
        }
    }
    assert_eq!(balance(database, "dan"), None);
    {
        let mut transaction = Transaction::begin(database.store().writable().unwrap())
            .expect("Could not begin a transaction");
        transaction
            .insert_or_throw(Account::TABLE, &to_insert_row(&Account::new("eve", 13)).unwrap())
            .expect("Failed to insert eve");
        transaction.set_successful();
        transaction.end().expect("Failed to commit");
    }
    assert_eq!(balance(database, "eve"), Some(13));
}
