use crate::silent_logs;
use std::collections::{HashMap, HashSet};
use trove::{Database, Model, OrmError, Selection, Store};

#[derive(Model, Default, Debug, Clone, PartialEq)]
#[trove(table = "user")]
pub struct User {
    #[trove(primary_key, autoincrement)]
    pub id: i64,
    #[trove(unique)]
    pub name: String,
    pub age: Option<i32>,
}

impl User {
    fn new(name: &str, age: Option<i32>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            age,
        }
    }
}

pub fn users<S: Store>(database: &Database<S>) {
    // Setup
    database
        .drop_table::<User>()
        .expect("Failed to drop the User table");
    database
        .create_table::<User>(false)
        .expect("Failed to create the User table");
    let result = database.create_table::<User>(true);
    assert!(
        result.is_ok(),
        "Creating the User table again with if_not_exists should succeed: {:?}",
        result.unwrap_err()
    );

    // A failing batch that throws leaves nothing behind
    silent_logs! {
        let error = database
            .insert_all_or_throw(&[User::new("A", None), User::new("A", Some(5))])
            .expect_err("A duplicated name must fail the batch");
        assert!(
            matches!(OrmError::of(&error), Some(OrmError::DuplicateKey { .. })),
            "Expected a duplicate key error, got: {:#}",
            error
        );
    }
    assert_eq!(database.get_count::<User>(()).unwrap(), 0);

    // A failing batch that does not throw keeps the rows before the failure
    let ids;
    silent_logs! {
        ids = database.insert_all(&[
            User::new("B", Some(1)),
            User::new("C", Some(2)),
            User::new("B", Some(3)),
            User::new("D", Some(4)),
        ]);
    }
    assert_eq!(ids.len(), 2);
    assert!(ids.iter().all(|v| *v > 0), "Generated ids must be positive: {:?}", ids);
    assert_eq!(database.get_count::<User>(()).unwrap(), 2);
    let names = database
        .query_column::<String>("SELECT name FROM \"user\" ORDER BY id", &[])
        .expect("Failed to query the names");
    assert_eq!(names, ["B", "C"]);

    database
        .execute("DELETE FROM \"user\";")
        .expect("Failed to clear the User table");
    assert_eq!(database.get_count::<User>(()).unwrap(), 0);

    // Insert and select
    let a = database
        .insert_or_throw(&User::new("A", Some(5)))
        .expect("Failed to insert A");
    let b = database
        .insert(&User::new("B", Some(2)))
        .expect("Failed to insert B");
    assert_ne!(a, b);
    silent_logs! {
        assert_eq!(database.insert(&User::new("B", None)), None);
    }

    let older = database
        .query::<User>(Selection::from_args(["age > ?", "3"]))
        .expect("Failed to query users older than 3");
    assert_eq!(older, [User { id: a, name: "A".into(), age: Some(5) }]);

    let everyone = database
        .query_rows_mapped::<User, i64>(None, ())
        .expect("Failed to query the users by id");
    assert_eq!(everyone.len(), 2);
    assert_eq!(everyone.keys().copied().collect::<HashSet<_>>(), HashSet::from([a, b]));
    assert_eq!(everyone[&b].name, "B");

    let by_name = database
        .query_rows_mapped::<User, String>(Some("name"), "age IS NOT NULL")
        .expect("Failed to query the users by name");
    assert_eq!(
        by_name
            .into_iter()
            .map(|(k, v)| (k, v.id))
            .collect::<HashMap<_, _>>(),
        HashMap::from([("A".to_string(), a), ("B".to_string(), b)])
    );

    // Update
    let mut user_b = database
        .query_row::<User>(Selection::new("name = ?").bind("B"))
        .expect("Failed to query B")
        .expect("Could not find B");
    assert_eq!(user_b.id, b);
    user_b.age = None;
    let changed = database.update(&user_b).expect("Failed to update B");
    assert_eq!(changed, 1);
    let user_b = database
        .query_row::<User>(Selection::new("id = ?").bind(b))
        .expect("Failed to query B")
        .expect("Could not find B");
    assert_eq!(user_b.age, None);
    assert_eq!(
        database.get_count::<User>("age IS NULL").unwrap(),
        1,
        "Only B should have no age"
    );

    // Replace on the existing key
    let replaced = database
        .replace_or_throw(&User {
            id: a,
            name: "Alice".into(),
            age: Some(30),
        })
        .expect("Failed to replace A");
    assert_eq!(replaced, a);
    assert_eq!(database.get_count::<User>(()).unwrap(), 2);
    let alice = database
        .query_row::<User>(Selection::new("id = ?").bind(a))
        .expect("Failed to query Alice")
        .expect("Could not find Alice");
    assert_eq!(alice.name, "Alice");
    assert_eq!(alice.age, Some(30));

    let ids = database
        .replace_all_or_throw(&[User::new("E", Some(7)), User::new("F", Some(8))])
        .expect("Failed to replace E and F");
    assert_eq!(ids.len(), 2);
    assert_eq!(database.get_count::<User>(()).unwrap(), 4);
    assert!(
        database
            .query_row::<User>(Selection::new("name = ?").bind("nobody"))
            .expect("Failed to query a missing user")
            .is_none()
    );
}
