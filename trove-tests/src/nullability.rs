use crate::silent_logs;
use trove::{Database, Model, OrmError, Store, Value};

/// A table without primary key.
#[derive(Model, Default, Debug, Clone, PartialEq)]
#[trove(table = "event_log")]
pub struct EventLog {
    #[trove(not_null)]
    pub message: String,
    pub level: Option<i16>,
    #[trove(default = 1.5)]
    pub weight: f64,
}

pub fn nullability<S: Store>(database: &Database<S>) {
    database
        .drop_table::<EventLog>()
        .expect("Failed to drop the EventLog table");
    database
        .create_table::<EventLog>(false)
        .expect("Failed to create the EventLog table");

    let events = [
        EventLog {
            message: "started".into(),
            level: Some(1),
            weight: 0.25,
        },
        EventLog {
            message: "stopped".into(),
            level: None,
            weight: 2.0,
        },
    ];
    let ids = database
        .insert_all_or_throw(&events)
        .expect("Failed to insert the events");
    assert_eq!(ids.len(), 2);

    // Updates need a primary key
    let error = database
        .update(&events[0])
        .expect_err("Updating a model without primary key must fail");
    assert!(
        matches!(OrmError::of(&error), Some(OrmError::NoPrimaryKey { .. })),
        "Expected a missing primary key error, got: {:#}",
        error
    );

    // A column left out of the insert takes its default
    database
        .execute("INSERT INTO \"event_log\" (\"message\") VALUES ('defaulted');")
        .expect("Failed to insert a row with defaults");
    let defaulted = database
        .query_row::<EventLog>("message = 'defaulted'")
        .expect("Failed to query the defaulted row")
        .expect("Could not find the defaulted row");
    assert_eq!(defaulted.level, None);
    assert_eq!(defaulted.weight, 1.5);

    // The store refuses a NULL message
    silent_logs! {
        let error = database
            .execute("INSERT INTO \"event_log\" (\"message\") VALUES (NULL);")
            .expect_err("A NULL message must be refused");
        assert!(
            matches!(OrmError::of(&error), Some(OrmError::Constraint { .. })),
            "Expected a constraint error, got: {:#}",
            error
        );
    }

    // Partial projection, the missing fields keep their zero value
    let messages = database
        .query_raw_sql::<EventLog>("SELECT message FROM {:table} ORDER BY message", &[])
        .expect("Failed to query the messages");
    assert_eq!(
        messages,
        ["defaulted", "started", "stopped"].map(|v| EventLog {
            message: v.into(),
            level: None,
            weight: 0.0,
        })
    );

    // NULL read into a field that cannot hold it
    let error = database
        .query_row_raw_sql::<EventLog>(
            "SELECT NULL AS message, level, weight FROM {:TABLE} WHERE message = ?",
            &[Value::Text("started".into())],
        )
        .expect_err("Reading NULL into a String must fail");
    assert!(
        matches!(
            OrmError::of(&error),
            Some(OrmError::NullConstraintViolation { column }) if column == "message"
        ),
        "Expected a null constraint violation, got: {:#}",
        error
    );
    silent_logs! {
        let skipped = database
            .query_raw_sql::<EventLog>("SELECT NULL AS message, level FROM {:table}", &[])
            .expect("A bulk read skips the rows it cannot read");
        assert!(skipped.is_empty());
    }

    // Nullable fields read NULL as None
    let levels = database
        .query_column::<Option<i16>>("SELECT level FROM \"event_log\" ORDER BY message", &[])
        .expect("Failed to query the levels");
    assert_eq!(levels, [None, Some(1), None]);
}
