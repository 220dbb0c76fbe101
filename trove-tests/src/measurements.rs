use crate::silent_logs;
use std::collections::HashMap;
use trove::{Database, Model, OrmError, Selection, Store, Value};

#[derive(Model, Default, Debug, Clone, PartialEq)]
#[trove(table = "measurement")]
pub struct Measurement {
    #[trove(primary_key)]
    pub id: i64,
    #[trove(not_null, unique = "reading")]
    pub sensor: String,
    #[trove(unique = "reading")]
    pub taken_at: i64,
    pub value: f64,
    pub valid: bool,
    pub grade: char,
    pub payload: Vec<u8>,
    pub note: Option<String>,
}

fn measurement(id: i64, sensor: &str, taken_at: i64, value: f64, valid: bool) -> Measurement {
    Measurement {
        id,
        sensor: sensor.into(),
        taken_at,
        value,
        valid,
        grade: if valid { 'A' } else { 'F' },
        payload: vec![id as u8, 0xff, 0x00],
        note: None,
    }
}

pub fn measurements<S: Store>(database: &Database<S>) {
    database
        .drop_table::<Measurement>()
        .expect("Failed to drop the Measurement table");
    database
        .create_table::<Measurement>(true)
        .expect("Failed to create the Measurement table");

    let values = [
        measurement(1, "north", 100, 12.5, true),
        measurement(2, "north", 200, 13.0, true),
        measurement(3, "south", 100, 7.25, false),
        measurement(4, "west", 100, -1.0, true),
    ];
    let ids = database
        .insert_all_or_throw(&values)
        .expect("Failed to insert the measurements");
    assert_eq!(ids, [1, 2, 3, 4]);

    // Every kind survives a round trip
    let second = database
        .query_row::<Measurement>(Selection::new("id = ?").bind(2))
        .expect("Failed to query the second measurement")
        .expect("Could not find the second measurement");
    assert_eq!(second, values[1]);

    // Composite unique group
    silent_logs! {
        let error = database
            .insert_or_throw(&measurement(5, "north", 100, 0.0, true))
            .expect_err("The same sensor and time must be refused");
        assert!(
            matches!(OrmError::of(&error), Some(OrmError::DuplicateKey { .. })),
            "Expected a duplicate key error, got: {:#}",
            error
        );
    }
    database
        .insert_or_throw(&measurement(5, "north", 300, 0.5, false))
        .expect("A different time for the same sensor is allowed");

    // Scalars
    assert_eq!(
        database
            .query_long("SELECT MAX(id) FROM \"measurement\"", &[])
            .unwrap(),
        Some(5)
    );
    assert_eq!(
        database
            .query_integer("SELECT COUNT(*) FROM \"measurement\" WHERE valid", &[])
            .unwrap(),
        Some(3)
    );
    assert_eq!(
        database
            .query_double(
                "SELECT SUM(value) FROM \"measurement\" WHERE sensor = ?",
                &[Value::Text("north".into())],
            )
            .unwrap(),
        Some(26.0)
    );
    assert_eq!(
        database
            .query_string(
                "SELECT sensor FROM \"measurement\" WHERE id = ?",
                &[Value::Integer(3)]
            )
            .unwrap(),
        Some("south".to_string())
    );
    assert_eq!(
        database
            .query_string("SELECT sensor FROM \"measurement\" WHERE id < 0", &[])
            .unwrap(),
        None
    );
    assert_eq!(
        database
            .query_scalar::<bool>("SELECT valid FROM \"measurement\" WHERE id = 3", &[])
            .unwrap(),
        Some(false)
    );
    let error = database
        .query_integer("SELECT sensor FROM \"measurement\" WHERE id = 1", &[])
        .expect_err("A sensor name is not an integer");
    assert!(
        matches!(OrmError::of(&error), Some(OrmError::TypeMismatch { .. })),
        "Expected a type mismatch, got: {:#}",
        error
    );
    assert_eq!(
        database
            .get_count::<Measurement>(Selection::new("value > ?").bind(10.0))
            .unwrap(),
        2
    );

    let grades = database
        .query_column::<char>("SELECT grade FROM \"measurement\" ORDER BY id", &[])
        .expect("Failed to query the grades");
    assert_eq!(grades, ['A', 'A', 'F', 'A', 'F']);

    // Grouping
    let by_sensor = database
        .query_grouped_rows::<Measurement, String>(
            Some("sensor"),
            Selection::new("id <> ?").bind(5),
        )
        .expect("Failed to group by sensor");
    assert_eq!(by_sensor.len(), 3);
    assert_eq!(
        by_sensor["north"].iter().map(|v| v.id).collect::<Vec<_>>(),
        [1, 2]
    );
    assert_eq!(by_sensor["west"], [values[3].clone()]);

    let by_validity = database
        .query_grouped_rows_raw_sql::<Measurement, bool>(
            Some("valid"),
            "SELECT * FROM {:table} ORDER BY id DESC",
            &[],
        )
        .expect("Failed to group by validity");
    assert_eq!(
        by_validity[&false].iter().map(|v| v.id).collect::<Vec<_>>(),
        [5, 3]
    );

    let by_id = database
        .query_rows_mapped_raw_sql::<Measurement, i64>(
            None,
            "SELECT id, sensor, value FROM {:table} WHERE taken_at = ?",
            &[Value::Integer(100)],
        )
        .expect("Failed to map by id");
    assert_eq!(
        by_id
            .into_iter()
            .map(|(k, v)| (k, v.sensor))
            .collect::<HashMap<_, _>>(),
        HashMap::from([
            (1, "north".to_string()),
            (3, "south".to_string()),
            (4, "west".to_string())
        ])
    );

    let error = database
        .query_rows_mapped::<Measurement, i64>(Some("missing"), ())
        .expect_err("Mapping by an unknown field must fail");
    assert!(
        matches!(
            OrmError::of(&error),
            Some(OrmError::NoSuchField { field, .. }) if field == "missing"
        ),
        "Expected an unknown field error, got: {:#}",
        error
    );

    // Updates skip the key and write everything else
    let mut first = values[0].clone();
    first.note = Some("recalibrated".into());
    first.value = 12.75;
    assert_eq!(database.update(&first).expect("Failed to update"), 1);
    let mut missing = values[0].clone();
    missing.id = 99;
    assert_eq!(database.update(&missing).expect("Failed to update"), 0);
    let first_again = database
        .query_row::<Measurement>(Selection::new("id = ?").bind(1))
        .unwrap()
        .expect("Could not find the first measurement");
    assert_eq!(first_again, first);

    // Aggregates over no rows give a NULL cell
    let empty = "FROM \"measurement\" WHERE id < 0";
    assert_eq!(
        database
            .query_long(&format!("SELECT MAX(id) {}", empty), &[])
            .expect("An empty maximum is not an error"),
        None
    );
    assert_eq!(
        database
            .query_double(&format!("SELECT AVG(value) {}", empty), &[])
            .expect("An empty average is not an error"),
        None
    );
    assert_eq!(
        database
            .query_string(&format!("SELECT MIN(sensor) {}", empty), &[])
            .expect("An empty minimum is not an error"),
        None
    );
    assert_eq!(
        database
            .query_long(&format!("SELECT COUNT(*) {}", empty), &[])
            .unwrap(),
        Some(0)
    );
}
