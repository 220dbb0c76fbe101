use crate::silent_logs;
use std::{
    sync::{
        Arc, Mutex, RwLock,
        atomic::{AtomicI64, Ordering},
    },
    time::Duration,
};
use trove::{
    DispatchQueue, Model, OrmError, Repository, Selection, Store, Value, WorkerThread, join,
};

#[derive(Model, Default, Debug, Clone, PartialEq)]
#[trove(table = "note")]
pub struct Note {
    #[trove(primary_key, autoincrement)]
    pub id: i64,
    #[trove(not_null)]
    pub title: String,
    pub body: Option<String>,
    pub pinned: bool,
    /// Kept in memory only.
    #[trove(ignore)]
    pub dirty: bool,
}

impl Note {
    fn new(title: &str, pinned: bool) -> Self {
        Self {
            id: 0,
            title: title.into(),
            body: None,
            pinned,
            dirty: true,
        }
    }
}

pub async fn notes<S: Store>(repository: &Repository<S>) {
    repository
        .drop_table::<Note>()
        .await
        .expect("Failed to drop the Note table");
    repository
        .create_table::<Note>(false)
        .await
        .expect("Failed to create the Note table");

    let ids = repository
        .insert_all_or_throw(vec![
            Note::new("groceries", false),
            Note::new("ideas", true),
            Note::new("travel", true),
        ])
        .await
        .expect("Failed to insert the notes");
    assert_eq!(ids.len(), 3);

    let id = repository
        .insert_or_throw(Note::new("reading", false))
        .await
        .expect("Failed to insert a note");
    assert!(id > ids[2]);

    let pinned = repository
        .query::<Note>(Selection::new("pinned = ?").bind(true))
        .await
        .expect("Failed to query the pinned notes");
    assert_eq!(
        pinned.iter().map(|v| v.title.as_str()).collect::<Vec<_>>(),
        ["ideas", "travel"]
    );
    assert!(
        pinned.iter().all(|v| !v.dirty),
        "Ignored fields are never read back"
    );

    let operation = repository.get_count::<Note>(());
    let count = operation.await.expect("Failed to count the notes");
    assert_eq!(count, 4);

    // Blocking variants
    let operation = repository.query_row::<Note>(Selection::new("id = ?").bind(id));
    let note = operation
        .wait()
        .expect("Failed to query the note")
        .expect("Could not find the note");
    assert_eq!(note.title, "reading");
    assert_eq!(
        join(repository.query_row::<Note>(Selection::new("id = ?").bind(-1i64))),
        Some(None)
    );
    assert!(
        join(repository.insert(Note::new("reading", false)))
            .flatten()
            .is_some()
    );
    silent_logs! {
        assert_eq!(
            join(repository.query_string("SELECT missing FROM \"note\"", Vec::new())),
            None
        );
    }

    let operation = repository.query_string(
        "SELECT title FROM \"note\" WHERE id = ?",
        vec![Value::Integer(ids[0])],
    );
    let title = loop {
        if let Some(result) = operation.wait_timeout(Duration::from_millis(50)) {
            break result.expect("Failed to query the title");
        }
    };
    assert!(operation.is_finished());
    assert_eq!(title, Some("groceries".to_string()));

    // Callbacks delivered to a queue drained by this thread
    let queue = DispatchQueue::new();
    let received = Arc::new(AtomicI64::new(-1));
    let operation = repository.submit_with_callback(
        |database| database.get_count::<Note>("pinned"),
        queue.clone(),
        {
            let received = received.clone();
            move |count| received.store(count, Ordering::Release)
        },
    );
    let count = operation.await.expect("Failed to count the pinned notes");
    assert_eq!(count, 2);
    assert_eq!(received.load(Ordering::Acquire), -1, "The callback runs on the queue");
    assert_eq!(queue.run_pending(), 1);
    assert_eq!(received.load(Ordering::Acquire), 2);

    // Failures never reach the callback
    let called = Arc::new(Mutex::new(false));
    let operation = repository.submit_with_callback(
        |database| database.query_long("SELECT nope FROM \"note\"", &[]),
        queue.clone(),
        {
            let called = called.clone();
            move |_| *called.lock().unwrap() = true
        },
    );
    assert!(operation.await.is_err());
    assert_eq!(queue.run_pending(), 0);
    assert!(!*called.lock().unwrap());

    // Writes in one transaction
    let operation = repository.execute_write_with_callback(
        |transaction| {
            let mut note = Note::new("archived", false);
            note.body = Some("old stuff".into());
            let id = transaction.insert_or_throw(&note)?;
            transaction.execute("UPDATE \"note\" SET pinned = 0;")?;
            Ok(id)
        },
        WorkerThread,
        {
            let received = received.clone();
            move |id| received.store(id, Ordering::Release)
        },
    );
    let archived = operation.await.expect("Failed to write the archived note");
    assert_eq!(received.load(Ordering::Acquire), archived);
    assert_eq!(
        repository
            .get_count::<Note>("pinned")
            .await
            .expect("Failed to count the pinned notes"),
        0
    );

    let operation = repository.execute_write(|transaction| {
        transaction.execute("DELETE FROM \"note\";")?;
        Err::<(), _>(trove::Error::msg("Keep the notes"))
    });
    assert!(operation.await.is_err());
    assert_eq!(
        repository
            .query_column::<String>("SELECT title FROM \"note\" ORDER BY id", Vec::new())
            .await
            .expect("Failed to query the titles"),
        ["groceries", "ideas", "travel", "reading", "reading", "archived"]
    );

    // Callbacks on the runtime
    let (sender, receiver) = tokio::sync::oneshot::channel();
    let operation = repository.submit_with_callback(
        |database| {
            database
                .query_column::<String>("SELECT title FROM \"note\" WHERE body IS NOT NULL", &[])
        },
        tokio::runtime::Handle::current(),
        move |titles| {
            let _ = sender.send(titles);
        },
    );
    operation.await.expect("Failed to query the titles");
    assert_eq!(
        receiver.await.expect("The callback did not run"),
        ["archived"]
    );

    // A cancelled operation never runs
    let gate = Arc::new(RwLock::new(()));
    let closed = gate.write().unwrap();
    let blockers = (0..repository.pool().workers())
        .map(|_| {
            let gate = gate.clone();
            repository.submit(move |_| {
                let _open = gate.read();
                Ok(())
            })
        })
        .collect::<Vec<_>>();
    let cancelled = repository.execute("DELETE FROM \"note\";");
    assert!(cancelled.cancel(), "A queued operation can be cancelled");
    assert!(cancelled.is_cancelled());
    assert!(cancelled.is_finished());
    assert!(!cancelled.cancel(), "An operation is cancelled only once");
    drop(closed);
    for blocker in blockers {
        blocker.await.expect("The blocking operation failed");
    }
    let error = cancelled.await.expect_err("A cancelled operation has no result");
    assert!(matches!(OrmError::of(&error), Some(OrmError::Cancelled)));
    assert_eq!(
        repository
            .get_count::<Note>(())
            .await
            .expect("Failed to count the notes"),
        6
    );

    // A panic inside an operation becomes its error
    let operation = repository.submit(|_| -> trove::Result<()> { panic!("broken operation") });
    let error = operation.wait().expect_err("A panicking operation must fail");
    assert!(error.to_string().contains("broken operation"), "{:#}", error);
    let count = repository
        .get_count::<Note>(())
        .wait()
        .expect("The pool keeps working after a panic");
    assert_eq!(count, 6);
}
