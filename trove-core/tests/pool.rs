#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc, Barrier, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        thread,
        time::Duration,
    };
    use trove_core::{
        DispatchQueue, Dispatcher, Error, OrmError, PoolConfig, WorkerPool, WorkerThread, join,
    };

    #[test]
    fn config() {
        let config = PoolConfig::default();
        assert_eq!(config.workers, 4);
        assert_eq!(config.thread_name, "trove-worker");
        let config = PoolConfig::default()
            .with_workers(2)
            .with_thread_name("orders");
        let pool = WorkerPool::new(config).expect("Could not start the pool");
        assert_eq!(pool.workers(), 2);
        let name = pool
            .submit(|| Ok(thread::current().name().map(ToOwned::to_owned)))
            .wait()
            .unwrap()
            .expect("Workers are named");
        assert!(name.starts_with("orders-"), "Unexpected name {}", name);
        assert!(WorkerPool::new(PoolConfig::default().with_workers(0)).is_err());
    }

    #[test]
    fn submit_and_wait() {
        let pool = WorkerPool::new(PoolConfig::default()).unwrap();
        let operations = (0..16)
            .map(|i| pool.submit(move || Ok(i * 2)))
            .collect::<Vec<_>>();
        let results = operations
            .into_iter()
            .map(|v| v.wait().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(results, (0..16).map(|i| i * 2).collect::<Vec<_>>());

        let operation = pool.submit(|| -> trove_core::Result<()> { Err(Error::msg("refused")) });
        assert_eq!(operation.wait().unwrap_err().to_string(), "refused");
        assert_eq!(join(pool.submit(|| Ok("done"))), Some("done"));
        assert_eq!(
            join(pool.submit(|| -> trove_core::Result<i32> { Err(Error::msg("refused")) })),
            None
        );
    }

    #[test]
    fn completion_flag() {
        let pool = WorkerPool::new(PoolConfig::default().with_workers(1)).unwrap();
        let barrier = Arc::new(Barrier::new(2));
        let operation = pool.submit({
            let barrier = barrier.clone();
            move || {
                barrier.wait();
                Ok(1)
            }
        });
        assert!(!operation.is_finished());
        assert!(operation.wait_timeout(Duration::from_millis(10)).is_none());
        barrier.wait();
        let result = operation
            .wait_timeout(Duration::from_secs(5))
            .expect("The operation should complete");
        assert_eq!(result.unwrap(), 1);
        assert!(operation.is_finished());
        assert!(!operation.is_cancelled());
    }

    #[test]
    fn cancel() {
        let pool = WorkerPool::new(PoolConfig::default().with_workers(1)).unwrap();
        let barrier = Arc::new(Barrier::new(2));
        let ran = Arc::new(AtomicUsize::new(0));
        let blocker = pool.submit({
            let barrier = barrier.clone();
            move || {
                barrier.wait();
                barrier.wait();
                Ok(())
            }
        });
        // The single worker is now busy
        barrier.wait();
        let queued = pool.submit({
            let ran = ran.clone();
            move || {
                ran.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
        });
        assert!(queued.cancel());
        assert!(queued.is_cancelled());
        assert!(queued.is_finished());
        assert!(!queued.cancel());
        assert!(!blocker.cancel(), "A running operation cannot be cancelled");
        barrier.wait();
        blocker.wait().unwrap();
        let error = queued.wait().unwrap_err();
        assert!(matches!(OrmError::of(&error), Some(OrmError::Cancelled)));
        drop(pool);
        assert_eq!(ran.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn panic_is_contained() {
        let pool = WorkerPool::new(PoolConfig::default().with_workers(1)).unwrap();
        let operation = pool.submit(|| -> trove_core::Result<()> { panic!("worker exploded") });
        let error = operation.wait().unwrap_err();
        assert!(error.to_string().contains("worker exploded"));
        assert_eq!(pool.submit(|| Ok(5)).wait().unwrap(), 5);
    }

    #[test]
    fn drop_drains_the_queue() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::new(PoolConfig::default().with_workers(2)).unwrap();
        let operations = (0..10)
            .map(|_| {
                let counter = counter.clone();
                pool.submit(move || {
                    thread::sleep(Duration::from_millis(2));
                    counter.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                })
            })
            .collect::<Vec<_>>();
        drop(pool);
        assert_eq!(counter.load(Ordering::Relaxed), 10);
        assert!(operations.into_iter().all(|v| v.wait().is_ok()));
    }

    #[tokio::test]
    async fn await_operation() {
        let pool = WorkerPool::new(PoolConfig::default()).unwrap();
        let value = pool.submit(|| Ok(String::from("async"))).await.unwrap();
        assert_eq!(value, "async");

        let barrier = Arc::new(Barrier::new(2));
        let blocker = pool.submit({
            let barrier = barrier.clone();
            move || {
                barrier.wait();
                Ok(())
            }
        });
        let waiting = tokio::spawn(async move { blocker.await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiting.is_finished());
        barrier.wait();
        waiting.await.unwrap().unwrap();
    }

    #[test]
    fn dispatch_queue() {
        let queue = DispatchQueue::new();
        assert!(queue.is_empty());
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let log = log.clone();
            queue.dispatch(Box::new(move || log.lock().unwrap().push(i)));
        }
        assert_eq!(queue.len(), 3);
        queue.run_next();
        assert_eq!(*log.lock().unwrap(), [0]);
        assert_eq!(queue.run_pending(), 2);
        assert_eq!(*log.lock().unwrap(), [0, 1, 2]);
        assert!(!queue.run_next_timeout(Duration::from_millis(5)));

        let sender = queue.clone();
        let handle = thread::spawn(move || {
            sender.dispatch(Box::new(|| {}));
        });
        assert!(queue.run_next_timeout(Duration::from_secs(5)));
        handle.join().unwrap();

        // Waits for a callback that is not dispatched yet
        let sender = queue.clone();
        let handle = thread::spawn({
            let log = log.clone();
            move || {
                thread::sleep(Duration::from_millis(20));
                sender.dispatch(Box::new(move || log.lock().unwrap().push(3)));
            }
        });
        queue.run_next();
        assert_eq!(*log.lock().unwrap(), [0, 1, 2, 3]);
        handle.join().unwrap();
    }

    #[test]
    fn worker_thread_dispatch() {
        let called = Arc::new(AtomicUsize::new(0));
        WorkerThread.dispatch(Box::new({
            let called = called.clone();
            move || {
                called.fetch_add(1, Ordering::Relaxed);
            }
        }));
        assert_eq!(called.load(Ordering::Relaxed), 1);
    }
}
