use crate::{Error, OrmError, Result, report_error};
use futures::{FutureExt, future::BoxFuture};
use std::{
    any::Any,
    future::IntoFuture,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Work handed to a [`Dispatcher`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Worker pool settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Prefix of the thread names, the worker index is appended.
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            thread_name: "trove-worker".into(),
        }
    }
}

impl PoolConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }
}

/// Fixed set of threads running submitted operations in submission order.
///
/// Dropping the pool closes the queue, the operations already queued still run and
/// the workers are joined once it is drained.
pub struct WorkerPool {
    sender: Option<flume::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> Result<Self> {
        if config.workers == 0 {
            return Err(Error::msg("A worker pool needs at least one worker"));
        }
        let (sender, receiver) = flume::unbounded::<Job>();
        let mut workers = Vec::with_capacity(config.workers);
        for i in 0..config.workers {
            let receiver = receiver.clone();
            let name = format!("{}-{}", config.thread_name, i);
            let worker = thread::Builder::new()
                .name(name.clone())
                .spawn(move || {
                    log::trace!("Worker `{}` started", name);
                    while let Ok(job) = receiver.recv() {
                        job();
                    }
                    log::trace!("Worker `{}` stopped", name);
                })?;
            workers.push(worker);
        }
        log::debug!(
            "Started {} workers named `{}-*`",
            config.workers,
            config.thread_name
        );
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Queue `f` and return immediately.
    pub fn submit<T, F>(&self, f: F) -> PendingOperation<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let state = Arc::new(AtomicU8::new(QUEUED));
        let (sender, receiver) = flume::bounded(1);
        let job_state = state.clone();
        let job: Job = Box::new(move || {
            if job_state
                .compare_exchange(QUEUED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                log::trace!("Skipping a cancelled operation");
                return;
            }
            let result = panic::catch_unwind(AssertUnwindSafe(f))
                .unwrap_or_else(|payload| Err(panic_error(payload)));
            job_state.store(FINISHED, Ordering::Release);
            let _ = sender.send(result);
        });
        if let Some(queue) = &self.sender {
            // A failed send drops the job, the operation then resolves to `PoolShutdown`.
            let _ = queue.send(job);
        }
        PendingOperation { state, receiver }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("A worker thread terminated with a panic");
            }
        }
    }
}

fn panic_error(payload: Box<dyn Any + Send>) -> Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(|v| v.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".into());
    Error::msg(format!("The operation panicked: {}", message))
}

const QUEUED: u8 = 0;
const RUNNING: u8 = 1;
const FINISHED: u8 = 2;
const CANCELLED: u8 = 3;

/// Handle of a submitted operation.
///
/// Completion can be checked any number of times. The result is consumed once, either
/// by blocking with [`PendingOperation::wait`] or by awaiting it.
pub struct PendingOperation<T> {
    state: Arc<AtomicU8>,
    receiver: flume::Receiver<Result<T>>,
}

impl<T> PendingOperation<T> {
    /// True once the result is available (cancelled operations included).
    pub fn is_finished(&self) -> bool {
        matches!(self.state.load(Ordering::Acquire), FINISHED | CANCELLED)
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELLED
    }

    /// Cancel the operation if it did not start yet. A running operation is never
    /// interrupted.
    pub fn cancel(&self) -> bool {
        self.state
            .compare_exchange(QUEUED, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn resolve(state: &AtomicU8, received: Option<Result<T>>) -> Result<T> {
        match received {
            Some(result) => result,
            None if state.load(Ordering::Acquire) == CANCELLED => Err(OrmError::Cancelled.into()),
            None => Err(OrmError::PoolShutdown.into()),
        }
    }

    /// Block until the operation completes and return its result.
    pub fn wait(self) -> Result<T> {
        if self.is_cancelled() {
            return Err(OrmError::Cancelled.into());
        }
        Self::resolve(&self.state, self.receiver.recv().ok())
    }

    /// Like [`PendingOperation::wait`], giving up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T>> {
        if self.is_cancelled() {
            return Some(Err(OrmError::Cancelled.into()));
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(flume::RecvTimeoutError::Timeout) => None,
            Err(flume::RecvTimeoutError::Disconnected) => Some(Self::resolve(&self.state, None)),
        }
    }
}

impl<T: Send + 'static> IntoFuture for PendingOperation<T> {
    type Output = Result<T>;
    type IntoFuture = BoxFuture<'static, Result<T>>;

    fn into_future(self) -> Self::IntoFuture {
        async move {
            if self.is_cancelled() {
                return Err(OrmError::Cancelled.into());
            }
            let received = self.receiver.recv_async().await.ok();
            Self::resolve(&self.state, received)
        }
        .boxed()
    }
}

/// Block on `operation`. A failure is reported and yields `None`, use
/// [`PendingOperation::wait`] to receive the error instead.
pub fn join<T>(operation: PendingOperation<T>) -> Option<T> {
    operation.wait().inspect_err(report_error).ok()
}

/// Where success callbacks run.
pub trait Dispatcher: Send + Sync + 'static {
    fn dispatch(&self, task: Task);
}

/// Runs callbacks on the worker that completed the operation.
#[derive(Default, Debug, Clone, Copy)]
pub struct WorkerThread;

impl Dispatcher for WorkerThread {
    fn dispatch(&self, task: Task) {
        task();
    }
}

impl Dispatcher for tokio::runtime::Handle {
    fn dispatch(&self, task: Task) {
        self.spawn(async move { task() });
    }
}

/// Callbacks queued for a thread that drains them in its own loop.
#[derive(Debug, Clone)]
pub struct DispatchQueue {
    sender: flume::Sender<Task>,
    receiver: flume::Receiver<Task>,
}

impl Default for DispatchQueue {
    fn default() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of callbacks waiting.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Run every callback already queued, returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut count = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            count += 1;
        }
        count
    }

    /// Blocks until the next callback arrives, then runs it.
    ///
    /// The queue keeps a sender of its own, so this waits forever when nothing is pending
    /// and nothing is in flight. Use [`DispatchQueue::run_next_timeout`] to bound the wait.
    pub fn run_next(&self) {
        if let Ok(task) = self.receiver.recv() {
            task();
        }
    }

    /// Like [`DispatchQueue::run_next`], giving up after `timeout`.
    pub fn run_next_timeout(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(task) => {
                task();
                true
            }
            Err(..) => false,
        }
    }
}

impl Dispatcher for DispatchQueue {
    fn dispatch(&self, task: Task) {
        let _ = self.sender.send(task);
    }
}
