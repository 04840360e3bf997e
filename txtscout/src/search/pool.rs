/// A fixed-size pool of worker threads with one completion handle per task.
///
/// # Scheduling
///
/// Tasks are pushed onto a single FIFO queue (`crossbeam_channel::unbounded`). Every
/// worker holds a clone of the receiving end and pulls the next task as soon as it
/// is idle, so tasks start in submission order and at most `workers` run at once.
///
/// ```text
/// submit() ──► [ task queue ] ──► worker-0 ─┐
///                             ──► worker-1 ─┼─► one-shot channel per task ──► TaskHandle::wait()
///                             ──► worker-N ─┘
/// ```
///
/// # Completion handles
///
/// `submit` returns a [`TaskHandle`] owning the receiving side of a bounded(1)
/// channel. The worker sends exactly one [`TaskOutcome`] into it, so waiting on one
/// handle never depends on any other task.
///
/// # Failure isolation
///
/// Errors returned by a task and panics raised inside it are both turned into
/// `TaskOutcome::Failure` on that task's handle. The worker thread keeps running.
///
/// # Shutdown
///
/// [`WorkerPool::shutdown`] consumes the pool, closing the queue. Workers drain what
/// is left; if that takes longer than the grace period the shared [`Interrupt`] flag
/// is raised. Queued tasks are then failed without running and running tasks stop
/// at their next poll of the flag.
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

use crate::errors::{SearchError, SearchResult};

/// Bounded wait for workers to notice an interrupt before they are detached
const INTERRUPT_GRACE: Duration = Duration::from_secs(1);

/// A unit of work the pool can execute
pub trait Task: Send + 'static {
    type Output: Send + 'static;

    /// Runs the task to completion. Long-running tasks should poll `interrupt`.
    fn run(self, interrupt: &Interrupt) -> SearchResult<Self::Output>;

    /// Short label used in diagnostics
    fn describe(&self) -> String;
}

/// Outcome of exactly one submitted task
#[derive(Debug)]
pub enum TaskOutcome<T> {
    Success(T),
    Failure(SearchError),
}

impl<T> TaskOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn into_result(self) -> SearchResult<T> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(err) => Err(err),
        }
    }
}

impl<T> From<SearchResult<T>> for TaskOutcome<T> {
    fn from(result: SearchResult<T>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) => Self::Failure(err),
        }
    }
}

/// Shared flag raised when the pool gives up waiting during shutdown
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Awaitable result of one submitted task
#[derive(Debug)]
pub struct TaskHandle<T> {
    id: usize,
    label: String,
    receiver: Receiver<TaskOutcome<T>>,
}

impl<T> TaskHandle<T> {
    /// Submission index of the task
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Blocks until this task's outcome is available
    pub fn wait(self) -> TaskOutcome<T> {
        match self.receiver.recv() {
            Ok(outcome) => outcome,
            // The job was dropped without reporting, which only happens when its
            // worker was torn down
            Err(_) => TaskOutcome::Failure(SearchError::interrupted(self.label)),
        }
    }

    /// Like [`wait`](Self::wait) but gives the handle back if `timeout` elapses first
    pub fn wait_timeout(self, timeout: Duration) -> Result<TaskOutcome<T>, Self> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => Ok(outcome),
            Err(RecvTimeoutError::Timeout) => Err(self),
            Err(RecvTimeoutError::Disconnected) => {
                Ok(TaskOutcome::Failure(SearchError::interrupted(self.label)))
            }
        }
    }
}

/// Lifecycle of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolPhase {
    /// Workers started, nothing submitted yet
    Idle,
    /// At least one task submitted, queue open
    Accepting,
    /// Queue closed, workers finishing remaining tasks
    Draining,
    Terminated,
}

/// How the pool ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolTermination {
    /// Every worker exited within the grace period
    Graceful,
    /// The grace period elapsed and the interrupt flag was raised
    Forced {
        /// Workers that still had not exited and were detached
        unfinished_workers: usize,
    },
}

/// Counters describing the pool's work so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub submitted: usize,
    pub completed: usize,
    pub peak_running: usize,
}

#[derive(Debug, Default)]
struct Counters {
    running: AtomicUsize,
    peak_running: AtomicUsize,
    completed: AtomicUsize,
}

impl Counters {
    fn task_started(&self) {
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_running.fetch_max(running, Ordering::SeqCst);
    }

    fn task_finished(&self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

type Job = Box<dyn FnOnce(&Interrupt) + Send + 'static>;

struct Worker {
    id: usize,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn(
        id: usize,
        jobs: Receiver<Job>,
        exited: Sender<usize>,
        interrupt: Interrupt,
        counters: Arc<Counters>,
    ) -> SearchResult<Self> {
        let thread = thread::Builder::new()
            .name(format!("txtscout-worker-{}", id))
            .spawn(move || {
                trace!("Worker {} started", id);
                // recv fails once the queue is closed and empty
                while let Ok(job) = jobs.recv() {
                    counters.task_started();
                    job(&interrupt);
                    counters.task_finished();
                }
                trace!("Worker {} exiting", id);
                let _ = exited.send(id);
            })?;

        Ok(Self {
            id,
            thread: Some(thread),
        })
    }
}

/// Fixed-size thread pool executing [`Task`]s
pub struct WorkerPool {
    workers: Vec<Worker>,
    sender: Option<Sender<Job>>,
    exited: Receiver<usize>,
    interrupt: Interrupt,
    counters: Arc<Counters>,
    submitted: usize,
    phase: PoolPhase,
}

impl WorkerPool {
    /// Starts `size` worker threads
    pub fn new(size: NonZeroUsize) -> SearchResult<Self> {
        let (sender, jobs) = unbounded::<Job>();
        let (exited_tx, exited) = unbounded();
        let interrupt = Interrupt::new();
        let counters = Arc::new(Counters::default());

        let mut workers = Vec::with_capacity(size.get());
        for id in 0..size.get() {
            workers.push(Worker::spawn(
                id,
                jobs.clone(),
                exited_tx.clone(),
                interrupt.clone(),
                Arc::clone(&counters),
            )?);
        }
        debug!("Started worker pool with {} threads", size);

        Ok(Self {
            workers,
            sender: Some(sender),
            exited,
            interrupt,
            counters,
            submitted: 0,
            phase: PoolPhase::Idle,
        })
    }

    /// Number of worker threads
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn phase(&self) -> PoolPhase {
        self.phase
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            submitted: self.submitted,
            completed: self.counters.completed.load(Ordering::SeqCst),
            peak_running: self.counters.peak_running.load(Ordering::SeqCst),
        }
    }

    /// Queues `task` and returns the handle its outcome will be delivered to
    pub fn submit<T: Task>(&mut self, task: T) -> TaskHandle<T::Output> {
        let id = self.submitted;
        let label = task.describe();
        let (outcome_tx, receiver) = bounded(1);

        let job_label = label.clone();
        let job: Job = Box::new(move |interrupt: &Interrupt| {
            let outcome = if interrupt.is_set() {
                TaskOutcome::Failure(SearchError::interrupted(job_label))
            } else {
                match panic::catch_unwind(AssertUnwindSafe(|| task.run(interrupt))) {
                    Ok(result) => TaskOutcome::from(result),
                    Err(payload) => TaskOutcome::Failure(SearchError::task_panicked(
                        job_label,
                        panic_message(payload.as_ref()),
                    )),
                }
            };
            // The handle may already be gone; nobody is waiting then
            let _ = outcome_tx.send(outcome);
        });

        if let Some(sender) = &self.sender {
            // Workers hold the receiver until the sender is dropped, so this cannot fail
            if sender.send(job).is_err() {
                warn!("Task queue closed before {} was queued", label);
            }
        }

        self.submitted += 1;
        self.phase = PoolPhase::Accepting;
        trace!("Queued task {}: {}", id, label);

        TaskHandle {
            id,
            label,
            receiver,
        }
    }

    /// Closes the queue and waits up to `grace` for every task to finish.
    ///
    /// If workers are still busy after `grace`, the interrupt flag is raised and the
    /// pool waits a further short period before detaching any worker that is still
    /// blocked.
    pub fn shutdown(mut self, grace: Duration) -> PoolTermination {
        self.sender.take();
        self.phase = PoolPhase::Draining;
        debug!("Draining worker pool ({} tasks submitted)", self.submitted);

        let remaining = self.wait_for_exit(Instant::now() + grace);
        let termination = if remaining == 0 {
            PoolTermination::Graceful
        } else {
            warn!(
                "{} workers still busy after {:?}, interrupting remaining tasks",
                remaining, grace
            );
            self.interrupt.set();
            let unfinished_workers = self.wait_for_exit(Instant::now() + INTERRUPT_GRACE);
            if unfinished_workers > 0 {
                warn!("Detaching {} unresponsive workers", unfinished_workers);
                for worker in &mut self.workers {
                    worker.thread.take();
                }
            }
            PoolTermination::Forced { unfinished_workers }
        };

        self.phase = PoolPhase::Terminated;
        termination
    }

    /// Joins workers as they report exit; returns how many are still running at `deadline`
    fn wait_for_exit(&mut self, deadline: Instant) -> usize {
        loop {
            let running = self.workers.iter().filter(|w| w.thread.is_some()).count();
            if running == 0 {
                return 0;
            }
            match self.exited.recv_deadline(deadline) {
                Ok(id) => {
                    if let Some(worker) = self.workers.iter_mut().find(|w| w.id == id) {
                        if let Some(thread) = worker.thread.take() {
                            let _ = thread.join();
                        }
                    }
                }
                Err(_) => return running,
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.phase == PoolPhase::Terminated {
            return;
        }
        self.sender.take();
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                let _ = thread.join();
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
