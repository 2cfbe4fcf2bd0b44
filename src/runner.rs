//! The periodic runner: one background thread calling a [`Task`] every `interval`.
//!
//! The owner and the worker share the task's [`ArgumentSet`] and a stop flag behind a single
//! reentrant lock. The worker holds that lock for the length of one invocation and sleeps
//! outside it, so the owner can batch several writes under [`PeriodicRunner::lock`] and the
//! next invocation sees all of them or none.

use std::any::Any;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::args::ArgumentSet;
use crate::error::ProgressError;
use crate::lock::{SharedGuard, SharedLock};
use crate::logger::{Diagnostics, Logger};
use crate::task::{Body, Task};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunnerState {
    Created,
    Started,
    Stopping,
    Stopped,
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Started => "started",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        })
    }
}

pub struct RunnerOptions {
    pub interval: Duration,
    /// Start the worker before `new` returns.
    pub auto_start: bool,
    pub thread_name: Option<String>,
    /// Trace every lock acquire/release through [`Diagnostics::trace`].
    pub trace_lock: bool,
    /// Defaults to a [`Logger`] writing to stderr.
    pub diagnostics: Option<Arc<dyn Diagnostics>>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            auto_start: true,
            thread_name: None,
            trace_lock: false,
            diagnostics: None,
        }
    }
}

impl RunnerOptions {
    pub fn interval_secs(mut self, seconds: f64) -> Result<Self, ProgressError> {
        self.interval = interval_from_secs(seconds)?;
        Ok(self)
    }
}

pub fn interval_from_secs(seconds: f64) -> Result<Duration, ProgressError> {
    Duration::try_from_secs_f64(seconds).map_err(|_| ProgressError::InvalidInterval(seconds))
}

struct Shared<V> {
    args: RefCell<ArgumentSet<V>>,
    stop: Cell<bool>,
}

impl<V> Shared<V> {
    fn args(&self) -> Result<Ref<'_, ArgumentSet<V>>, ProgressError> {
        self.args.try_borrow().map_err(|_| ProgressError::ArgumentsBusy)
    }

    fn args_mut(&self) -> Result<RefMut<'_, ArgumentSet<V>>, ProgressError> {
        self.args
            .try_borrow_mut()
            .map_err(|_| ProgressError::ArgumentsBusy)
    }
}

struct Worker<V> {
    task_name: String,
    body: Body<V>,
    shared: Arc<SharedLock<Shared<V>>>,
    interval: Duration,
    diagnostics: Arc<dyn Diagnostics>,
    finished: Arc<AtomicBool>,
}

impl<V: Clone> Worker<V> {
    fn run(mut self) {
        loop {
            {
                let guard = self.shared.lock();
                if guard.stop.get() {
                    break;
                }
                let values = guard.args().and_then(|args| args.bound_values());
                let outcome = match values {
                    Ok(values) => invoke(&mut self.body, &values),
                    Err(err) => Err(err.to_string()),
                };
                if let Err(message) = outcome {
                    self.diagnostics.report(&format!(
                        "periodic task '{}' failed (ignored): {}",
                        self.task_name, message
                    ));
                    self.diagnostics.transition(&format!(
                        "invoke_failed task={} err={}",
                        self.task_name, message
                    ));
                }
            }
            thread::sleep(self.interval);
        }
        self.finished.store(true, Ordering::SeqCst);
        self.diagnostics
            .transition(&format!("runner stopped task={}", self.task_name));
    }
}

fn invoke<V>(body: &mut Body<V>, values: &[V]) -> Result<(), String> {
    match catch_unwind(AssertUnwindSafe(|| (*body)(values))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(err.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic payload".to_string()
}

/// Calls a task periodically on its own thread.
///
/// ```no_run
/// use progress::{PeriodicRunner, RunnerOptions, Task};
///
/// let task = Task::new("report", ["count", "total"], |args: &[u64]| {
///     eprintln!("progress: {}/{}", args[0], args[1]);
///     Ok(())
/// });
/// let runner = PeriodicRunner::new(
///     task,
///     RunnerOptions { auto_start: false, ..RunnerOptions::default() },
/// )?;
/// for count in 0..10u64 {
///     {
///         let args = runner.lock();
///         args.set("count", count)?;
///         args.set("total", 10u64)?;
///     }
///     runner.start()?;
/// }
/// runner.stop();
/// # Ok::<(), progress::ProgressError>(())
/// ```
pub struct PeriodicRunner<V> {
    task_name: String,
    thread_name: Option<String>,
    interval: Duration,
    shared: Arc<SharedLock<Shared<V>>>,
    // The start gate: whoever takes the worker out of the slot spawns it.
    pending: Mutex<Option<Worker<V>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
    stop_requested: AtomicBool,
    finished: Arc<AtomicBool>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl<V> PeriodicRunner<V>
where
    V: Clone + Send + 'static,
{
    pub fn new(task: Task<V>, options: RunnerOptions) -> Result<Self, ProgressError> {
        let (task_name, args, body) = task.into_parts()?;
        let diagnostics: Arc<dyn Diagnostics> = options
            .diagnostics
            .unwrap_or_else(|| Arc::new(Logger::stderr()));

        let state = Shared {
            args: RefCell::new(args),
            stop: Cell::new(false),
        };
        let shared = if options.trace_lock {
            let label = options.thread_name.as_deref().unwrap_or(&task_name);
            SharedLock::traced(state, label, diagnostics.clone())
        } else {
            SharedLock::new(state)
        };
        let shared = Arc::new(shared);
        let finished = Arc::new(AtomicBool::new(false));

        let worker = Worker {
            task_name: task_name.clone(),
            body,
            shared: shared.clone(),
            interval: options.interval,
            diagnostics: diagnostics.clone(),
            finished: finished.clone(),
        };

        let runner = Self {
            task_name,
            thread_name: options.thread_name,
            interval: options.interval,
            shared,
            pending: Mutex::new(Some(worker)),
            handle: Mutex::new(None),
            started: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            finished,
            diagnostics,
        };
        if options.auto_start {
            runner.start()?;
        }
        Ok(runner)
    }

    /// Launches the worker on the first call; every later or concurrent call is a no-op.
    pub fn start(&self) -> Result<(), ProgressError> {
        let mut pending = self.pending.lock();
        let Some(worker) = pending.take() else {
            return Ok(());
        };
        let mut builder = thread::Builder::new();
        if let Some(name) = &self.thread_name {
            builder = builder.name(name.clone());
        }
        let handle = builder
            .spawn(move || worker.run())
            .map_err(ProgressError::Spawn)?;
        *self.handle.lock() = Some(handle);
        self.started.store(true, Ordering::SeqCst);
        self.diagnostics.transition(&format!(
            "runner start task={} interval={:?}",
            self.task_name, self.interval
        ));
        Ok(())
    }

    /// Waits for the worker to exit. Returns `false` when there was no thread to join.
    pub fn join(&self) -> bool {
        let handle = self.handle.lock().take();
        match handle {
            Some(handle) => handle.join().is_ok(),
            None => false,
        }
    }

    /// Sets a single argument under its own lock acquisition.
    pub fn set(&self, name: &str, value: impl Into<V>) -> Result<(), ProgressError> {
        self.lock().set(name, value)
    }

    pub fn get(&self, name: &str) -> Result<Option<V>, ProgressError> {
        self.lock().get(name)
    }
}

impl<V> PeriodicRunner<V> {
    /// Acquires the runner lock. Writes made through one guard reach the task together.
    pub fn lock(&self) -> ArgsGuard<'_, V> {
        ArgsGuard {
            guard: self.shared.lock(),
        }
    }

    /// Asks the worker to exit at its next wake-up. Never waits for it.
    pub fn stop(&self) {
        self.shared.lock().stop.set(true);
        if self.stop_requested.swap(true, Ordering::SeqCst) {
            return;
        }
        // A worker that was never launched is discarded so later `start` calls stay no-ops.
        let unlaunched = self.pending.lock().take();
        if unlaunched.is_some() {
            self.finished.store(true, Ordering::SeqCst);
        }
        self.diagnostics
            .transition(&format!("runner stop_requested task={}", self.task_name));
    }

    pub fn state(&self) -> RunnerState {
        if self.finished.load(Ordering::SeqCst) {
            return RunnerState::Stopped;
        }
        match (
            self.started.load(Ordering::SeqCst),
            self.stop_requested.load(Ordering::SeqCst),
        ) {
            (false, _) => RunnerState::Created,
            (true, false) => RunnerState::Started,
            (true, true) => RunnerState::Stopping,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == RunnerState::Stopped
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The worker thread's name, if one was given.
    pub fn name(&self) -> Option<&str> {
        self.thread_name.as_deref()
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }
}

impl<V> Drop for PeriodicRunner<V> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<V> fmt::Debug for PeriodicRunner<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicRunner")
            .field("task", &self.task_name)
            .field("thread_name", &self.thread_name)
            .field("interval", &self.interval)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Scoped access to the runner's arguments; the lock is released on drop.
pub struct ArgsGuard<'a, V> {
    guard: SharedGuard<'a, Shared<V>>,
}

impl<V> ArgsGuard<'_, V> {
    pub fn set(&self, name: &str, value: impl Into<V>) -> Result<(), ProgressError> {
        self.guard.args_mut()?.set_by_name(name, value.into())
    }

    /// Direct access to the argument set for the length of `f`.
    ///
    /// The lock stays reentrant inside `f`: `stop` works, while other argument accesses
    /// through the runner return [`ProgressError::ArgumentsBusy`] instead of blocking.
    pub fn with_args<R>(
        &self,
        f: impl FnOnce(&mut ArgumentSet<V>) -> R,
    ) -> Result<R, ProgressError> {
        let mut args = self.guard.args_mut()?;
        Ok(f(&mut args))
    }

    pub fn names(&self) -> Result<Vec<String>, ProgressError> {
        Ok(self.guard.args()?.names().to_vec())
    }
}

impl<V: Clone> ArgsGuard<'_, V> {
    pub fn get(&self, name: &str) -> Result<Option<V>, ProgressError> {
        Ok(self.guard.args()?.get_by_name(name)?.cloned())
    }

    pub fn get_index(&self, index: usize) -> Result<Option<V>, ProgressError> {
        Ok(self.guard.args()?.get(index)?.cloned())
    }

    pub fn snapshot(&self) -> Result<Vec<Option<V>>, ProgressError> {
        Ok(self.guard.args()?.snapshot())
    }
}
