use std::ops::Deref;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::logger::Diagnostics;

/// A reentrant lock around runner state, optionally tracing every acquire and release.
///
/// A reentrant guard only hands out shared access, so `T` carries its own cells.
pub(crate) struct SharedLock<T> {
    inner: ReentrantMutex<T>,
    trace: Option<LockTrace>,
}

struct LockTrace {
    label: String,
    diagnostics: Arc<dyn Diagnostics>,
}

impl<T> SharedLock<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            inner: ReentrantMutex::new(value),
            trace: None,
        }
    }

    pub(crate) fn traced(value: T, label: impl Into<String>, diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            inner: ReentrantMutex::new(value),
            trace: Some(LockTrace {
                label: label.into(),
                diagnostics,
            }),
        }
    }

    pub(crate) fn lock(&self) -> SharedGuard<'_, T> {
        let guard = self.inner.lock();
        if let Some(trace) = &self.trace {
            trace.diagnostics.trace(&format!(">locked ({})", trace.label));
        }
        SharedGuard {
            guard,
            trace: self.trace.as_ref(),
        }
    }
}

pub(crate) struct SharedGuard<'a, T> {
    guard: ReentrantMutexGuard<'a, T>,
    trace: Option<&'a LockTrace>,
}

impl<T> Deref for SharedGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> Drop for SharedGuard<'_, T> {
    fn drop(&mut self) {
        // Runs before `guard` is dropped, so the message precedes the actual release.
        if let Some(trace) = self.trace {
            trace.diagnostics.trace(&format!("<unlocked ({})", trace.label));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::cell::Cell;

    #[derive(Default)]
    struct Recorder {
        lines: Mutex<Vec<String>>,
    }

    impl Diagnostics for Recorder {
        fn report(&self, message: &str) {
            self.lines.lock().push(format!("report {message}"));
        }

        fn trace(&self, message: &str) {
            self.lines.lock().push(message.to_string());
        }
    }

    #[test]
    fn nested_lock_on_same_thread_does_not_deadlock() {
        let lock = SharedLock::new(Cell::new(0u32));
        let outer = lock.lock();
        outer.set(outer.get() + 1);
        {
            let inner = lock.lock();
            inner.set(inner.get() + 1);
        }
        assert_eq!(outer.get(), 2);
    }

    #[test]
    fn traced_lock_logs_acquire_and_release_in_order() {
        let recorder = Arc::new(Recorder::default());
        let lock = SharedLock::traced((), "dbglock", recorder.clone());
        {
            let _outer = lock.lock();
            let _inner = lock.lock();
        }
        assert_eq!(
            *recorder.lines.lock(),
            vec![
                ">locked (dbglock)",
                ">locked (dbglock)",
                "<unlocked (dbglock)",
                "<unlocked (dbglock)",
            ]
        );
    }
}
