use crate::error::TaskError;
use std::sync::{Arc, Condvar, Mutex};

/// Shared state backing a [`JoinHandle`]: a one-shot slot plus the
/// condition variable the submitter blocks on. This is the "completion
/// handle" the design treats as an external collaborator — the core only
/// needs it to expose set-value, set-error, and blocking-wait.
pub(crate) struct JoinState<R> {
    slot: Mutex<Option<Result<R, TaskError>>>,
    ready: Condvar,
}

impl<R> JoinState<R> {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(None),
            ready: Condvar::new(),
        })
    }

    fn resolve(&self, result: Result<R, TaskError>) {
        let mut slot = self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = Some(result);
        self.ready.notify_one();
    }

    fn wait(&self) -> Result<R, TaskError> {
        let mut slot = self.slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        while slot.is_none() {
            slot = self
                .ready
                .wait(slot)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
        slot.take().expect("condvar woke with no result set")
    }
}

/// A one-shot, waitable handle to a submitted task's outcome.
///
/// Returned by [`Pool::submit`](crate::Pool::submit). The task's full effects
/// happen-before [`JoinHandle::get`] returns: the submitter observes them the
/// moment it successfully waits on the handle.
pub struct JoinHandle<R> {
    state: Arc<JoinState<R>>,
}

impl<R> JoinHandle<R> {
    pub(crate) fn new_pair() -> (Self, Arc<JoinState<R>>) {
        let state = JoinState::new();
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }

    /// Blocks until the task completes, returning its value or re-raising
    /// the captured failure.
    pub fn get(self) -> Result<R, TaskError> {
        self.state.wait()
    }
}

pub(crate) fn resolve_value<R>(state: &JoinState<R>, value: R) {
    state.resolve(Ok(value));
}

pub(crate) fn resolve_error<R>(state: &JoinState<R>, error: TaskError) {
    state.resolve(Err(error));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn get_returns_value_set_before_wait() {
        let (handle, state) = JoinHandle::<i32>::new_pair();
        resolve_value(&state, 42);
        assert_eq!(handle.get().unwrap(), 42);
    }

    #[test]
    fn get_blocks_until_resolved_from_another_thread() {
        let (handle, state) = JoinHandle::<i32>::new_pair();
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            resolve_value(&state, 7);
        });
        assert_eq!(handle.get().unwrap(), 7);
        t.join().unwrap();
    }

    #[test]
    fn get_reraises_error() {
        let (handle, state) = JoinHandle::<i32>::new_pair();
        resolve_error(&state, TaskError::Lost);
        assert!(matches!(handle.get(), Err(TaskError::Lost)));
    }
}
