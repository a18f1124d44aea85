use thiserror::Error;

/// Failure of a submitted task, delivered through its [`JoinHandle`](crate::JoinHandle).
#[derive(Debug, Error)]
pub enum TaskError {
    /// The task's closure panicked. The pool catches the unwind at the
    /// envelope boundary so one failing task never takes down a worker
    /// thread or any other task.
    #[error("task panicked: {message}")]
    Panicked {
        /// The panic payload, downcast to a string where possible.
        message: String,
    },
    /// The pool was torn down while this task was still queued; it was
    /// deallocated unexecuted during drain rather than run.
    #[error("task was dropped during pool shutdown before it ran")]
    Lost,
}

impl TaskError {
    pub(crate) fn from_panic_payload(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        TaskError::Panicked { message }
    }
}
