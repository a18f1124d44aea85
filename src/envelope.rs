use std::sync::atomic::AtomicPtr;

/// The heap-allocated unit of work moving through the pool's queues.
///
/// Owns a type-erased, zero-argument closure — the user's callable already
/// bound to its arguments and, via captured state, to its
/// [`JoinHandle`](crate::JoinHandle)'s completion slot. `next` is a
/// non-owning link used only while the envelope is resident on the overflow
/// list; it carries no meaning while the envelope sits in a local ring.
///
/// Allocated at submission, freed by whichever worker executes it — envelopes
/// are never recycled back onto a queue (see `overflow.rs`'s module doc for
/// why that sidesteps the ABA hazard of a naive Treiber stack).
pub(crate) struct TaskEnvelope {
    task: Option<Box<dyn FnOnce() + Send + 'static>>,
    pub(crate) next: AtomicPtr<TaskEnvelope>,
}

impl TaskEnvelope {
    pub(crate) fn new(task: Box<dyn FnOnce() + Send + 'static>) -> Box<Self> {
        Box::new(Self {
            task: Some(task),
            next: AtomicPtr::new(std::ptr::null_mut()),
        })
    }

    /// Runs the closure exactly once. The closure itself is responsible for
    /// catching its own panics and resolving the completion handle — see
    /// [`crate::pool::build_envelope`] — so this is a plain call, not a
    /// `catch_unwind` site.
    pub(crate) fn run(mut self: Box<Self>) {
        let task = self.task.take().expect("TaskEnvelope::run called twice");
        task();
    }
}
