use std::any::Any;

/// A single-use unit of work.
///
/// `run` consumes the boxed task, so a task can never execute twice and is
/// destroyed as soon as it returns. A task the scheduler never gets to is
/// simply dropped; implementors that hold resources release them in `Drop`.
pub trait Task: Send + 'static {
    fn run(self: Box<Self>);
}

impl<F> Task for F
where
    F: FnOnce() + Send + 'static,
{
    fn run(self: Box<Self>) {
        (*self)()
    }
}

/// Owned handle stored in the background and foreground queues.
pub type BoxedTask = Box<dyn Task>;

/// Best-effort text of a panic payload (`&str` or `String`, else a placeholder).
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
