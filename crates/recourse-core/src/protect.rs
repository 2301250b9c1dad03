//! Guaranteed cleanup

use std::panic::{self, AssertUnwindSafe};

/// Run `body`, then every cleanup action in order, on every exit path.
///
/// If `body` is being unwound (a panic, or a non-local exit from a handler
/// or restart case further out), the unwind is held while the cleanups run
/// and then resumed with its original payload.
///
/// ```rust
/// use recourse_core::unwind_protect;
///
/// let mut closed = false;
/// let value = unwind_protect(|| 7, [|| closed = true]);
/// assert_eq!(value, 7);
/// assert!(closed);
/// ```
pub fn unwind_protect<T, B, I, F>(body: B, cleanups: I) -> T
where
    B: FnOnce() -> T,
    I: IntoIterator<Item = F>,
    F: FnOnce(),
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(body));
    if outcome.is_err() {
        tracing::trace!("running cleanups during unwind");
    }
    for cleanup in cleanups {
        cleanup();
    }
    match outcome {
        Ok(value) => value,
        Err(payload) => panic::resume_unwind(payload),
    }
}
