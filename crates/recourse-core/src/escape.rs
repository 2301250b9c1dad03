//! Non-local exit
//!
//! An [`ExitPoint`] marks a frame that inner code can unwind back to. It pairs
//! a process-unique [`Token`] with a slot for the value being carried.
//! [`ExitPoint::exit_with`] stores the value and starts an unwind whose
//! payload holds only the token; [`ExitPoint::catch`] stops exactly the
//! unwinds carrying its own token and re-raises everything else untouched,
//! whether that is another exit point's unwind or an ordinary panic.
//!
//! The payload type is private, so code outside this crate can neither forge
//! an exit nor swallow one by accident unless it catches every unwind.
//! Requires `panic = "unwind"`.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Identity of one exit point. Never reused within a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Token(u64);

impl Token {
    fn fresh() -> Self {
        Token(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

/// Unwind payload
struct Escape {
    token: Token,
}

/// How a body guarded by an exit point finished
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Outcome<R, T> {
    /// The body returned normally
    Returned(R),
    /// Inner code exited to this point with a value
    Unwound(T),
}

/// A frame that inner code can unwind back to, carrying a `T`
pub(crate) struct ExitPoint<T> {
    token: Token,
    slot: Rc<RefCell<Option<T>>>,
}

impl<T> Clone for ExitPoint<T> {
    fn clone(&self) -> Self {
        ExitPoint {
            token: self.token,
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T> ExitPoint<T> {
    pub(crate) fn new() -> Self {
        ExitPoint {
            token: Token::fresh(),
            slot: Rc::new(RefCell::new(None)),
        }
    }

    pub(crate) fn token(&self) -> Token {
        self.token
    }

    /// Unwind to the frame running [`ExitPoint::catch`] for this point
    pub(crate) fn exit_with(&self, value: T) -> ! {
        *self.slot.borrow_mut() = Some(value);
        tracing::trace!(token = self.token.0, "non-local exit");
        panic::resume_unwind(Box::new(Escape { token: self.token }))
    }

    /// Run `body`, intercepting exits aimed at this point
    pub(crate) fn catch<R>(&self, body: impl FnOnce() -> R) -> Outcome<R, T> {
        let payload = match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(value) => return Outcome::Returned(value),
            Err(payload) => payload,
        };

        let ours = payload
            .downcast_ref::<Escape>()
            .is_some_and(|escape| escape.token == self.token);
        if ours {
            if let Some(value) = self.slot.borrow_mut().take() {
                tracing::trace!(token = self.token.0, "non-local exit intercepted");
                return Outcome::Unwound(value);
            }
        }
        panic::resume_unwind(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        let a = ExitPoint::<()>::new();
        let b = ExitPoint::<()>::new();
        assert_ne!(a.token(), b.token());
        assert_eq!(a.clone().token(), a.token());
    }

    #[test]
    fn test_normal_return() {
        let exit = ExitPoint::<i32>::new();
        assert_eq!(exit.catch(|| "done"), Outcome::Returned("done"));
    }

    #[test]
    fn test_exit_from_depth() {
        fn deep(exit: &ExitPoint<i32>, n: u32) -> &'static str {
            if n == 0 {
                exit.exit_with(42)
            }
            deep(exit, n - 1)
        }

        let exit = ExitPoint::new();
        assert_eq!(exit.catch(|| deep(&exit, 10)), Outcome::Unwound(42));
    }

    #[test]
    fn test_foreign_exit_passes_through() {
        let outer = ExitPoint::<&str>::new();
        let inner = ExitPoint::<&str>::new();

        let result = outer.catch(|| {
            let inner_result = inner.catch(|| -> u8 { outer.exit_with("to outer") });
            panic!("inner frame intercepted {:?}", inner_result);
        });
        assert_eq!(result, Outcome::Unwound("to outer"));
    }

    #[test]
    fn test_panics_are_not_intercepted() {
        let exit = ExitPoint::<()>::new();
        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            exit.catch(|| panic!("real failure"));
        }));

        let payload = caught.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"real failure"));
    }
}
