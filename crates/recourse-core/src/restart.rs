//! Restarts: named recovery points
//!
//! A restart is bound for the dynamic extent of a body with [`restart_bind`]
//! or [`restart_case`]. Any code running inside that extent, including a
//! handler invoked by [`crate::signal`], can look it up by name and invoke
//! it without knowing who provided it.
//!
//! Names need not be unique. Lookup always resolves to the nearest (most
//! recently bound) restart with that name; there is no applicability
//! filtering beyond the name.

use std::any::{self, Any};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::context;
use crate::error::{ConditionError, ConditionResult};
use crate::escape::{ExitPoint, Outcome};

type RestartFn = Rc<dyn Fn(Box<dyn Any>) -> ConditionResult<Box<dyn Any>>>;

/// Handle to a bound restart.
///
/// Handles may be cloned and kept, but a restart can only be invoked while
/// its binding is live; afterwards [`Restart::invoke`] fails with
/// [`ConditionError::RestartInactive`].
#[derive(Clone)]
pub struct Restart {
    name: Rc<str>,
    callback: RestartFn,
    active: Rc<Cell<bool>>,
}

impl Restart {
    fn new<P, R, F>(name: &str, restart: F) -> Self
    where
        P: Any,
        R: Any,
        F: Fn(P) -> R + 'static,
    {
        let name: Rc<str> = Rc::from(name);
        let callback_name = Rc::clone(&name);
        let callback = move |param: Box<dyn Any>| -> ConditionResult<Box<dyn Any>> {
            let param = param
                .downcast::<P>()
                .map_err(|_| ConditionError::RestartArgument {
                    name: callback_name.to_string(),
                    expected: any::type_name::<P>(),
                })?;
            Ok(Box::new(restart(*param)) as Box<dyn Any>)
        };

        Restart {
            name,
            callback: Rc::new(callback),
            active: Rc::new(Cell::new(true)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Is the binding that created this handle still live?
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Call the restart with `param`.
    ///
    /// If the restart was bound by [`restart_case`] this does not return:
    /// control unwinds to the `restart_case` call instead.
    pub fn invoke<P: Any>(&self, param: P) -> ConditionResult<RestartValue> {
        if !self.is_active() {
            return Err(ConditionError::RestartInactive {
                name: self.name.to_string(),
            });
        }
        tracing::debug!(restart = %self.name, "invoking restart");
        (self.callback)(Box::new(param)).map(RestartValue)
    }

    pub(crate) fn deactivate(&self) {
        self.active.set(false);
    }
}

impl fmt::Debug for Restart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Restart")
            .field("name", &self.name)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Type-erased value returned by a restart
pub struct RestartValue(Box<dyn Any>);

impl RestartValue {
    pub fn is<R: Any>(&self) -> bool {
        self.0.is::<R>()
    }

    pub fn downcast_ref<R: Any>(&self) -> Option<&R> {
        self.0.downcast_ref::<R>()
    }

    /// Take the value out as an `R`, or get `self` back if it is not one
    pub fn downcast<R: Any>(self) -> Result<R, RestartValue> {
        self.0.downcast::<R>().map(|r| *r).map_err(RestartValue)
    }
}

impl fmt::Debug for RestartValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RestartValue(..)")
    }
}

fn check_name(name: &str) -> ConditionResult<()> {
    if name.is_empty() {
        return Err(ConditionError::InvalidArgument(
            "restart name must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Make `restart` available as `name` while `body` runs.
///
/// Returns the body's result. Invoking the restart calls it in place, on top
/// of the invoker's stack; use [`restart_case`] to unwind back here instead.
pub fn restart_bind<P, R, T, F, B>(name: &str, restart: F, body: B) -> ConditionResult<T>
where
    P: Any,
    R: Any,
    F: Fn(P) -> R + 'static,
    B: FnOnce() -> T,
{
    check_name(name)?;
    let _frame = context::push_restart(Restart::new(name, restart))?;
    Ok(body())
}

/// Run `body` with a restart that, when invoked, abandons the rest of `body`
/// and makes the restart's result the result of this call.
pub fn restart_case<P, T, F, B>(name: &str, restart: F, body: B) -> ConditionResult<T>
where
    P: Any,
    T: 'static,
    F: Fn(P) -> T + 'static,
    B: FnOnce() -> T,
{
    check_name(name)?;
    let exit = ExitPoint::new();
    let unwind_to = exit.clone();
    let wrapped = move |param: P| -> T { unwind_to.exit_with(restart(param)) };

    match exit.catch(|| restart_bind(name, wrapped, body)) {
        Outcome::Returned(result) => result,
        Outcome::Unwound(value) => {
            tracing::debug!(restart = name, token = ?exit.token(), "restart unwound its case");
            Ok(value)
        }
    }
}

/// Nearest live restart named `name`, or `None`
pub fn find_restart(name: &str) -> Option<Restart> {
    context::lookup_restart(name)
}

/// Nearest live restart named `name`.
///
/// When nothing matches, fails with [`ConditionError::RestartNotFound`] if
/// `throw_on_error` is set and returns `Ok(None)` otherwise.
pub fn find_restart_or_fail(name: &str, throw_on_error: bool) -> ConditionResult<Option<Restart>> {
    match find_restart(name) {
        Some(restart) => Ok(Some(restart)),
        None if throw_on_error => {
            tracing::warn!(restart = name, "restart not found");
            Err(ConditionError::not_found(name))
        }
        None => Ok(None),
    }
}

/// Invoke the nearest restart named `name` with `param`
pub fn invoke_restart<P: Any>(name: &str, param: P) -> ConditionResult<RestartValue> {
    match find_restart(name) {
        Some(restart) => restart.invoke(param),
        None => {
            tracing::warn!(restart = name, "restart not found");
            Err(ConditionError::not_found(name))
        }
    }
}

/// Every live restart, innermost first.
///
/// Shadowed restarts are included, so a name may appear more than once.
pub fn compute_restarts() -> Vec<Restart> {
    context::snapshot_restarts()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::restart_depth;

    #[test]
    fn test_restart_bind_invokes_in_place() {
        let result = restart_bind(
            "use-value",
            |v: i32| v * 2,
            || {
                let value = invoke_restart("use-value", 21).unwrap();
                value.downcast::<i32>().unwrap() + 1
            },
        );
        assert_eq!(result, Ok(43));
        assert_eq!(restart_depth(), 0);
    }

    #[test]
    fn test_restart_case_short_circuits() {
        let reached = Rc::new(Cell::new(false));
        let flag = Rc::clone(&reached);

        let result = restart_case(
            "ReturnValue",
            |param: i32| param,
            move || {
                let _ = invoke_restart("ReturnValue", 0);
                flag.set(true);
                99
            },
        );

        assert_eq!(result, Ok(0));
        assert!(!reached.get());
        assert_eq!(restart_depth(), 0);
    }

    #[test]
    fn test_nearest_name_wins() {
        let result = restart_bind(
            "retry",
            |_: ()| "outer",
            || {
                restart_bind(
                    "retry",
                    |_: ()| "inner",
                    || invoke_restart("retry", ()).unwrap().downcast::<&str>().unwrap(),
                )
            },
        );
        assert_eq!(result, Ok(Ok("inner")));
    }

    #[test]
    fn test_find_restart_absent() {
        assert!(find_restart("x").is_none());
        assert!(matches!(find_restart_or_fail("x", false), Ok(None)));

        let err = find_restart_or_fail("x", true).unwrap_err();
        assert_eq!(err, ConditionError::RestartNotFound { name: "x".into() });
        assert_eq!(err.restart_name(), Some("x"));

        assert!(matches!(
            invoke_restart("x", ()),
            Err(ConditionError::RestartNotFound { .. })
        ));
    }

    #[test]
    fn test_compute_restarts_innermost_first() {
        let names = restart_bind("abort", |_: ()| (), || {
            restart_bind("retry", |_: ()| (), || {
                restart_bind("abort", |_: ()| (), || {
                    compute_restarts()
                        .iter()
                        .map(|r| r.name().to_string())
                        .collect::<Vec<_>>()
                })
            })
        });

        assert_eq!(
            names.unwrap().unwrap().unwrap(),
            vec!["abort", "retry", "abort"]
        );
        assert!(compute_restarts().is_empty());
    }

    #[test]
    fn test_parameter_type_mismatch() {
        let result = restart_bind(
            "use-value",
            |v: i32| v,
            || invoke_restart("use-value", "not an int").unwrap_err(),
        );
        assert_eq!(
            result,
            Ok(ConditionError::RestartArgument {
                name: "use-value".into(),
                expected: "i32",
            })
        );
    }

    #[test]
    fn test_escaped_handle_is_inactive() {
        let live = restart_case("abort", |_: ()| false, || {
            find_restart("abort").is_some_and(|r| r.is_active())
        });
        assert_eq!(live, Ok(true));

        let escaped = restart_bind("abort", |_: ()| (), || find_restart("abort")).unwrap();
        let escaped = escaped.unwrap();
        assert!(!escaped.is_active());
        assert_eq!(
            escaped.invoke(()).unwrap_err(),
            ConditionError::RestartInactive {
                name: "abort".into()
            }
        );
    }

    #[test]
    fn test_empty_name_rejected() {
        let ran = Cell::new(false);
        let result = restart_bind("", |_: ()| (), || ran.set(true));
        assert!(matches!(result, Err(ConditionError::InvalidArgument(_))));
        assert!(!ran.get());
        assert_eq!(restart_depth(), 0);
    }

    #[test]
    fn test_restart_value_downcast() {
        let value = restart_bind("v", |s: String| s.len(), || invoke_restart("v", String::from("abc")))
            .unwrap()
            .unwrap();
        assert!(value.is::<usize>());
        assert_eq!(value.downcast_ref::<usize>(), Some(&3));
        let value = value.downcast::<String>().unwrap_err();
        assert_eq!(value.downcast::<usize>().unwrap(), 3);
    }
}
