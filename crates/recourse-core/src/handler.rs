//! Handlers and condition dispatch
//!
//! [`signal`] runs the innermost matching handler on top of the signaler's
//! stack; nothing is unwound unless the handler itself transfers control, for
//! example by invoking a restart bound by [`crate::restart_case`].
//! [`handler_case`] builds the familiar "catch" behavior on top of that: its
//! handler runs, then the stack unwinds back to the `handler_case` call.

use std::rc::Rc;

use crate::condition::{Condition, ConditionType};
use crate::context::{self, HandlerBinding};
use crate::error::{ConditionError, ConditionResult};
use crate::escape::{ExitPoint, Outcome};

fn check_type(ty: &ConditionType) -> ConditionResult<()> {
    if !ty.is_recognized() {
        return Err(ConditionError::InvalidArgument(format!(
            "{:?} does not name a condition type",
            ty.name()
        )));
    }
    Ok(())
}

/// Run `body` with `handler` bound for conditions of type `ty`.
///
/// The handler is called by [`signal`] / [`error`] from anywhere inside
/// `body`, with the signaling frames still on the stack. Returns the body's
/// result unchanged.
pub fn handler_bind<T, H, B>(ty: &ConditionType, handler: H, body: B) -> ConditionResult<T>
where
    H: Fn(&dyn Condition) + 'static,
    B: FnOnce() -> T,
{
    check_type(ty)?;
    let _frame = context::push_handler(HandlerBinding {
        ty: ty.clone(),
        callback: Rc::new(handler),
    })?;
    Ok(body())
}

/// Run `body`; if a condition of type `ty` is signaled inside it, run
/// `handler`, abandon the rest of `body` and return the handler's value.
pub fn handler_case<T, H, B>(ty: &ConditionType, handler: H, body: B) -> ConditionResult<T>
where
    T: 'static,
    H: Fn(&dyn Condition) -> T + 'static,
    B: FnOnce() -> T,
{
    check_type(ty)?;
    let exit = ExitPoint::new();
    let unwind_to = exit.clone();
    let wrapped = move |condition: &dyn Condition| {
        unwind_to.exit_with(handler(condition));
    };

    match exit.catch(|| handler_bind(ty, wrapped, body)) {
        Outcome::Returned(result) => result,
        Outcome::Unwound(value) => {
            tracing::debug!(condition_type = %ty, token = ?exit.token(), "handler case unwound");
            Ok(value)
        }
    }
}

/// Offer `condition` to the innermost handler whose type accepts it.
///
/// At most one handler runs. Returns normally when that handler returns, or
/// when no handler matches.
pub fn signal(condition: &dyn Condition) {
    match context::find_handler(condition) {
        Some(binding) => {
            tracing::debug!(condition = ?condition, condition_type = %binding.ty, "dispatching to handler");
            (binding.callback)(condition);
        }
        None => tracing::trace!(condition = ?condition, "no handler for condition"),
    }
}

/// Signal `condition`, then hand it back as an error.
///
/// The result is always `Err(condition)` with the very instance that was
/// signaled, meant to be propagated with `?`. A handler can only resume the
/// computation by transferring control, for instance through a restart; in
/// that case this function does not return at all.
pub fn error<C: Condition, T>(condition: C) -> Result<T, C> {
    signal(&condition);
    Err(condition)
}
