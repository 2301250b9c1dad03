//! End-to-end scenarios
//!
//! Each scenario runs a small division program under a different recovery
//! setup and returns its final value together with a trace of the steps
//! taken, so callers can check both the result and the path to it.

use std::cell::RefCell;
use std::rc::Rc;

use recourse_core::{
    error, handler_bind, handler_case, handler_depth, invoke_restart, restart_case,
    restart_depth, signal, unwind_protect, ConditionResult, ConditionType,
};

/// Condition raised when dividing by zero
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DivideByZero;

/// Shared, append-only step log
#[derive(Clone, Default)]
pub struct Trace(Rc<RefCell<Vec<&'static str>>>);

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self, step: &'static str) {
        self.0.borrow_mut().push(step);
    }

    pub fn steps(&self) -> Vec<&'static str> {
        self.0.borrow().clone()
    }

    pub fn contains(&self, step: &str) -> bool {
        self.0.borrow().iter().any(|s| *s == step)
    }
}

/// Outcome of one scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioResult {
    pub value: Result<i32, DivideByZero>,
    pub steps: Vec<&'static str>,
    /// Stack depths observed after the scenario finished
    pub handler_depth: usize,
    pub restart_depth: usize,
}

impl ScenarioResult {
    fn finish(value: Result<i32, DivideByZero>, trace: &Trace) -> Self {
        ScenarioResult {
            value,
            steps: trace.steps(),
            handler_depth: handler_depth(),
            restart_depth: restart_depth(),
        }
    }

    /// Both stacks are back to empty
    pub fn is_balanced(&self) -> bool {
        self.handler_depth == 0 && self.restart_depth == 0
    }
}

/// Signals the problem, then carries on with 0
pub fn div_signal(x: i32, y: i32, trace: &Trace) -> i32 {
    if y == 0 {
        signal(&DivideByZero);
        trace.step("signal returned");
        return 0;
    }
    x / y
}

/// Raises the problem as an error
pub fn div_error(x: i32, y: i32) -> Result<i32, DivideByZero> {
    if y == 0 {
        return error(DivideByZero);
    }
    Ok(x / y)
}

/// Raises the problem under a `ReturnValue` restart that supplies a result
pub fn div_restart(x: i32, y: i32, trace: &Trace) -> ConditionResult<Result<i32, DivideByZero>> {
    let restart_trace = trace.clone();
    restart_case(
        "ReturnValue",
        move |param: i32| {
            restart_trace.step("restart ReturnValue");
            Ok(param)
        },
        || {
            trace.step("entering restart case");
            div_error(x, y)
        },
    )
}

fn divide_by_zero() -> ConditionType {
    ConditionType::of::<DivideByZero>()
}

/// A handler that only logs; the signaler proceeds past the signal point
pub fn signal_and_continue() -> ConditionResult<ScenarioResult> {
    let trace = Trace::new();
    let handler_trace = trace.clone();

    let value = handler_bind(
        &divide_by_zero(),
        move |_| handler_trace.step("handler"),
        || {
            let value = div_signal(123, 0, &trace);
            trace.step("body returned");
            value
        },
    )?;

    Ok(ScenarioResult::finish(Ok(value), &trace))
}

/// `handler_case` around `unwind_protect` around a body that errors
pub fn handler_case_with_cleanup() -> ConditionResult<ScenarioResult> {
    let trace = Trace::new();
    let handler_trace = trace.clone();

    let value = handler_case(
        &divide_by_zero(),
        move |_| {
            handler_trace.step("handler");
            Ok(0)
        },
        || {
            unwind_protect(
                || -> Result<i32, DivideByZero> {
                    trace.step("entering protected body");
                    let value = div_error(123, 0)?;
                    trace.step("after error");
                    Ok(value)
                },
                [|| trace.step("cleanup")],
            )
        },
    )?;

    Ok(ScenarioResult::finish(value, &trace))
}

/// A handler that resumes the computation through a restart
pub fn handler_invokes_restart() -> ConditionResult<ScenarioResult> {
    let trace = Trace::new();
    let handler_trace = trace.clone();

    let value = handler_bind(
        &divide_by_zero(),
        move |_| {
            handler_trace.step("handler");
            let _ = invoke_restart("ReturnValue", 0);
            handler_trace.step("handler returned");
        },
        || div_restart(123, 0, &trace),
    )??;

    Ok(ScenarioResult::finish(value, &trace))
}

/// No handler at all: the error reaches the caller untouched
pub fn unhandled_error() -> ScenarioResult {
    let trace = Trace::new();
    let value = unwind_protect(|| div_error(123, 0), [|| trace.step("cleanup")]);
    ScenarioResult::finish(value, &trace)
}

/// Bindings on one thread must not be seen on another
pub fn isolated_contexts() -> ConditionResult<bool> {
    handler_bind(
        &divide_by_zero(),
        |_| panic!("handler leaked across threads"),
        || {
            std::thread::spawn(|| {
                signal(&DivideByZero);
                handler_depth() == 0 && div_error(1, 0) == Err(DivideByZero)
            })
            .join()
            .unwrap_or(false)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_and_continue() {
        let result = signal_and_continue().unwrap();

        assert_eq!(result.value, Ok(0));
        assert_eq!(
            result.steps,
            vec!["handler", "signal returned", "body returned"]
        );
        assert!(result.is_balanced());
    }

    #[test]
    fn test_handler_case_with_cleanup() {
        let result = handler_case_with_cleanup().unwrap();

        assert_eq!(result.value, Ok(0));
        assert_eq!(
            result.steps,
            vec!["entering protected body", "handler", "cleanup"]
        );
        assert!(!result.steps.contains(&"after error"));
        assert!(result.is_balanced());
    }

    #[test]
    fn test_handler_invokes_restart() {
        let result = handler_invokes_restart().unwrap();

        assert_eq!(result.value, Ok(0));
        assert_eq!(
            result.steps,
            vec!["entering restart case", "handler", "restart ReturnValue"]
        );
        assert!(result.is_balanced());
    }

    #[test]
    fn test_unhandled_error() {
        let result = unhandled_error();

        assert_eq!(result.value, Err(DivideByZero));
        assert_eq!(result.steps, vec!["cleanup"]);
        assert!(result.is_balanced());
    }

    #[test]
    fn test_isolated_contexts() {
        assert_eq!(isolated_contexts(), Ok(true));
    }

    #[test]
    fn test_plain_division_untouched() {
        let trace = Trace::new();
        assert_eq!(div_signal(10, 2, &trace), 5);
        assert_eq!(div_error(10, 2), Ok(5));
        assert_eq!(div_restart(10, 2, &trace), Ok(Ok(5)));
        assert!(!trace.contains("restart ReturnValue"));
    }
}
