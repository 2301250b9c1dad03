//! Per-execution-context handler and restart stacks
//!
//! Every thread owns one [`Context`], created on first use and dropped when
//! the thread terminates. Nothing is shared between threads, so the stacks
//! need no locking; bindings made on one thread are invisible to all others.
//!
//! Frames are pushed by [`push_handler`] / [`push_restart`], which hand back
//! a [`Frame`] guard. Dropping the guard pops exactly that frame, so the pop
//! happens on every exit path of the bound body: normal return, `?`
//! propagation, panics and non-local exits.

use std::cell::RefCell;
use std::rc::Rc;

use crate::condition::{Condition, ConditionType};
use crate::error::{ConditionError, ConditionResult, StackKind};
use crate::restart::Restart;

/// Limits applied to the current context's stacks
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextConfig {
    /// Maximum number of live handler bindings
    pub max_handler_depth: usize,
    /// Maximum number of live restart bindings
    pub max_restart_depth: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        ContextConfig {
            max_handler_depth: 4096,
            max_restart_depth: 4096,
        }
    }
}

impl ContextConfig {
    /// No limits besides available memory
    pub fn unbounded() -> Self {
        ContextConfig {
            max_handler_depth: usize::MAX,
            max_restart_depth: usize::MAX,
        }
    }

    /// Tight limits, useful for catching runaway recursion in tests
    pub fn strict() -> Self {
        ContextConfig {
            max_handler_depth: 64,
            max_restart_depth: 64,
        }
    }
}

pub(crate) type HandlerFn = Rc<dyn Fn(&dyn Condition)>;

/// One handler frame
#[derive(Clone)]
pub(crate) struct HandlerBinding {
    pub(crate) ty: ConditionType,
    pub(crate) callback: HandlerFn,
}

/// State owned by one thread of control
#[derive(Default)]
struct Context {
    handlers: Vec<HandlerBinding>,
    restarts: Vec<Restart>,
    config: ContextConfig,
}

thread_local! {
    static CONTEXT: RefCell<Context> = RefCell::new(Context::default());
}

/// Guard for one pushed frame
#[must_use = "dropping the frame pops the binding"]
pub(crate) struct Frame {
    stack: StackKind,
    depth: usize,
}

impl Drop for Frame {
    fn drop(&mut self) {
        CONTEXT.with(|cx| {
            let mut cx = cx.borrow_mut();
            let remaining = match self.stack {
                StackKind::Handler => {
                    cx.handlers.pop();
                    cx.handlers.len()
                }
                StackKind::Restart => {
                    if let Some(restart) = cx.restarts.pop() {
                        restart.deactivate();
                    }
                    cx.restarts.len()
                }
            };
            debug_assert_eq!(remaining, self.depth, "{} stack out of balance", self.stack);
            tracing::trace!(stack = %self.stack, depth = remaining, "frame popped");
        });
    }
}

pub(crate) fn push_handler(binding: HandlerBinding) -> ConditionResult<Frame> {
    CONTEXT.with(|cx| {
        let mut cx = cx.borrow_mut();
        let depth = cx.handlers.len();
        if depth >= cx.config.max_handler_depth {
            return Err(ConditionError::DepthExceeded {
                stack: StackKind::Handler,
                limit: cx.config.max_handler_depth,
            });
        }
        tracing::trace!(condition_type = %binding.ty, depth, "handler pushed");
        cx.handlers.push(binding);
        Ok(Frame {
            stack: StackKind::Handler,
            depth,
        })
    })
}

pub(crate) fn push_restart(restart: Restart) -> ConditionResult<Frame> {
    CONTEXT.with(|cx| {
        let mut cx = cx.borrow_mut();
        let depth = cx.restarts.len();
        if depth >= cx.config.max_restart_depth {
            return Err(ConditionError::DepthExceeded {
                stack: StackKind::Restart,
                limit: cx.config.max_restart_depth,
            });
        }
        tracing::trace!(restart = restart.name(), depth, "restart pushed");
        cx.restarts.push(restart);
        Ok(Frame {
            stack: StackKind::Restart,
            depth,
        })
    })
}

/// Innermost handler whose type accepts `condition`.
///
/// Each binding is cloned out before its matcher runs, so no borrow of the
/// context is held while caller code executes. Matchers may bind, signal or
/// reconfigure; any frames they push are popped again before they return.
pub(crate) fn find_handler(condition: &dyn Condition) -> Option<HandlerBinding> {
    let mut index = handler_depth();
    while index > 0 {
        index -= 1;
        let binding = CONTEXT.with(|cx| cx.borrow().handlers.get(index).cloned())?;
        if binding.ty.matches(condition) {
            return Some(binding);
        }
    }
    None
}

/// Innermost restart named `name`
pub(crate) fn lookup_restart(name: &str) -> Option<Restart> {
    CONTEXT.with(|cx| {
        cx.borrow()
            .restarts
            .iter()
            .rev()
            .find(|restart| restart.name() == name)
            .cloned()
    })
}

/// All live restarts, innermost first
pub(crate) fn snapshot_restarts() -> Vec<Restart> {
    CONTEXT.with(|cx| cx.borrow().restarts.iter().rev().cloned().collect())
}

/// Replace the current context's configuration.
///
/// Bindings already on the stacks are kept even if they exceed the new
/// limits; only later binds are checked.
pub fn configure(config: ContextConfig) {
    CONTEXT.with(|cx| cx.borrow_mut().config = config);
}

/// The current context's configuration
pub fn config() -> ContextConfig {
    CONTEXT.with(|cx| cx.borrow().config.clone())
}

/// Number of live handler bindings in the current context
pub fn handler_depth() -> usize {
    CONTEXT.with(|cx| cx.borrow().handlers.len())
}

/// Number of live restart bindings in the current context
pub fn restart_depth() -> usize {
    CONTEXT.with(|cx| cx.borrow().restarts.len())
}
