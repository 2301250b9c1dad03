//! Recourse Core - condition handling and restarts
//!
//! Signaling a problem, deciding what to do about it, and resuming the
//! computation are three separate steps here:
//! - [`signal`] / [`error()`] announce a condition
//! - handlers bound with [`handler_bind`] / [`handler_case`] decide
//! - restarts bound with [`restart_bind`] / [`restart_case`] resume
//!
//! Handlers run on top of the signaler's stack, so a handler can pick a
//! restart established anywhere between itself and the signal point and
//! continue from there. [`unwind_protect`] guarantees cleanup on every exit
//! path, including non-local exits.
//!
//! Each thread has its own handler and restart stacks. Non-local exits are
//! built on unwinding, so crates using this one must not set
//! `panic = "abort"`.
//!
//! ```rust
//! use recourse_core::{error, handler_bind, invoke_restart, restart_case, ConditionType};
//!
//! #[derive(Debug)]
//! struct DivideByZero;
//!
//! fn divide(x: i32, y: i32) -> Result<i32, DivideByZero> {
//!     restart_case("use-value", |v: i32| Ok(v), || {
//!         if y == 0 {
//!             return error(DivideByZero);
//!         }
//!         Ok(x / y)
//!     })
//!     .expect("restart name is valid")
//! }
//!
//! let result = handler_bind(
//!     &ConditionType::of::<DivideByZero>(),
//!     |_| {
//!         let _ = invoke_restart("use-value", 0);
//!     },
//!     || divide(123, 0),
//! );
//! assert!(matches!(result, Ok(Ok(0))));
//! ```

pub mod condition;
pub mod context;
pub mod error;
mod escape;
pub mod handler;
pub mod protect;
pub mod restart;

pub use condition::*;
pub use context::{config, configure, handler_depth, restart_depth, ContextConfig};
pub use error::{ConditionError, ConditionResult, StackKind};
pub use handler::*;
pub use protect::*;
pub use restart::*;
