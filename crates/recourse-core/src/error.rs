//! Error types for the condition engine

use std::fmt;

use thiserror::Error;

/// Which per-context stack an operation touched
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StackKind {
    Handler,
    Restart,
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackKind::Handler => write!(f, "handler"),
            StackKind::Restart => write!(f, "restart"),
        }
    }
}

/// Errors raised by the engine itself.
///
/// User conditions never appear here: [`crate::error`] hands them back to
/// the caller as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConditionError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Restart not found: {name}")]
    RestartNotFound { name: String },

    #[error("Restart {name} is no longer active")]
    RestartInactive { name: String },

    #[error("Restart {name} expects a parameter of type {expected}")]
    RestartArgument { name: String, expected: &'static str },

    #[error("The {stack} stack is limited to {limit} bindings")]
    DepthExceeded { stack: StackKind, limit: usize },
}

impl ConditionError {
    /// Name of the restart this error is about, if any
    pub fn restart_name(&self) -> Option<&str> {
        match self {
            ConditionError::RestartNotFound { name }
            | ConditionError::RestartInactive { name }
            | ConditionError::RestartArgument { name, .. } => Some(name),
            _ => None,
        }
    }

    pub(crate) fn not_found(name: &str) -> Self {
        ConditionError::RestartNotFound {
            name: name.to_string(),
        }
    }
}

/// Result type for engine operations
pub type ConditionResult<T> = Result<T, ConditionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_name() {
        assert_eq!(
            ConditionError::not_found("ReturnValue").restart_name(),
            Some("ReturnValue")
        );
        assert_eq!(
            ConditionError::InvalidArgument("x".into()).restart_name(),
            None
        );
    }

    #[test]
    fn test_display() {
        let err = ConditionError::DepthExceeded {
            stack: StackKind::Restart,
            limit: 8,
        };
        assert_eq!(err.to_string(), "The restart stack is limited to 8 bindings");
        assert_eq!(
            ConditionError::not_found("abort").to_string(),
            "Restart not found: abort"
        );
    }
}
