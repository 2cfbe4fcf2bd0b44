use std::io;

use thiserror::Error;

use crate::args::{RESERVED_NAMES, RESERVED_PREFIX};

#[derive(Debug, Error)]
pub enum ProgressError {
    /// The task's declared shape cannot be driven with a fixed positional argument list.
    #[error("invalid function '{function}': {reason}")]
    InvalidFunction { function: String, reason: String },

    #[error(
        "{}the name '{name}' is reserved; a name can not be empty, start with '{}' or be in the following list: {}",
        function_context(.function),
        RESERVED_PREFIX,
        RESERVED_NAMES.join(", ")
    )]
    InvalidArgumentName {
        name: String,
        function: Option<String>,
    },

    #[error("duplicate argument name '{0}'")]
    DuplicateArgument(String),

    #[error("unknown argument '{0}'")]
    UnknownArgument(String),

    #[error("index out of range: {index} (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("argument '{0}' is unbound")]
    UnboundArgument(String),

    /// The arguments are already borrowed further up this thread's call stack, e.g. by an
    /// enclosing `with_args` closure.
    #[error("arguments are in use by an enclosing borrow on this thread")]
    ArgumentsBusy,

    #[error("interval must be a finite, non-negative number of seconds (got {0})")]
    InvalidInterval(f64),

    #[error("failed to spawn runner thread: {0}")]
    Spawn(#[source] io::Error),
}

fn function_context(function: &Option<String>) -> String {
    match function {
        Some(function) => format!("function '{}': ", function),
        None => String::new(),
    }
}

impl ProgressError {
    pub(crate) fn with_function(self, function: &str) -> Self {
        match self {
            Self::InvalidArgumentName { name, function: None } => Self::InvalidArgumentName {
                name,
                function: Some(function.to_string()),
            },
            other => other,
        }
    }
}
