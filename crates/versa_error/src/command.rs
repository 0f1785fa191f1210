//! Command dispatch error types.

use derive_more::{Display, Error};

/// Specific command error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum CommandErrorKind {
    /// No command registered under this name.
    #[display("Command not found: {}", _0)]
    CommandNotFound(String),

    /// Two extensions registered the same command name or alias.
    #[display("Command '{}' is already registered", _0)]
    DuplicateCommand(String),

    /// Missing required argument.
    #[display("Missing required argument '{}' for command '{}'", arg_name, command)]
    MissingArgument {
        /// Command name
        command: String,
        /// Argument name
        arg_name: String,
    },

    /// Invalid argument value.
    #[display("Invalid argument '{}' for command '{}': {}", arg_name, command, reason)]
    InvalidArgument {
        /// Command name
        command: String,
        /// Argument name
        arg_name: String,
        /// Why the value was rejected
        reason: String,
    },

    /// A check predicate rejected the invocation.
    #[display("Check '{}' failed for command '{}'", check, command)]
    CheckFailed {
        /// Command name
        command: String,
        /// Name of the failing check
        check: String,
    },

    /// The cooldown bucket for this invocation is exhausted.
    #[display("Command '{}' is on cooldown: retry after {} ms", command, retry_after_ms)]
    OnCooldown {
        /// Command name
        command: String,
        /// Milliseconds until the bucket allows another use
        retry_after_ms: u64,
    },
}

/// Command error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Command Error: {} at line {} in {}", kind, line, file)]
pub struct CommandError {
    /// The kind of error that occurred
    pub kind: CommandErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl CommandError {
    /// Create a new CommandError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: CommandErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
