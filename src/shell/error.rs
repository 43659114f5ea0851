use rustyline::error::ReadlineError;
use thiserror::Error;

use crate::btree::BPlusTreeError;

/// Result type for shell operations
pub type ShellResult<T> = Result<T, ShellError>;

/// Errors raised while parsing a command line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Unknown command: {0} (type 'help' for a list)")]
    UnknownCommand(String),

    #[error("Missing {argument} for '{command}'")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("Too many arguments for '{0}'")]
    TooManyArguments(&'static str),

    #[error("Invalid key: {0} (keys are integers)")]
    InvalidKey(String),
}

/// Errors that can occur in the interactive shell
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("B+ tree error: {0}")]
    Tree(#[from] BPlusTreeError<i64>),

    #[error("Readline error: {0}")]
    Readline(#[from] ReadlineError),
}
