//! Command implementations.
//!
//! Each command returns the text to print so it can be tested without
//! capturing stdout.

pub mod groups;
pub mod todos;

use serde::Serialize;
use thiserror::Error;

/// Errors reported to the user.
#[derive(Debug, Error)]
pub enum CommandError {
    /// No record has the given id.
    #[error("no {kind} with id {id}")]
    NotFound {
        /// Record kind.
        kind: &'static str,
        /// The id looked up.
        id: String,
    },

    /// The store did not accept the record. Details are in the log.
    #[error("could not save {kind}; run with --verbose for details")]
    NotSaved {
        /// Record kind.
        kind: &'static str,
    },

    /// JSON output failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for commands.
pub type CommandResult<T = String> = Result<T, CommandError>;

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    /// Human-readable lines.
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl Output {
    /// Renders `value` as JSON, or with `text` otherwise.
    fn render<T: Serialize + ?Sized>(self, value: &T, text: impl FnOnce() -> String) -> CommandResult {
        match self {
            Self::Json => Ok(serde_json::to_string_pretty(value)?),
            Self::Text => Ok(text()),
        }
    }
}
