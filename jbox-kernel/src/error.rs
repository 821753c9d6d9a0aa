//! Kernel error types.

use jbox_api::Kind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JboxError {
    #[error("malformed literal {token:?}: {reason}")]
    MalformedLiteral { token: String, reason: String },

    #[error("unprintable token {0:?}")]
    UnprintableToken(String),

    #[error("{command}: expected {expected}, received {found}{origin}")]
    TypeMismatch {
        command: &'static str,
        expected: Kind,
        found: Kind,
        origin: &'static str,
    },

    #[error("configuration conflict: {0}")]
    ConfigurationConflict(String),

    #[error("{0}")]
    Usage(String),

    #[error("{0}: no output produced")]
    NoOutput(&'static str),

    #[error("invalid query {query:?}: {reason}")]
    Query { query: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl JboxError {
    /// Kind mismatch on a value that came from the piped stream.
    pub fn stdin_mismatch(command: &'static str, expected: Kind, found: Kind) -> Self {
        JboxError::TypeMismatch {
            command,
            expected,
            found,
            origin: " through stdin",
        }
    }

    /// Kind mismatch on a positional value or file content.
    pub fn mismatch(command: &'static str, expected: Kind, found: Kind) -> Self {
        JboxError::TypeMismatch {
            command,
            expected,
            found,
            origin: "",
        }
    }
}
