//! Error types for the pocketsql interpreter

use crate::types::TypeTag;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PocketError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PocketError {
    /// Tokenizer met a character it cannot classify. Never wrapped.
    #[error("Unexpected character '{ch}' at {pos}")]
    Lex { ch: char, pos: usize },

    /// An expected token or pattern was absent.
    #[error("{message} at {pos}")]
    Parse { message: String, pos: usize },

    /// Semantic error found while interpreting a syntactically valid statement.
    #[error("{0}")]
    Processing(String),

    /// A branch representing a feature that is not implemented.
    #[error("Internal error: {0}")]
    Internal(String),

    /// A value could not be coerced to the requested type.
    #[error("Cannot convert {value} to {target}")]
    Coercion { value: String, target: TypeTag },

    /// Parse and processing faults as surfaced by `Database::query`.
    #[error("Invalid SQL: {0}")]
    InvalidSql(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Cannot perform query on a dropped database")]
    Dropped,
}

impl PocketError {
    pub(crate) fn parse(message: impl Into<String>, pos: usize) -> Self {
        PocketError::Parse { message: message.into(), pos }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        PocketError::Internal(message.into())
    }

    /// True for faults that signal a missing implementation rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(self, PocketError::Internal(_))
    }

    pub fn is_invalid_sql(&self) -> bool {
        matches!(self, PocketError::InvalidSql(_))
    }

    /// Re-wraps parse and processing faults the way the query entry point reports them.
    ///
    /// Parse faults get the SQL text annotated with a `<<here>>` marker at the
    /// failing offset; processing faults carry the full SQL text. Everything
    /// else is returned untouched.
    pub(crate) fn wrap_for_query(self, sql: &str) -> Self {
        match self {
            PocketError::Parse { message, pos } => {
                let split = sql
                    .char_indices()
                    .nth(pos)
                    .map(|(offset, _)| offset)
                    .unwrap_or(sql.len());
                PocketError::InvalidSql(format!(
                    "{} at {}: {}<<here>>{}",
                    message,
                    pos,
                    &sql[..split],
                    &sql[split..]
                ))
            }
            PocketError::Processing(message) => {
                PocketError::InvalidSql(format!("{}: {}", message, sql))
            }
            other => other,
        }
    }
}
