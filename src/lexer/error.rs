use thiserror::Error;

/// Errors that can occur during lexing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("unterminated string starting at position {0}")]
    UnterminatedString(usize),

    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },
}

impl LexError {
    /// Byte offset the error points at
    pub fn position(&self) -> usize {
        match self {
            LexError::UnterminatedString(position) => *position,
            LexError::UnexpectedChar { position, .. } => *position,
        }
    }
}
