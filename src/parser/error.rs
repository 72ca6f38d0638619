use crate::lexer::error::LexError;
use crate::lexer::token::Item;
use thiserror::Error;

/// Malformed condition text. The position is a byte offset into the
/// condition string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("syntax error at position {position}: {message}")]
pub struct SyntaxError {
    /// Byte offset of the offending token
    pub position: usize,
    /// What the parser expected or found
    pub message: String,
}

impl SyntaxError {
    /// Create a syntax error at a byte offset
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }

    /// Create an error for a token that does not fit where it appears
    pub fn unexpected(item: &Item, expected: &str) -> Self {
        let found = if item.value.is_empty() {
            item.token.literal().to_string()
        } else {
            format!("'{}'", item.value)
        };
        Self::new(item.position, format!("expected {expected}, found {found}"))
    }

    /// Create a nesting limit error
    pub fn too_deep(position: usize, limit: usize) -> Self {
        Self::new(position, format!("expression nested deeper than {limit} levels"))
    }
}

impl From<LexError> for SyntaxError {
    fn from(e: LexError) -> Self {
        let message = match &e {
            LexError::UnterminatedString(_) => "unterminated string".to_string(),
            LexError::UnexpectedChar { ch, .. } => format!("unexpected character '{ch}'"),
        };
        Self::new(e.position(), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Token;

    #[test]
    fn test_unexpected_message() {
        let item = Item::new(Token::SepRpar, ")", 7);
        let err = SyntaxError::unexpected(&item, "a value");
        assert_eq!(err.position, 7);
        assert_eq!(err.to_string(), "syntax error at position 7: expected a value, found ')'");

        let eof = Item::new(Token::LitEof, "", 12);
        assert_eq!(
            SyntaxError::unexpected(&eof, "')'").message,
            "expected ')', found end of input"
        );
    }

    #[test]
    fn test_from_lex_error() {
        let err: SyntaxError = LexError::UnterminatedString(4).into();
        assert_eq!(err, SyntaxError::new(4, "unterminated string"));
    }
}
