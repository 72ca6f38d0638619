use crate::lexer::error::LexError;
use crate::lexer::{
    token::{check_keyword, Token},
    Lexer,
};

/// States in the lexer state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LexState {
    /// Between tokens, skipping whitespace
    Condition,
    /// Inside a bare word
    Word,
    /// At a symbolic operator
    Symbol,
    /// Inside a quoted string opened by the given quote character
    Quoted(char),
    /// End of input reached
    Eof,
}

/// Characters that end a bare word
fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | ',' | '=' | '<' | '>' | '!' | '"' | '\'')
}

impl<'a> Lexer<'a> {
    /// Main lexing state - dispatches on the next character
    pub(crate) fn lex_condition(&mut self) -> Result<Option<LexState>, LexError> {
        loop {
            match self.next_char() {
                None => return Ok(Some(LexState::Eof)),
                Some(c) if c.is_whitespace() => self.ignore(),
                Some('(') => {
                    self.emit(Token::SepLpar);
                    return Ok(Some(LexState::Condition));
                }
                Some(')') => {
                    self.emit(Token::SepRpar);
                    return Ok(Some(LexState::Condition));
                }
                Some(',') => {
                    self.emit(Token::SepComma);
                    return Ok(Some(LexState::Condition));
                }
                // start stays on the opening quote so the item reports its offset
                Some(c @ ('"' | '\'')) => return Ok(Some(LexState::Quoted(c))),
                Some('=' | '<' | '>' | '!') => {
                    self.backup();
                    return Ok(Some(LexState::Symbol));
                }
                Some(_) => return Ok(Some(LexState::Word)),
            }
        }
    }

    /// Lex a bare word up to the next delimiter
    pub(crate) fn lex_word(&mut self) -> Result<Option<LexState>, LexError> {
        loop {
            match self.next_char() {
                None => break,
                Some(c) if is_delimiter(c) => {
                    self.backup();
                    break;
                }
                Some(_) => continue,
            }
        }
        let token = check_keyword(self.collected());
        self.emit(token);
        Ok(Some(LexState::Condition))
    }

    /// Lex a symbolic operator, including `!exists`
    pub(crate) fn lex_symbol(&mut self) -> Result<Option<LexState>, LexError> {
        let position = self.position;
        let token = match self.next_char() {
            Some('=') => {
                if self.peek() == Some('=') {
                    self.next_char();
                }
                Token::OpEq
            }
            Some('<') => {
                if self.peek() == Some('=') {
                    self.next_char();
                    Token::OpLte
                } else {
                    Token::OpLt
                }
            }
            Some('>') => {
                if self.peek() == Some('=') {
                    self.next_char();
                    Token::OpGte
                } else {
                    Token::OpGt
                }
            }
            Some('!') => {
                if self.peek() == Some('=') {
                    self.next_char();
                    Token::OpNeq
                } else if self.remaining().starts_with("exists")
                    && self.remaining()["exists".len()..]
                        .chars()
                        .next()
                        .map_or(true, is_delimiter)
                {
                    self.position += "exists".len();
                    self.width = 0;
                    Token::KeywordOp
                } else {
                    return Err(LexError::UnexpectedChar { ch: '!', position });
                }
            }
            Some(ch) => return Err(LexError::UnexpectedChar { ch, position }),
            None => return Ok(Some(LexState::Eof)),
        };
        self.emit(token);
        Ok(Some(LexState::Condition))
    }

    /// Lex a quoted string. Backslash escapes the quote character and itself;
    /// any other backslash is kept verbatim.
    pub(crate) fn lex_quoted(&mut self, quote: char) -> Result<Option<LexState>, LexError> {
        let opened_at = self.start;
        let mut value = String::new();
        loop {
            match self.next_char() {
                None => return Err(LexError::UnterminatedString(opened_at)),
                Some('\\') => match self.peek() {
                    Some(c) if c == quote || c == '\\' => {
                        self.next_char();
                        value.push(c);
                    }
                    _ => value.push('\\'),
                },
                Some(c) if c == quote => break,
                Some(c) => value.push(c),
            }
        }
        self.emit_value(Token::LitString, value);
        Ok(Some(LexState::Condition))
    }

    /// Lex end of input
    pub(crate) fn lex_eof(&mut self) -> Result<Option<LexState>, LexError> {
        self.ignore();
        self.emit(Token::LitEof);
        Ok(None)
    }
}
