//! Lexical analysis module

/// Error types for lexer operations
pub mod error;
/// Lexer state management
pub mod state;
/// Token definitions and utilities
pub mod token;

pub use error::LexError;
pub use state::LexState;
pub use token::{Item, Token};

/// Lexer for condition expressions.
/// Converts input string into a sequence of tokens
pub struct Lexer<'a> {
    input: &'a str,
    start: usize,
    position: usize,
    width: usize,
    items: Vec<Item>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer over the input
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            start: 0,
            position: 0,
            width: 0,
            items: Vec::new(),
        }
    }

    /// Scan the whole input. The last item is always `LitEof`.
    pub fn scan(mut self) -> Result<Vec<Item>, LexError> {
        let mut state = Some(LexState::Condition);
        while let Some(s) = state {
            state = self.process_state(s)?;
        }
        Ok(self.items)
    }

    /// Process the current state and return the next state
    fn process_state(&mut self, state: LexState) -> Result<Option<LexState>, LexError> {
        match state {
            LexState::Condition => self.lex_condition(),
            LexState::Word => self.lex_word(),
            LexState::Symbol => self.lex_symbol(),
            LexState::Quoted(quote) => self.lex_quoted(quote),
            LexState::Eof => self.lex_eof(),
        }
    }

    /// Get the next character from the input
    fn next_char(&mut self) -> Option<char> {
        match self.input[self.position..].chars().next() {
            Some(ch) => {
                self.width = ch.len_utf8();
                self.position += self.width;
                Some(ch)
            }
            None => {
                self.width = 0;
                None
            }
        }
    }

    /// Look at the next character without consuming it
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// Back up one character
    fn backup(&mut self) {
        if self.width > 0 {
            self.position -= self.width;
            self.width = 0;
        }
    }

    /// Ignore characters up to current position
    fn ignore(&mut self) {
        self.start = self.position;
    }

    /// Get the collected string from start to current position
    fn collected(&self) -> &'a str {
        &self.input[self.start..self.position]
    }

    /// Get the remaining string from current position
    fn remaining(&self) -> &'a str {
        &self.input[self.position..]
    }

    /// Emit a token with the collected value
    fn emit(&mut self, token: Token) {
        let value = self.collected();
        self.items.push(Item::new(token, value, self.start));
        self.ignore();
    }

    /// Emit a token whose value differs from the raw source text
    fn emit_value(&mut self, token: Token, value: String) {
        self.items.push(Item::new(token, value, self.start));
        self.ignore();
    }
}

/// Tokenize a condition string
pub fn tokenize(input: &str) -> Result<Vec<Item>, LexError> {
    Lexer::new(input).scan()
}
