//! Recursive-descent parser for condition expressions
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr    := and ("or" and)*
//! and     := unary ("and" unary)*
//! unary   := "not" unary | primary
//! primary := "(" expr ")" | FIELD OP [operand] | NAME
//! operand := value | "(" [value ("," value)*] ")"
//! ```
//!
//! A bare word not followed by an operator is a name reference. Parsing is
//! all-or-nothing: any leftover token is an error.

use crate::ast::{Field, RawComparison, RawExpr, RawOperand, RawValue};
use crate::lexer::token::{Item, Token};
use crate::lexer::tokenize;
use crate::pattern::Operator;

/// Parser error types
pub mod error;

pub use error::SyntaxError;

/// Maximum nesting of parentheses and `not`
pub const MAX_DEPTH: usize = 256;

/// Parse a condition string into an unresolved tree
pub fn parse_condition(input: &str) -> Result<RawExpr, SyntaxError> {
    let items = tokenize(input)?;
    let mut parser = Parser::new(items);
    parser.parse()
}

/// Parser over a token sequence ending with `LitEof`
#[derive(Debug)]
pub struct Parser {
    items: Vec<Item>,
    index: usize,
    depth: usize,
}

impl Parser {
    /// Create a parser over lexed items
    pub fn new(mut items: Vec<Item>) -> Self {
        if items.last().map(|i| i.token) != Some(Token::LitEof) {
            let end = items.last().map_or(0, |i| i.position + i.value.len());
            items.push(Item::new(Token::LitEof, "", end));
        }
        Self {
            items,
            index: 0,
            depth: 0,
        }
    }

    /// Parse the whole input as one expression
    pub fn parse(&mut self) -> Result<RawExpr, SyntaxError> {
        if self.peek().token == Token::LitEof {
            return Err(SyntaxError::new(self.peek().position, "empty condition"));
        }
        let expr = self.parse_or()?;
        let next = self.peek();
        if next.token != Token::LitEof {
            return Err(SyntaxError::unexpected(next, "'and', 'or' or end of input"));
        }
        Ok(expr)
    }

    fn peek(&self) -> &Item {
        // items always end with LitEof, see new()
        &self.items[self.index.min(self.items.len() - 1)]
    }

    fn peek_token(&self) -> Token {
        self.peek().token
    }

    fn advance(&mut self) -> Item {
        let item = self.peek().clone();
        if self.index < self.items.len() {
            self.index += 1;
        }
        item
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<Item, SyntaxError> {
        if self.peek_token() == token {
            Ok(self.advance())
        } else {
            Err(SyntaxError::unexpected(self.peek(), expected))
        }
    }

    fn enter(&mut self) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(SyntaxError::too_deep(self.peek().position, MAX_DEPTH));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn parse_or(&mut self) -> Result<RawExpr, SyntaxError> {
        let mut children = vec![self.parse_and()?];
        while self.peek_token() == Token::KeywordOr {
            self.advance();
            children.push(self.parse_and()?);
        }
        Ok(if children.len() == 1 {
            children.remove(0)
        } else {
            RawExpr::Or(children)
        })
    }

    fn parse_and(&mut self) -> Result<RawExpr, SyntaxError> {
        let mut children = vec![self.parse_unary()?];
        while self.peek_token() == Token::KeywordAnd {
            self.advance();
            children.push(self.parse_unary()?);
        }
        Ok(if children.len() == 1 {
            children.remove(0)
        } else {
            RawExpr::And(children)
        })
    }

    fn parse_unary(&mut self) -> Result<RawExpr, SyntaxError> {
        if self.peek_token() == Token::KeywordNot {
            self.advance();
            self.enter()?;
            let child = self.parse_unary();
            self.leave();
            return Ok(RawExpr::Not(Box::new(child?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<RawExpr, SyntaxError> {
        match self.peek_token() {
            Token::SepLpar => {
                self.advance();
                self.enter()?;
                let inner = self.parse_or();
                self.leave();
                let inner = inner?;
                self.expect(Token::SepRpar, "')'")?;
                Ok(inner)
            }
            Token::Identifier => {
                let item = self.advance();
                if self.peek_token().is_operator() {
                    self.parse_comparison(item)
                } else {
                    Ok(RawExpr::Name {
                        name: item.value,
                        position: item.position,
                    })
                }
            }
            _ => Err(SyntaxError::unexpected(self.peek(), "a field, name, 'not' or '('")),
        }
    }

    fn parse_comparison(&mut self, field: Item) -> Result<RawExpr, SyntaxError> {
        let op_item = self.advance();
        let operator = Operator::from_keyword(&op_item.value)
            .ok_or_else(|| SyntaxError::unexpected(&op_item, "a comparison operator"))?;

        let operand = if operator.is_unary() {
            RawOperand::None
        } else if self.peek_token() == Token::SepLpar {
            RawOperand::List(self.parse_list()?)
        } else {
            RawOperand::Value(self.parse_value()?)
        };

        Ok(RawExpr::Compare(RawComparison {
            field: Field::parse(&field.value),
            operator,
            operand,
            position: field.position,
        }))
    }

    fn parse_list(&mut self) -> Result<Vec<RawValue>, SyntaxError> {
        self.expect(Token::SepLpar, "'('")?;
        let mut values = Vec::new();
        if self.peek_token() == Token::SepRpar {
            self.advance();
            return Ok(values);
        }
        loop {
            values.push(self.parse_value()?);
            match self.peek_token() {
                Token::SepComma => {
                    self.advance();
                }
                Token::SepRpar => {
                    self.advance();
                    return Ok(values);
                }
                _ => return Err(SyntaxError::unexpected(self.peek(), "',' or ')'")),
            }
        }
    }

    /// A single value. Operator words and the `<`/`>` symbols are accepted
    /// as bare text here (`evt.dir = <`).
    fn parse_value(&mut self) -> Result<RawValue, SyntaxError> {
        let item = self.peek();
        let value = match item.token {
            Token::LitString => RawValue::quoted(item.value.clone(), item.position),
            Token::Identifier | Token::KeywordOp | Token::OpLt | Token::OpGt => {
                RawValue::bare(item.value.clone(), item.position)
            }
            _ => return Err(SyntaxError::unexpected(item, "a value")),
        };
        self.advance();
        Ok(value)
    }
}
