//! Condition syntax trees
//!
//! The parser produces a [`RawExpr`]: comparisons plus bare names that may
//! denote a macro. The compiler turns it into an [`Expr`] in which every
//! name has been substituted and every literal pre-parsed.

use crate::pattern::{intern_field, Operator};
use std::fmt;
use std::sync::Arc;

/// Compiled node implementations
pub mod nodes;
pub use nodes::*;

/// A field reference, optionally with a bracketed argument (`proc.aname[2]`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    /// Dotted field name
    pub name: Arc<str>,
    /// Bracketed argument, if any
    pub arg: Option<Arc<str>>,
}

impl Field {
    /// Field without an argument
    pub fn new(name: &str) -> Self {
        Self {
            name: intern_field(name),
            arg: None,
        }
    }

    /// Field with a bracketed argument
    pub fn with_arg(name: &str, arg: &str) -> Self {
        Self {
            name: intern_field(name),
            arg: Some(Arc::from(arg)),
        }
    }

    /// Split `name[arg]` into its parts. Text without a well-formed trailing
    /// bracket is taken as a plain name.
    pub fn parse(text: &str) -> Self {
        if let Some(inner) = text.strip_suffix(']') {
            if let Some(open) = inner.find('[') {
                let (name, arg) = (&inner[..open], &inner[open + 1..]);
                if !name.is_empty() && !arg.contains('[') {
                    return Self::with_arg(name, arg);
                }
            }
        }
        Self::new(text)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arg {
            Some(arg) => write!(f, "{}[{}]", self.name, arg),
            None => f.write_str(&self.name),
        }
    }
}

/// A right-hand-side value as written in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValue {
    /// Unescaped text
    pub text: String,
    /// Whether it was written in quotes; quoted values never name a list
    pub quoted: bool,
    /// Byte offset in the condition
    pub position: usize,
}

impl RawValue {
    /// Bare value
    pub fn bare(text: impl Into<String>, position: usize) -> Self {
        Self {
            text: text.into(),
            quoted: false,
            position,
        }
    }

    /// Quoted value
    pub fn quoted(text: impl Into<String>, position: usize) -> Self {
        Self {
            text: text.into(),
            quoted: true,
            position,
        }
    }
}

/// Right-hand side of an unresolved comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOperand {
    /// No value (`exists`)
    None,
    /// A single value
    Value(RawValue),
    /// A parenthesized list of values
    List(Vec<RawValue>),
}

/// An unresolved leaf comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawComparison {
    /// Left-hand field
    pub field: Field,
    /// Operator
    pub operator: Operator,
    /// Right-hand side
    pub operand: RawOperand,
    /// Byte offset of the field
    pub position: usize,
}

/// Condition tree as parsed, before name resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawExpr {
    /// All children must hold
    And(Vec<RawExpr>),
    /// Any child must hold
    Or(Vec<RawExpr>),
    /// Negation
    Not(Box<RawExpr>),
    /// Leaf comparison
    Compare(RawComparison),
    /// Bare name, resolved to a macro by the compiler
    Name {
        /// Referenced name
        name: String,
        /// Byte offset in the condition
        position: usize,
    },
}
