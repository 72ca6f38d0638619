use super::Field;
use crate::lexer::token::{check_keyword, Token};
use crate::pattern::{parse_bool, parse_int, parse_ip, parse_net, Operator};
use glob::Pattern as GlobPattern;
use ipnetwork::IpNetwork;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

/// A literal value, pre-parsed into every domain it can be compared in
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    /// Source text
    pub text: String,
    /// Integer reading, if the text is an integer
    pub int: Option<i64>,
    /// Address reading, if the text is an IP address
    pub ip: Option<IpAddr>,
    /// Network reading: a CIDR block, or a host network for a bare address
    pub net: Option<IpNetwork>,
    /// Boolean reading, if the text is `true` or `false`
    pub boolean: Option<bool>,
}

impl Literal {
    /// Parse a literal from its text
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            int: parse_int(&text),
            ip: parse_ip(&text),
            net: parse_net(&text),
            boolean: parse_bool(&text),
            text,
        }
    }
}

fn needs_quotes(text: &str) -> bool {
    text.is_empty()
        || check_keyword(text) != Token::Identifier
        || text.chars().any(|c| {
            c.is_whitespace() || matches!(c, '(' | ')' | ',' | '=' | '<' | '>' | '!' | '"' | '\'' | '\\')
        })
}

fn write_text(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    if !needs_quotes(text) {
        return f.write_str(text);
    }
    f.write_str("\"")?;
    for c in text.chars() {
        if c == '"' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{c}")?;
    }
    f.write_str("\"")
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_text(f, &self.text)
    }
}

/// Right-hand side of a compiled comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No value (`exists`, `!exists`)
    Absent,
    /// Single value
    Scalar(Literal),
    /// Fully expanded set, first-seen order, no duplicates
    Set(Vec<Literal>),
    /// Compiled wildcard pattern
    Glob(GlobPattern),
    /// Decoded hex bytes
    Bytes(Vec<u8>),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Absent => Ok(()),
            Operand::Scalar(lit) => write!(f, "{lit}"),
            Operand::Set(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Operand::Glob(pattern) => write_text(f, pattern.as_str()),
            Operand::Bytes(bytes) => f.write_str(&hex::encode(bytes)),
        }
    }
}

/// A compiled leaf comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Left-hand field
    pub field: Field,
    /// Operator
    pub operator: Operator,
    /// Right-hand side
    pub operand: Operand,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operand {
            Operand::Absent => write!(f, "{} {}", self.field, self.operator),
            _ => write!(f, "{} {} {}", self.field, self.operator, self.operand),
        }
    }
}

/// An expanded macro body. Every reference to the macro in a compiled
/// condition points at the same body.
#[derive(Debug)]
pub struct MacroExpr {
    /// Macro name
    pub name: String,
    /// Expanded condition
    pub body: Expr,
    leaves: usize,
    height: usize,
}

impl MacroExpr {
    /// Wrap an expanded body
    pub fn new(name: impl Into<String>, body: Expr) -> Self {
        Self {
            name: name.into(),
            leaves: body.leaf_count(),
            height: body.height(),
            body,
        }
    }

    /// Comparisons in the body once every nested macro is expanded
    pub fn leaf_count(&self) -> usize {
        self.leaves
    }

    /// Levels in the body tree
    pub fn height(&self) -> usize {
        self.height
    }
}

impl fmt::Display for MacroExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.body)
    }
}

/// Fully resolved condition: only comparisons and logical connectives
#[derive(Debug, Clone)]
pub enum Expr {
    /// All children must hold; evaluated left to right
    And(Vec<Expr>),
    /// Any child must hold; evaluated left to right
    Or(Vec<Expr>),
    /// Negation
    Not(Box<Expr>),
    /// Leaf comparison
    Leaf(Comparison),
    /// Comparison between two literals, decided at compile time
    Const(bool),
    /// Reference to a shared macro body; behaves as a parenthesized copy of it
    Macro(Arc<MacroExpr>),
}

impl Expr {
    /// Conjunction, collapsing a single child into itself
    pub fn and(mut children: Vec<Expr>) -> Expr {
        if children.len() == 1 {
            children.remove(0)
        } else {
            Expr::And(children)
        }
    }

    /// Disjunction, collapsing a single child into itself
    pub fn or(mut children: Vec<Expr>) -> Expr {
        if children.len() == 1 {
            children.remove(0)
        } else {
            Expr::Or(children)
        }
    }

    /// Negation
    pub fn not(child: Expr) -> Expr {
        Expr::Not(Box::new(child))
    }

    /// Number of leaf comparisons with macros expanded. Saturates instead of
    /// overflowing.
    pub fn leaf_count(&self) -> usize {
        match self {
            Expr::And(children) | Expr::Or(children) => children
                .iter()
                .map(Expr::leaf_count)
                .fold(0, usize::saturating_add),
            Expr::Not(child) => child.leaf_count(),
            Expr::Leaf(_) => 1,
            Expr::Const(_) => 0,
            Expr::Macro(m) => m.leaf_count(),
        }
    }

    /// Levels in the tree, counting each macro reference as one level above
    /// its body
    pub fn height(&self) -> usize {
        match self {
            Expr::And(children) | Expr::Or(children) => {
                1 + children.iter().map(Expr::height).max().unwrap_or(0)
            }
            Expr::Not(child) => 1 + child.height(),
            Expr::Leaf(_) | Expr::Const(_) => 1,
            Expr::Macro(m) => 1 + m.height(),
        }
    }

    /// The node this expression stands for, looking through macro references
    fn resolved(&self) -> &Expr {
        let mut expr = self;
        while let Expr::Macro(m) = expr {
            expr = &m.body;
        }
        expr
    }

    fn write_child(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.resolved() {
            Expr::And(_) | Expr::Or(_) => write!(f, "({self})"),
            _ => write!(f, "{self}"),
        }
    }
}

/// Structural equality; a macro reference equals its inlined body
impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        if let (Expr::Macro(a), Expr::Macro(b)) = (self, other) {
            if Arc::ptr_eq(a, b) {
                return true;
            }
        }
        match (self.resolved(), other.resolved()) {
            (Expr::And(a), Expr::And(b)) | (Expr::Or(a), Expr::Or(b)) => a == b,
            (Expr::Not(a), Expr::Not(b)) => a == b,
            (Expr::Leaf(a), Expr::Leaf(b)) => a == b,
            (Expr::Const(a), Expr::Const(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::And(children) | Expr::Or(children) => {
                let sep = if matches!(self, Expr::And(_)) { " and " } else { " or " };
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    child.write_child(f)?;
                }
                Ok(())
            }
            Expr::Not(child) => {
                f.write_str("not ")?;
                child.write_child(f)
            }
            Expr::Leaf(cmp) => write!(f, "{cmp}"),
            Expr::Const(true) => f.write_str("1 = 1"),
            Expr::Const(false) => f.write_str("1 = 0"),
            Expr::Macro(m) => write!(f, "{m}"),
        }
    }
}
