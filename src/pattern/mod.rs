//! Comparison operators and the primitives that implement them

pub mod coercion;
pub mod intern;
pub mod num_matcher;
pub mod path;
pub mod string_matcher;

pub use coercion::*;
pub use intern::intern_field;
pub use num_matcher::*;
pub use path::path_match;
pub use string_matcher::*;

use std::fmt;

/// Comparison operator of a leaf condition.
///
/// The set is closed; the evaluator dispatches on it with a single match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    Neq,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// Substring test
    Contains,
    /// Case-insensitive substring test
    IContains,
    /// Prefix test
    StartsWith,
    /// Suffix test
    EndsWith,
    /// Shell-style wildcard match
    Glob,
    /// Case-insensitive wildcard match
    IGlob,
    /// Path-prefix match against a set of directories
    PMatch,
    /// Scalar in set, or every element of a set value in set
    In,
    /// Any element of the value in set
    Intersects,
    /// Field is applicable for the event
    Exists,
    /// Field is not applicable for the event
    NotExists,
    /// Byte-substring test against a hex literal
    BContains,
    /// Byte-prefix test against a hex literal
    BStartsWith,
}

impl Operator {
    /// Look up an operator by its source spelling
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let op = match keyword {
            "=" | "==" => Operator::Eq,
            "!=" => Operator::Neq,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            "contains" => Operator::Contains,
            "icontains" => Operator::IContains,
            "startswith" => Operator::StartsWith,
            "endswith" => Operator::EndsWith,
            "glob" => Operator::Glob,
            "iglob" => Operator::IGlob,
            "pmatch" => Operator::PMatch,
            "in" => Operator::In,
            "intersects" => Operator::Intersects,
            "exists" => Operator::Exists,
            "!exists" => Operator::NotExists,
            "bcontains" => Operator::BContains,
            "bstartswith" => Operator::BStartsWith,
            _ => return None,
        };
        Some(op)
    }

    /// Canonical source spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Neq => "!=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Contains => "contains",
            Operator::IContains => "icontains",
            Operator::StartsWith => "startswith",
            Operator::EndsWith => "endswith",
            Operator::Glob => "glob",
            Operator::IGlob => "iglob",
            Operator::PMatch => "pmatch",
            Operator::In => "in",
            Operator::Intersects => "intersects",
            Operator::Exists => "exists",
            Operator::NotExists => "!exists",
            Operator::BContains => "bcontains",
            Operator::BStartsWith => "bstartswith",
        }
    }

    /// Operators whose right-hand side is a set of values
    pub fn takes_set(&self) -> bool {
        matches!(self, Operator::In | Operator::Intersects | Operator::PMatch)
    }

    /// Operators that take no right-hand side
    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::Exists | Operator::NotExists)
    }

    /// Ordering comparisons, which need integer operands
    pub fn is_ordering(&self) -> bool {
        matches!(self, Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_roundtrip() {
        for kw in crate::lexer::token::WORD_OPERATORS {
            let op = Operator::from_keyword(kw).unwrap();
            assert_eq!(op.as_str(), *kw);
        }
        assert_eq!(Operator::from_keyword("=="), Some(Operator::Eq));
        assert_eq!(Operator::from_keyword("!exists"), Some(Operator::NotExists));
        assert_eq!(Operator::from_keyword("matches"), None);
    }

    #[test]
    fn test_operator_classes() {
        assert!(Operator::In.takes_set());
        assert!(Operator::PMatch.takes_set());
        assert!(!Operator::Contains.takes_set());
        assert!(Operator::NotExists.is_unary());
        assert!(Operator::Gte.is_ordering());
        assert!(!Operator::Eq.is_ordering());
    }
}
