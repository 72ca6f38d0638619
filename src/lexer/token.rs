/// Token types in condition expressions
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    // User-defined word
    /// Bare word: field name, macro name, list name or unquoted value
    Identifier = 0,

    // Literals
    /// Quoted string, value holds the unescaped content
    LitString = 1,
    /// End of input
    LitEof = 2,

    // Separators
    /// Left parenthesis separator
    SepLpar = 3,
    /// Right parenthesis separator
    SepRpar = 4,
    /// Comma separating list items
    SepComma = 5,

    // Symbolic operators
    /// Equals operator
    OpEq = 6,
    /// Not equals operator
    OpNeq = 7,
    /// Less than operator
    OpLt = 8,
    /// Less than or equal operator
    OpLte = 9,
    /// Greater than operator
    OpGt = 10,
    /// Greater than or equal operator
    OpGte = 11,

    // Keywords
    /// AND keyword
    KeywordAnd = 12,
    /// OR keyword
    KeywordOr = 13,
    /// NOT keyword
    KeywordNot = 14,
    /// Word operator such as `contains` or `in`; the item value holds the keyword
    KeywordOp = 15,
}

impl Token {
    /// Get the literal representation of the token
    pub fn literal(&self) -> &'static str {
        match self {
            Token::Identifier => "identifier",
            Token::LitString => "string",
            Token::LitEof => "end of input",
            Token::SepLpar => "(",
            Token::SepRpar => ")",
            Token::SepComma => ",",
            Token::OpEq => "=",
            Token::OpNeq => "!=",
            Token::OpLt => "<",
            Token::OpLte => "<=",
            Token::OpGt => ">",
            Token::OpGte => ">=",
            Token::KeywordAnd => "and",
            Token::KeywordOr => "or",
            Token::KeywordNot => "not",
            Token::KeywordOp => "operator",
        }
    }

    /// Whether this token is a comparison operator, symbolic or word
    pub fn is_operator(&self) -> bool {
        matches!(
            self,
            Token::OpEq
                | Token::OpNeq
                | Token::OpLt
                | Token::OpLte
                | Token::OpGt
                | Token::OpGte
                | Token::KeywordOp
        )
    }
}

/// Word operators recognized by the lexer
pub const WORD_OPERATORS: &[&str] = &[
    "contains",
    "icontains",
    "startswith",
    "endswith",
    "glob",
    "iglob",
    "pmatch",
    "in",
    "intersects",
    "exists",
    "bcontains",
    "bstartswith",
];

/// Lexical token with its value and byte offset in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// The token type
    pub token: Token,
    /// The token value
    pub value: String,
    /// Byte offset of the first character of the token
    pub position: usize,
}

impl Item {
    /// Create a new item
    pub fn new(token: Token, value: impl Into<String>, position: usize) -> Self {
        Self {
            token,
            value: value.into(),
            position,
        }
    }
}

/// Classify a bare word
pub fn check_keyword(input: &str) -> Token {
    if input.eq_ignore_ascii_case("and") {
        Token::KeywordAnd
    } else if input.eq_ignore_ascii_case("or") {
        Token::KeywordOr
    } else if input.eq_ignore_ascii_case("not") {
        Token::KeywordNot
    } else if WORD_OPERATORS.contains(&input) {
        Token::KeywordOp
    } else {
        Token::Identifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_keyword() {
        assert_eq!(check_keyword("and"), Token::KeywordAnd);
        assert_eq!(check_keyword("AND"), Token::KeywordAnd);
        assert_eq!(check_keyword("Or"), Token::KeywordOr);
        assert_eq!(check_keyword("not"), Token::KeywordNot);
        assert_eq!(check_keyword("contains"), Token::KeywordOp);
        assert_eq!(check_keyword("in"), Token::KeywordOp);
        // word operators are lowercase only
        assert_eq!(check_keyword("Contains"), Token::Identifier);
        assert_eq!(check_keyword("proc.name"), Token::Identifier);
    }
}
